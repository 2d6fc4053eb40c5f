/// Display language for status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    French,
}

impl Locale {
    /// Accepts tags like `fr`, `fr-FR`, `fr_CA.UTF-8`. Anything unrecognised is English.
    pub fn from_tag(tag: &str) -> Self {
        let lang = tag
            .trim()
            .split(['-', '_', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "fr" => Locale::French,
            _ => Locale::English,
        }
    }
}

/// Runner status as published by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerStatus {
    Ok,
    DidNotStart,
    DidNotFinish,
    MissingPunch,
    Disqualified,
    OverTime,
    NotStarted,
    WalkOver,
    MovedUp,
    Unknown(i64),
}

impl RunnerStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => RunnerStatus::Ok,
            1 => RunnerStatus::DidNotStart,
            2 => RunnerStatus::DidNotFinish,
            3 => RunnerStatus::MissingPunch,
            4 => RunnerStatus::Disqualified,
            5 => RunnerStatus::OverTime,
            9 | 10 => RunnerStatus::NotStarted,
            11 => RunnerStatus::WalkOver,
            12 => RunnerStatus::MovedUp,
            other => RunnerStatus::Unknown(other),
        }
    }

    /// Abbreviation shown in the place column. Only finishing outcomes get one.
    pub fn short_label(self, locale: Locale) -> &'static str {
        match locale {
            Locale::English => match self {
                RunnerStatus::Ok => "OK",
                RunnerStatus::DidNotStart => "DNS",
                RunnerStatus::DidNotFinish => "DNF",
                RunnerStatus::MissingPunch => "MP",
                RunnerStatus::Disqualified => "DSQ",
                RunnerStatus::OverTime => "OT",
                _ => "--",
            },
            Locale::French => match self {
                RunnerStatus::Ok => "OK",
                RunnerStatus::DidNotStart => "NP",
                RunnerStatus::DidNotFinish => "AB",
                RunnerStatus::MissingPunch => "PM",
                RunnerStatus::Disqualified => "DSQ",
                RunnerStatus::OverTime => "HD",
                _ => "--",
            },
        }
    }

    pub fn long_label(self, locale: Locale) -> &'static str {
        match locale {
            Locale::English => match self {
                RunnerStatus::Ok => "OK",
                RunnerStatus::DidNotStart => "DNS",
                RunnerStatus::DidNotFinish => "DNF",
                RunnerStatus::MissingPunch => "MP",
                RunnerStatus::Disqualified => "DSQ",
                RunnerStatus::OverTime => "OT",
                RunnerStatus::NotStarted => "Not Started Yet",
                RunnerStatus::WalkOver => "Walk Over",
                RunnerStatus::MovedUp => "Moved up",
                RunnerStatus::Unknown(_) => "Unknown",
            },
            Locale::French => match self {
                RunnerStatus::Ok => "OK",
                RunnerStatus::DidNotStart => "Non partant",
                RunnerStatus::DidNotFinish => "Abandon",
                RunnerStatus::MissingPunch => "Poste manquant",
                RunnerStatus::Disqualified => "Disqualifié",
                RunnerStatus::OverTime => "Hors délai",
                RunnerStatus::NotStarted => "Pas encore parti",
                RunnerStatus::WalkOver => "Forfait",
                RunnerStatus::MovedUp => "Surclassé",
                RunnerStatus::Unknown(_) => "Inconnu",
            },
        }
    }
}
