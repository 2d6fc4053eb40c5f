use std::collections::HashMap;

use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, Local, Months, NaiveDate, Timelike, Utc,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::status::{Locale, RunnerStatus};

/// Sort key given to a finisher whose place does not parse.
pub const UNPARSABLE_PLACE_KEY: i64 = 10_000;
pub const DEFAULT_MAX_AGE_MONTHS: u32 = 4;
const RESULT_PLACEHOLDER: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Competition {
    #[serde(deserialize_with = "de_flex_int")]
    pub id: i64,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub organizer: String,
    #[serde(deserialize_with = "de_date")]
    pub date: NaiveDate,
    /// Hours the event's local clock is ahead (+) or behind (-) Central European Time.
    #[serde(rename = "timediff", default, deserialize_with = "de_flex_int")]
    pub time_offset_hours: i64,
    #[serde(rename = "multidaystage", default, deserialize_with = "de_opt_flex_int")]
    pub multiday_stage: Option<i64>,
    #[serde(rename = "multidayfirstday", default, deserialize_with = "de_opt_flex_int")]
    pub multiday_first_day: Option<i64>,
}

impl Competition {
    pub fn is_future(&self) -> bool {
        self.is_future_on(today())
    }

    pub fn is_today(&self) -> bool {
        self.is_today_on(today())
    }

    pub fn is_older_than_months(&self, months: u32) -> bool {
        self.is_older_than_months_on(today(), months)
    }

    pub fn is_future_on(&self, today: NaiveDate) -> bool {
        self.date > today
    }

    pub fn is_today_on(&self, today: NaiveDate) -> bool {
        self.date == today
    }

    pub fn is_older_than_months_on(&self, today: NaiveDate, months: u32) -> bool {
        match today.checked_sub_months(Months::new(months)) {
            Some(cutoff) => self.date < cutoff,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Competitions {
    pub competitions: Vec<Competition>,
}

impl Competitions {
    pub fn sort_for_display(&mut self) {
        self.sort_for_display_on(today(), DEFAULT_MAX_AGE_MONTHS);
    }

    /// Drops future and stale events, newest first.
    pub fn sort_for_display_on(&mut self, today: NaiveDate, max_age_months: u32) {
        self.competitions.retain(|c| {
            !c.is_future_on(today) && !c.is_older_than_months_on(today, max_age_months)
        });
        self.competitions.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub fn find(&self, id: i64) -> Option<&Competition> {
        self.competitions.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct CompetitionClass {
    #[serde(rename = "className", alias = "class", deserialize_with = "de_flex_string")]
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitControl {
    #[serde(deserialize_with = "de_flex_int")]
    pub code: i64,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub label: String,
    pub time_centis: i64,
    pub time: String,
    pub status: i64,
    pub place: String,
    pub time_behind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerResult {
    #[serde(default, deserialize_with = "de_flex_string")]
    pub place: String,
    #[serde(deserialize_with = "de_flex_string")]
    pub name: String,
    #[serde(rename = "clubName", alias = "club", default, deserialize_with = "de_flex_string")]
    pub club_name: String,
    #[serde(rename = "className", alias = "class", default, deserialize_with = "de_opt_flex_string")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub result: String,
    #[serde(default, deserialize_with = "de_flex_int")]
    pub status: i64,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub timeplus: String,
    #[serde(default, deserialize_with = "de_opt_flex_int")]
    pub progress: Option<i64>,
    /// Hundredths of a second since local midnight.
    #[serde(default, deserialize_with = "de_flex_int")]
    pub start: i64,
    #[serde(default, deserialize_with = "de_flex_map")]
    pub splits: Option<HashMap<String, i64>>,
}

impl RunnerResult {
    pub fn runner_status(&self) -> RunnerStatus {
        RunnerStatus::from_code(self.status)
    }

    pub fn display_name(&self) -> String {
        capitalize_words(&self.name)
    }

    pub fn result_text(&self, locale: Locale) -> String {
        result_text(&self.result, self.status, locale)
    }

    pub fn place_text(&self, locale: Locale) -> String {
        place_text(&self.place, self.status, locale)
    }

    pub fn time_behind_text(&self) -> String {
        time_behind_text(&self.timeplus, self.status)
    }

    pub fn ranking_key(&self) -> i64 {
        ranking_key(&self.place, self.status, self.start)
    }

    pub fn start_time_text(&self) -> String {
        decode_duration(&self.start.to_string())
    }

    pub fn has_splits(&self) -> bool {
        self.splits.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn splits(&self, controls: &[SplitControl]) -> Vec<Split> {
        decode_splits(self.splits.as_ref(), controls)
    }

    pub fn is_running_today(&self, require_start_time: bool) -> bool {
        let not_started = matches!(self.runner_status(), RunnerStatus::NotStarted);
        if require_start_time {
            not_started && self.start > 0
        } else {
            not_started
        }
    }

    /// Running time as `"(M:SS)"` against a CET reference clock, empty before the start.
    pub fn elapsed_since_start(&self, time_offset_hours: i64, cet_seconds_of_day: i64) -> String {
        let offset = time_offset_hours.saturating_mul(3600);
        let start_cet = (self.start / 100).saturating_sub(offset);
        if start_cet >= cet_seconds_of_day {
            return String::new();
        }
        format!("({})", format_seconds(cet_seconds_of_day.saturating_sub(start_cet)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClassResults {
    #[serde(rename = "className", alias = "class", default, deserialize_with = "de_flex_string")]
    pub class_name: String,
    #[serde(rename = "splitcontrols", default)]
    pub split_controls: Vec<SplitControl>,
    #[serde(default)]
    pub results: Vec<RunnerResult>,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClubResults {
    #[serde(rename = "clubName", alias = "club", default, deserialize_with = "de_flex_string")]
    pub club_name: String,
    #[serde(default)]
    pub results: Vec<RunnerResult>,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Passing {
    #[serde(rename = "passtime", default, deserialize_with = "de_flex_string")]
    pub pass_time: String,
    #[serde(rename = "runnerName", default, deserialize_with = "de_flex_string")]
    pub runner_name: String,
    #[serde(rename = "className", alias = "class", default, deserialize_with = "de_flex_string")]
    pub class_name: String,
    #[serde(default, deserialize_with = "de_flex_int")]
    pub control: i64,
    #[serde(rename = "controlName", default, deserialize_with = "de_flex_string")]
    pub control_name: String,
    #[serde(default, deserialize_with = "de_flex_string")]
    pub time: String,
}

/// Integer-looking text is a centisecond count; anything else is already formatted.
pub fn decode_duration(raw: &str) -> String {
    match raw.parse::<i64>() {
        Ok(centis) => format_seconds(centis / 100),
        Err(_) => raw.to_string(),
    }
}

pub fn format_seconds(seconds: i64) -> String {
    if seconds < 0 {
        return format!("-{}", format_seconds(seconds.saturating_neg()).trim_start());
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:>2}:{secs:02}")
    }
}

pub fn result_text(result: &str, status: i64, locale: Locale) -> String {
    if status != 0 {
        return RunnerStatus::from_code(status).long_label(locale).to_string();
    }
    if result.trim().is_empty() {
        return RESULT_PLACEHOLDER.to_string();
    }
    decode_duration(result)
}

pub fn place_text(place: &str, status: i64, locale: Locale) -> String {
    if status == 0 {
        place.to_string()
    } else {
        RunnerStatus::from_code(status)
            .short_label(locale)
            .to_string()
    }
}

pub fn time_behind_text(timeplus: &str, status: i64) -> String {
    if status == 0 {
        format!("+{}", decode_duration(timeplus))
    } else {
        String::new()
    }
}

/// Finishers by place, then over-time, missing punch, DNF, DSQ, then runners still out
/// ordered by start time, then everything else by status code.
pub fn ranking_key(place: &str, status: i64, start: i64) -> i64 {
    match status {
        0 => place.trim().parse::<i64>().unwrap_or(UNPARSABLE_PLACE_KEY),
        5 => 10_001,
        3 => 10_002,
        2 => 10_003,
        4 => 10_004,
        9 | 10 => 20_000_i64.saturating_add(start / 100),
        other => 110_000_i64.saturating_add(other),
    }
}

pub fn decode_splits(
    splits: Option<&HashMap<String, i64>>,
    controls: &[SplitControl],
) -> Vec<Split> {
    let Some(map) = splits else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(controls.len());
    for ctrl in controls {
        let code = ctrl.code.to_string();
        let time = map.get(&code);
        let status = map.get(&format!("{code}_status"));
        let place = map.get(&format!("{code}_place"));
        let timeplus = map.get(&format!("{code}_timeplus"));
        let (Some(&time), Some(&status), Some(&place), Some(&timeplus)) =
            (time, status, place, timeplus)
        else {
            continue;
        };
        out.push(Split {
            label: ctrl.name.clone(),
            time_centis: time,
            time: decode_duration(&time.to_string()),
            status,
            place: place.to_string(),
            time_behind: decode_duration(&timeplus.to_string()),
        });
    }
    out.sort_by_key(|split| split.time_centis);
    out
}

/// Upper-cases the first letter of each whitespace-separated word when it is lower-case.
pub fn capitalize_words(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word_start = true;
    for c in name.chars() {
        if word_start && c.is_lowercase() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        word_start = c.is_whitespace();
    }
    out
}

/// Seconds since midnight on the Central European clock (CET, or CEST in EU summer time).
pub fn cet_seconds_of_day(now: DateTime<Utc>) -> i64 {
    let offset = if is_eu_summer_time(now) { 2 } else { 1 };
    let local = now + ChronoDuration::hours(offset);
    i64::from(local.time().num_seconds_from_midnight())
}

fn is_eu_summer_time(now: DateTime<Utc>) -> bool {
    let year = now.year();
    let (Some(start), Some(end)) = (last_sunday(year, 3), last_sunday(year, 10)) else {
        return false;
    };
    let (Some(start), Some(end)) = (start.and_hms_opt(1, 0, 0), end.and_hms_opt(1, 0, 0)) else {
        return false;
    };
    let naive = now.naive_utc();
    naive >= start && naive < end
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let last_day = NaiveDate::from_ymd_opt(year, month + 1, 1)?.pred_opt()?;
    let back = i64::from(last_day.weekday().num_days_from_sunday());
    last_day.checked_sub_signed(ChronoDuration::days(back))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Numbers pass through, numeric strings parse, everything else is 0.
pub fn flex_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

pub fn flex_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn de_flex_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(flex_int(&Value::deserialize(deserializer)?))
}

fn de_opt_flex_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => Ok(Some(flex_int(&other))),
    }
}

fn de_flex_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(flex_string(&Value::deserialize(deserializer)?))
}

fn de_opt_flex_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => Ok(Some(flex_string(&other))),
    }
}

fn de_flex_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<HashMap<String, i64>>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(Some(
            map.iter().map(|(k, v)| (k.clone(), flex_int(v))).collect(),
        )),
        _ => Ok(None),
    }
}

fn de_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = flex_string(&Value::deserialize(deserializer)?);
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(D::Error::custom)
}
