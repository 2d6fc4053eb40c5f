#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use chrono::NaiveDate;

use olive_terminal::config::Config;
use olive_terminal::feed_api::{FetchOutcome, LiveFeed};
use olive_terminal::model::{
    ClassResults, ClubResults, Competition, CompetitionClass, Competitions, Passing, RunnerResult,
};
use olive_terminal::refresh::SessionTiming;
use olive_terminal::state::Delta;

pub const RACE_DAY: (i32, u32, u32) = (2026, 10, 18);

pub fn race_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(RACE_DAY.0, RACE_DAY.1, RACE_DAY.2).expect("valid date")
}

pub fn competition_on(id: i64, date: NaiveDate) -> Competition {
    Competition {
        id,
        name: format!("Competition {id}"),
        organizer: "OK Demo".to_string(),
        date,
        time_offset_hours: 0,
        multiday_stage: None,
        multiday_first_day: None,
    }
}

pub fn test_config(refresh_ticks: i32) -> Config {
    Config {
        timing: SessionTiming {
            tick: Duration::from_millis(100),
            refresh_ticks,
        },
        fetch_parallelism: 2,
        ..Config::default()
    }
}

pub fn runner(name: &str, club: &str, status: i64, place: &str, result: &str) -> RunnerResult {
    RunnerResult {
        place: place.to_string(),
        name: name.to_string(),
        club_name: club.to_string(),
        class_name: None,
        result: result.to_string(),
        status,
        timeplus: String::new(),
        progress: None,
        start: 0,
        splits: None,
    }
}

pub fn drain(rx: &Receiver<Delta>) -> Vec<Delta> {
    rx.try_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Competitions,
    Classes { last_hash: String },
    ClassResults { class_name: String, last_hash: String },
    ClubResults { club: String, last_hash: String },
    LastPassings { last_hash: String },
}

type FetchHook = Box<dyn FnMut(&str) + Send>;

/// In-memory feed. Responses can be queued per call; without a queued response
/// it answers with a fixed roster split over two classes.
#[derive(Default)]
pub struct ScriptedFeed {
    calls: Mutex<Vec<Call>>,
    competitions: Mutex<Vec<Competition>>,
    classes_queue: Mutex<VecDeque<FetchOutcome<Vec<CompetitionClass>>>>,
    class_queue: Mutex<HashMap<String, VecDeque<FetchOutcome<ClassResults>>>>,
    club_queue: Mutex<HashMap<String, VecDeque<FetchOutcome<ClubResults>>>>,
    passings_queue: Mutex<VecDeque<FetchOutcome<Vec<Passing>>>>,
    club_hook: Mutex<Option<FetchHook>>,
    class_hook: Mutex<Option<FetchHook>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_competitions(competitions: Vec<Competition>) -> Self {
        let feed = Self::default();
        *feed.competitions.lock().unwrap() = competitions;
        feed
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn club_calls(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ClubResults { club, last_hash } => Some((club, last_hash)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn push_classes(&self, outcome: FetchOutcome<Vec<CompetitionClass>>) {
        self.classes_queue.lock().unwrap().push_back(outcome);
    }

    pub fn push_class(&self, class_name: &str, outcome: FetchOutcome<ClassResults>) {
        self.class_queue
            .lock()
            .unwrap()
            .entry(class_name.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn push_club(&self, club: &str, outcome: FetchOutcome<ClubResults>) {
        self.club_queue
            .lock()
            .unwrap()
            .entry(club.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn push_passings(&self, outcome: FetchOutcome<Vec<Passing>>) {
        self.passings_queue.lock().unwrap().push_back(outcome);
    }

    /// Runs once, right after the next club fetch is recorded.
    pub fn on_next_club_fetch(&self, hook: impl FnMut(&str) + Send + 'static) {
        *self.club_hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Runs once, right after the next class results fetch is recorded.
    pub fn on_next_class_fetch(&self, hook: impl FnMut(&str) + Send + 'static) {
        *self.class_hook.lock().unwrap() = Some(Box::new(hook));
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn roster() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        ("H21", "anna lind", "OK Ravinen"),
        ("H21", "erik berg", "IFK Lidingö SOK"),
        ("H21", "johan ek", "Järla Orientering"),
        ("D21", "lisa holm", "OK Linné"),
        ("D21", "maria dahl", "OK Ravinen"),
        ("D21", "sara nyström", ""),
    ]
}

pub fn default_club_results(club: &str) -> ClubResults {
    let results = roster()
        .into_iter()
        .filter(|(_, _, c)| *c == club)
        .map(|(class, name, c)| {
            let mut r = runner(name, c, 0, "1", "213400");
            r.class_name = Some(class.to_string());
            r
        })
        .collect();
    ClubResults {
        club_name: club.to_string(),
        results,
        hash: format!("h-{club}"),
    }
}

pub fn passing(runner_name: &str) -> Passing {
    Passing {
        pass_time: "10:42:17".to_string(),
        runner_name: runner_name.to_string(),
        class_name: "H21".to_string(),
        control: 1050,
        control_name: "Radio 1".to_string(),
        time: "96800".to_string(),
    }
}

impl LiveFeed for ScriptedFeed {
    fn competitions(&self) -> FetchOutcome<Competitions> {
        self.record(Call::Competitions);
        FetchOutcome::Fresh {
            data: Competitions {
                competitions: self.competitions.lock().unwrap().clone(),
            },
            hash: String::new(),
        }
    }

    fn classes(&self, _competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<CompetitionClass>> {
        self.record(Call::Classes {
            last_hash: last_hash.to_string(),
        });
        if let Some(outcome) = self.classes_queue.lock().unwrap().pop_front() {
            return outcome;
        }
        FetchOutcome::Fresh {
            data: ["H21", "D21"]
                .into_iter()
                .map(|name| CompetitionClass {
                    class_name: name.to_string(),
                })
                .collect(),
            hash: "classes-1".to_string(),
        }
    }

    fn class_results(
        &self,
        _competition_id: i64,
        class_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClassResults> {
        self.record(Call::ClassResults {
            class_name: class_name.to_string(),
            last_hash: last_hash.to_string(),
        });
        let hook = self.class_hook.lock().unwrap().take();
        if let Some(mut hook) = hook {
            hook(class_name);
        }
        if let Some(outcome) = self
            .class_queue
            .lock()
            .unwrap()
            .get_mut(class_name)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }
        let results = roster()
            .into_iter()
            .filter(|(class, _, _)| *class == class_name)
            .map(|(_, name, club)| runner(name, club, 0, "1", "213400"))
            .collect();
        FetchOutcome::Fresh {
            data: ClassResults {
                class_name: class_name.to_string(),
                split_controls: Vec::new(),
                results,
                hash: format!("c-{class_name}"),
            },
            hash: format!("c-{class_name}"),
        }
    }

    fn club_results(
        &self,
        _competition_id: i64,
        club_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClubResults> {
        self.record(Call::ClubResults {
            club: club_name.to_string(),
            last_hash: last_hash.to_string(),
        });
        let hook = self.club_hook.lock().unwrap().take();
        if let Some(mut hook) = hook {
            hook(club_name);
        }
        if let Some(outcome) = self
            .club_queue
            .lock()
            .unwrap()
            .get_mut(club_name)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }
        let data = default_club_results(club_name);
        let hash = data.hash.clone();
        FetchOutcome::Fresh { data, hash }
    }

    fn last_passings(&self, _competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<Passing>> {
        self.record(Call::LastPassings {
            last_hash: last_hash.to_string(),
        });
        if let Some(outcome) = self.passings_queue.lock().unwrap().pop_front() {
            return outcome;
        }
        FetchOutcome::NotModified
    }
}
