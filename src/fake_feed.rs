use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::feed_api::{FetchOutcome, LiveFeed};
use crate::model::{
    ClassResults, ClubResults, Competition, CompetitionClass, Competitions, Passing,
    RunnerResult, SplitControl, format_seconds,
};

pub const FAKE_COMPETITION_ID: i64 = 90_001;

/// Race clock seconds per wall-clock second.
const SPEEDUP: i64 = 20;
/// The fake race clock starts at 10:00 local.
const RACE_CLOCK_START: i64 = 10 * 3600;

const CLUBS: &[&str] = &[
    "IFK Lidingö SOK",
    "OK Linné",
    "Järla Orientering",
    "Sävedalens AIK",
    "IFK Göteborg Orientering",
    "OK Ravinen",
    "Halden SK",
    "Kalevan Rasti",
];
const FIRST_NAMES: &[&str] = &[
    "anna", "erik", "lisa", "johan", "maria", "karl", "sara", "nils", "emma", "olof",
];
const LAST_NAMES: &[&str] = &[
    "andersson", "berg", "lind", "holm", "ek", "nyström", "sjöberg", "dahl",
];
const CLASSES: &[(&str, usize)] = &[("H21", 4), ("D21", 4), ("H16", 3), ("D16", 3), ("Öppen 1", 2)];

#[derive(Debug, Clone)]
struct FakeRunner {
    name: String,
    club: String,
    /// Seconds since local midnight.
    start: i64,
    race_secs: i64,
    final_status: i64,
}

#[derive(Debug, Clone)]
struct FakeClass {
    name: String,
    controls: Vec<SplitControl>,
    runners: Vec<FakeRunner>,
}

/// Offline stand-in for the live service. One competition runs today on an
/// accelerated clock; hashes change only when a runner starts or passes a control.
pub struct FakeFeed {
    today: NaiveDate,
    classes: Vec<FakeClass>,
    started_at: Instant,
    clock_override: Mutex<Option<i64>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().r#gen())
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let classes = CLASSES
            .iter()
            .map(|(name, n_controls)| FakeClass {
                name: name.to_string(),
                controls: (0..*n_controls)
                    .map(|idx| SplitControl {
                        code: 1000 + 10 * idx as i64,
                        name: format!("Radio {}", idx + 1),
                    })
                    .collect(),
                runners: (0..rng.gen_range(6..12))
                    .map(|_| fake_runner(&mut rng))
                    .collect(),
            })
            .collect();
        Self {
            today: Local::now().date_naive(),
            classes,
            started_at: Instant::now(),
            clock_override: Mutex::new(None),
        }
    }

    /// Pins the race clock (seconds since local midnight).
    pub fn set_clock(&self, seconds_of_day: i64) {
        *self.clock_override.lock().expect("clock lock poisoned") = Some(seconds_of_day);
    }

    fn clock(&self) -> i64 {
        if let Some(pinned) = *self.clock_override.lock().expect("clock lock poisoned") {
            return pinned;
        }
        RACE_CLOCK_START + self.started_at.elapsed().as_secs() as i64 * SPEEDUP
    }

    fn competition(&self) -> Competition {
        Competition {
            id: FAKE_COMPETITION_ID,
            name: "Demo Sprint".to_string(),
            organizer: "OK Demo".to_string(),
            date: self.today,
            time_offset_hours: 0,
            multiday_stage: None,
            multiday_first_day: None,
        }
    }

    fn class_snapshot(&self, class: &FakeClass, clock: i64) -> Vec<RunnerResult> {
        let mut results: Vec<RunnerResult> = class
            .runners
            .iter()
            .map(|runner| runner_snapshot(runner, &class.controls, clock))
            .collect();

        let mut finishers: Vec<(usize, i64)> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == 0)
            .filter_map(|(idx, r)| r.result.parse::<i64>().ok().map(|t| (idx, t)))
            .collect();
        finishers.sort_by_key(|(_, time)| *time);
        if let Some(&(_, best)) = finishers.first() {
            for (rank, (idx, time)) in finishers.iter().enumerate() {
                results[*idx].place = (rank + 1).to_string();
                results[*idx].timeplus = (time - best).to_string();
            }
        }
        for r in &mut results {
            r.class_name = Some(class.name.clone());
        }
        results
    }

    /// Starts and control passes up to `clock`; drives the result hashes.
    fn events_before(&self, class: &FakeClass, clock: i64) -> usize {
        class
            .runners
            .iter()
            .map(|runner| {
                let started = usize::from(runner.start <= clock);
                started
                    + pass_times(runner, &class.controls)
                        .filter(|(_, at)| *at <= clock)
                        .count()
            })
            .sum()
    }
}

impl Default for FakeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveFeed for FakeFeed {
    fn competitions(&self) -> FetchOutcome<Competitions> {
        let mut competitions = vec![self.competition()];
        for (idx, days) in [7i64, 30, 200].into_iter().enumerate() {
            competitions.push(Competition {
                id: FAKE_COMPETITION_ID + 1 + idx as i64,
                name: format!("Demo Archive {}", idx + 1),
                organizer: "OK Demo".to_string(),
                date: self.today - ChronoDuration::days(days),
                time_offset_hours: 0,
                multiday_stage: None,
                multiday_first_day: None,
            });
        }
        FetchOutcome::Fresh {
            data: Competitions { competitions },
            hash: String::new(),
        }
    }

    fn classes(&self, competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<CompetitionClass>> {
        if competition_id != FAKE_COMPETITION_ID {
            return FetchOutcome::Fresh {
                data: Vec::new(),
                hash: String::new(),
            };
        }
        let hash = "classes-1".to_string();
        if last_hash == hash {
            return FetchOutcome::NotModified;
        }
        FetchOutcome::Fresh {
            data: self
                .classes
                .iter()
                .map(|c| CompetitionClass {
                    class_name: c.name.clone(),
                })
                .collect(),
            hash,
        }
    }

    fn class_results(
        &self,
        competition_id: i64,
        class_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClassResults> {
        let Some(class) = self
            .classes
            .iter()
            .find(|c| c.name == class_name && competition_id == FAKE_COMPETITION_ID)
        else {
            return FetchOutcome::Fresh {
                data: ClassResults {
                    class_name: class_name.to_string(),
                    ..ClassResults::default()
                },
                hash: String::new(),
            };
        };
        let clock = self.clock();
        let hash = format!("{}-{}", class.name, self.events_before(class, clock));
        if last_hash == hash {
            return FetchOutcome::NotModified;
        }
        let results = self.class_snapshot(class, clock);
        FetchOutcome::Fresh {
            data: ClassResults {
                class_name: class.name.clone(),
                split_controls: class.controls.clone(),
                results,
                hash: hash.clone(),
            },
            hash,
        }
    }

    fn club_results(
        &self,
        competition_id: i64,
        club_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClubResults> {
        if competition_id != FAKE_COMPETITION_ID {
            return FetchOutcome::Fresh {
                data: ClubResults {
                    club_name: club_name.to_string(),
                    ..ClubResults::default()
                },
                hash: String::new(),
            };
        }
        let clock = self.clock();
        let mut results = Vec::new();
        let mut passes = 0usize;
        for class in &self.classes {
            let club_runners: Vec<RunnerResult> = self
                .class_snapshot(class, clock)
                .into_iter()
                .filter(|r| r.club_name == club_name)
                .collect();
            if club_runners.is_empty() {
                continue;
            }
            passes += self.events_before(class, clock);
            results.extend(club_runners);
        }
        let hash = format!("{club_name}-{passes}");
        if last_hash == hash {
            return FetchOutcome::NotModified;
        }
        FetchOutcome::Fresh {
            data: ClubResults {
                club_name: club_name.to_string(),
                results,
                hash: hash.clone(),
            },
            hash,
        }
    }

    fn last_passings(&self, competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<Passing>> {
        if competition_id != FAKE_COMPETITION_ID {
            return FetchOutcome::Fresh {
                data: Vec::new(),
                hash: String::new(),
            };
        }
        let clock = self.clock();
        let mut passings: Vec<(i64, Passing)> = Vec::new();
        for class in &self.classes {
            for runner in &class.runners {
                for (control, at) in pass_times(runner, &class.controls) {
                    if at > clock {
                        continue;
                    }
                    passings.push((
                        at,
                        Passing {
                            pass_time: format_seconds(at),
                            runner_name: runner.name.clone(),
                            class_name: class.name.clone(),
                            control: control.code,
                            control_name: control.name.clone(),
                            time: (((at - runner.start) * 100).max(0)).to_string(),
                        },
                    ));
                }
            }
        }
        let hash = format!("passings-{}", passings.len());
        if last_hash == hash {
            return FetchOutcome::NotModified;
        }
        passings.sort_by(|a, b| b.0.cmp(&a.0));
        FetchOutcome::Fresh {
            data: passings.into_iter().take(10).map(|(_, p)| p).collect(),
            hash,
        }
    }
}

fn fake_runner(rng: &mut StdRng) -> FakeRunner {
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    let roll: f64 = rng.r#gen();
    let final_status = if roll < 0.05 {
        3
    } else if roll < 0.08 {
        2
    } else if roll < 0.10 {
        1
    } else {
        0
    };
    FakeRunner {
        name: format!("{first} {last}"),
        club: CLUBS[rng.gen_range(0..CLUBS.len())].to_string(),
        start: RACE_CLOCK_START + rng.gen_range(0..60) * 60,
        race_secs: rng.gen_range(25 * 60..75 * 60),
        final_status,
    }
}

/// Radio controls first, finish last (code 0).
fn pass_times<'a>(
    runner: &'a FakeRunner,
    controls: &'a [SplitControl],
) -> impl Iterator<Item = (SplitControl, i64)> + 'a {
    let legs = controls.len() as i64 + 1;
    let finishes = runner.final_status == 0;
    controls
        .iter()
        .enumerate()
        .map(move |(idx, ctrl)| {
            (
                ctrl.clone(),
                runner.start + runner.race_secs * (idx as i64 + 1) / legs,
            )
        })
        .chain(finishes.then(|| {
            (
                SplitControl {
                    code: 0,
                    name: "Finish".to_string(),
                },
                runner.start + runner.race_secs,
            )
        }))
}

fn runner_snapshot(runner: &FakeRunner, controls: &[SplitControl], clock: i64) -> RunnerResult {
    let finish_at = runner.start + runner.race_secs;
    let mut splits = HashMap::new();
    for (control, at) in pass_times(runner, controls) {
        if control.code == 0 || at > clock {
            continue;
        }
        let code = control.code;
        splits.insert(code.to_string(), (at - runner.start) * 100);
        splits.insert(format!("{code}_status"), 0);
        splits.insert(format!("{code}_place"), 0);
        splits.insert(format!("{code}_timeplus"), 0);
    }

    let (status, result) = if runner.final_status == 1 {
        (1, String::new())
    } else if clock < runner.start {
        (10, String::new())
    } else if clock < finish_at {
        (9, String::new())
    } else if runner.final_status != 0 {
        (runner.final_status, String::new())
    } else {
        (0, (runner.race_secs * 100).to_string())
    };
    let progress = match status {
        0 => Some(100),
        9 => Some((clock - runner.start) * 100 / runner.race_secs.max(1)),
        _ => None,
    };

    RunnerResult {
        place: String::new(),
        name: runner.name.clone(),
        club_name: runner.club.clone(),
        class_name: None,
        result,
        status,
        timeplus: String::new(),
        progress,
        start: runner.start * 100,
        splits: (!splits.is_empty()).then_some(splits),
    }
}
