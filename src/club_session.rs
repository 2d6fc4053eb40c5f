use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::{Local, NaiveDate};
use rayon::prelude::*;

use crate::config::Config;
use crate::feed_api::{FetchOutcome, LiveFeed};
use crate::model::{ClassResults, Competition, RunnerResult};
use crate::refresh::RefreshCountdown;
use crate::state::{Delta, RefreshView};

/// Written by the UI thread, read by the session worker.
#[derive(Debug, Default)]
pub struct SessionSignals {
    raw_filter: Mutex<String>,
    stop: AtomicBool,
    refresh_now: AtomicBool,
}

impl SessionSignals {
    pub fn new(initial_filter: &str) -> Arc<Self> {
        Arc::new(Self {
            raw_filter: Mutex::new(initial_filter.to_string()),
            ..Self::default()
        })
    }

    pub fn set_filter(&self, text: &str) {
        let mut raw = self.raw_filter.lock().expect("filter lock poisoned");
        raw.clear();
        raw.push_str(text);
    }

    pub fn raw_filter(&self) -> String {
        self.raw_filter.lock().expect("filter lock poisoned").clone()
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_refresh(&self) {
        self.refresh_now.store(true, Ordering::SeqCst);
    }

    fn take_refresh_request(&self) -> bool {
        self.refresh_now.swap(false, Ordering::SeqCst)
    }
}

/// Clubs whose name contains the filter, ignoring case. An empty filter selects nothing.
pub fn select_clubs(clubs: &[String], filter: &str) -> Vec<String> {
    if filter.is_empty() {
        return Vec::new();
    }
    let needle = filter.to_lowercase();
    clubs
        .iter()
        .filter(|club| club.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Club-filter selection and refresh for one competition. Driven by `tick`;
/// every fetch happens inside a tick, so at most one result pass runs at a time.
pub struct ClubSession {
    competition: Competition,
    signals: Arc<SessionSignals>,
    tx: Sender<Delta>,
    countdown: RefreshCountdown,
    fetch_pool: Option<rayon::ThreadPool>,

    clubs_available: Vec<String>,
    runner_classes: HashMap<String, String>,
    clubs_loaded: bool,
    clubs_complete: bool,
    discovery_filter: Option<String>,

    applied_filter: String,
    selected_clubs: Vec<String>,
    current_results: Vec<RunnerResult>,
    results_club: Option<String>,
    last_result_hash: String,
    last_passing_hash: String,
    has_pending_faster_check: bool,
    loading: bool,
}

impl ClubSession {
    pub fn new(
        competition: Competition,
        signals: Arc<SessionSignals>,
        tx: Sender<Delta>,
        config: &Config,
    ) -> Self {
        Self {
            competition,
            signals,
            tx,
            countdown: RefreshCountdown::new(config.timing),
            fetch_pool: build_fetch_pool(config.fetch_parallelism),
            clubs_available: Vec::new(),
            runner_classes: HashMap::new(),
            clubs_loaded: false,
            clubs_complete: false,
            discovery_filter: None,
            applied_filter: String::new(),
            selected_clubs: Vec::new(),
            current_results: Vec::new(),
            results_club: None,
            last_result_hash: String::new(),
            last_passing_hash: String::new(),
            has_pending_faster_check: false,
            loading: false,
        }
    }

    pub fn competition(&self) -> &Competition {
        &self.competition
    }

    pub fn clubs(&self) -> &[String] {
        &self.clubs_available
    }

    pub fn clubs_loaded(&self) -> bool {
        self.clubs_loaded
    }

    /// False when some class failed during discovery; the list may miss clubs.
    pub fn clubs_complete(&self) -> bool {
        self.clubs_complete
    }

    pub fn runner_classes(&self) -> &HashMap<String, String> {
        &self.runner_classes
    }

    pub fn applied_filter(&self) -> &str {
        &self.applied_filter
    }

    pub fn selected_clubs(&self) -> &[String] {
        &self.selected_clubs
    }

    pub fn results(&self) -> &[RunnerResult] {
        &self.current_results
    }

    pub fn last_result_hash(&self) -> &str {
        &self.last_result_hash
    }

    pub fn last_passing_hash(&self) -> &str {
        &self.last_passing_hash
    }

    pub fn has_pending_faster_check(&self) -> bool {
        self.has_pending_faster_check
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn countdown(&self) -> &RefreshCountdown {
        &self.countdown
    }

    /// Builds the club list by fetching every class in parallel. A class that fails
    /// to load contributes nothing and marks the list incomplete; a failed class
    /// listing leaves the list unloaded.
    pub fn load_club_names(&mut self, feed: &dyn LiveFeed) {
        let competition_id = self.competition.id;
        self.discovery_filter = Some(self.signals.raw_filter());
        self.emit(Delta::ClubsLoading {
            competition_id,
            loading: true,
        });

        let classes = match feed.classes(competition_id, "") {
            FetchOutcome::Fresh { data, .. } => data,
            FetchOutcome::NotModified => {
                self.log(format!(
                    "[WARN] Class list for competition {competition_id} came back unchanged"
                ));
                self.emit(Delta::ClubsLoading {
                    competition_id,
                    loading: false,
                });
                return;
            }
            FetchOutcome::Error(err) => {
                self.log(format!("[WARN] Club list failed: {err}"));
                self.emit(Delta::ClubsLoading {
                    competition_id,
                    loading: false,
                });
                return;
            }
        };

        let fetched: Vec<(String, FetchOutcome<ClassResults>)> =
            with_fetch_pool(self.fetch_pool.as_ref(), || {
                classes
                    .par_iter()
                    .map(|class| {
                        (
                            class.class_name.clone(),
                            feed.class_results(competition_id, &class.class_name, ""),
                        )
                    })
                    .collect()
            });
        if self.signals.is_cancelled() {
            return;
        }

        let mut clubs = BTreeSet::new();
        let mut runner_classes = HashMap::new();
        let mut failed = 0usize;
        for (class_name, outcome) in fetched {
            match outcome {
                FetchOutcome::Fresh { data, .. } => {
                    for runner in data.results {
                        if !runner.club_name.is_empty() {
                            clubs.insert(runner.club_name.clone());
                        }
                        runner_classes.insert(runner.display_name(), class_name.clone());
                    }
                }
                FetchOutcome::NotModified | FetchOutcome::Error(_) => failed += 1,
            }
        }
        if failed > 0 {
            self.log(format!(
                "[WARN] {failed} of {} classes failed while listing clubs",
                classes.len()
            ));
        }

        self.clubs_available = clubs.into_iter().collect();
        self.runner_classes = runner_classes;
        self.clubs_loaded = true;
        self.clubs_complete = failed == 0;
        self.log(format!(
            "[INFO] {} clubs in {}",
            self.clubs_available.len(),
            self.competition.name
        ));
        self.emit(Delta::SetClubs {
            competition_id,
            clubs: self.clubs_available.clone(),
            runner_classes: self.runner_classes.clone(),
        });
    }

    /// One pass of the session loop: forced refresh, filter coalescing, then pacing.
    pub fn tick(&mut self, feed: &dyn LiveFeed, today: NaiveDate) {
        if self.signals.is_cancelled() {
            return;
        }
        if !self.clubs_complete {
            let raw = self.signals.raw_filter();
            if self.discovery_filter.as_deref() != Some(raw.as_str()) {
                self.load_club_names(feed);
            }
            if !self.clubs_loaded {
                return;
            }
        }

        let forced = self.signals.take_refresh_request();
        if forced || self.has_pending_faster_check {
            self.has_pending_faster_check = false;
            self.applied_filter.clear();
        }

        let raw = self.signals.raw_filter();
        if raw != self.applied_filter {
            self.applied_filter = raw;
            self.apply_filter(feed);
        }

        self.periodic_refresh(feed, today);
    }

    fn apply_filter(&mut self, feed: &dyn LiveFeed) {
        let competition_id = self.competition.id;
        self.selected_clubs = select_clubs(&self.clubs_available, &self.applied_filter);
        self.emit(Delta::ClubFilterApplied {
            competition_id,
            filter: self.applied_filter.clone(),
            clubs: self.selected_clubs.clone(),
        });

        if self.selected_clubs.is_empty() {
            self.current_results.clear();
            self.results_club = None;
            self.last_result_hash.clear();
            self.emit(Delta::SetClubResults {
                competition_id,
                results: Vec::new(),
            });
            return;
        }
        self.load_club_results(feed);
    }

    /// Fetches each selected club in turn and replaces the merged results at the end.
    /// Only a single club that was also the last one fetched is asked conditionally.
    fn load_club_results(&mut self, feed: &dyn LiveFeed) {
        let competition_id = self.competition.id;
        let clubs = self.selected_clubs.clone();
        let started_with = self.applied_filter.clone();
        let single = clubs.len() == 1;
        let conditional =
            single && self.results_club.as_deref() == clubs.first().map(String::as_str);

        self.set_loading(true);
        self.countdown.reset();

        let mut merged: Vec<RunnerResult> = Vec::new();
        let mut hash = String::new();
        for club in &clubs {
            let last_hash = if conditional {
                self.last_result_hash.as_str()
            } else {
                ""
            };
            match feed.club_results(competition_id, club, last_hash) {
                FetchOutcome::Fresh { data, hash: fresh } => {
                    merged.extend(data.results);
                    if single {
                        hash = fresh;
                    }
                }
                FetchOutcome::NotModified if conditional => {
                    merged = self.current_results.clone();
                    hash = self.last_result_hash.clone();
                }
                FetchOutcome::NotModified => {
                    self.log(format!("[WARN] Unexpected not-modified for club {club}"));
                }
                FetchOutcome::Error(err) => {
                    self.log(format!("[WARN] Club results for {club} failed: {err}"));
                    self.set_loading(false);
                    return;
                }
            }
            if self.signals.is_cancelled() || self.signals.raw_filter() != started_with {
                self.set_loading(false);
                return;
            }
        }

        self.current_results = merged;
        self.last_result_hash = hash;
        self.results_club = if single { clubs.first().cloned() } else { None };
        self.set_loading(false);
        self.emit(Delta::SetClubResults {
            competition_id,
            results: self.current_results.clone(),
        });
        self.emit(Delta::Refreshed {
            competition_id,
            at: Local::now().time(),
        });
    }

    fn periodic_refresh(&mut self, feed: &dyn LiveFeed, today: NaiveDate) {
        let competition_id = self.competition.id;
        if !self.competition.is_today_on(today) || self.selected_clubs.is_empty() {
            if !self.countdown.is_disabled() {
                self.countdown.disable();
                self.emit_progress();
            }
            return;
        }
        if self.countdown.poll() {
            self.check_need_refresh(feed, competition_id);
        }
        self.emit_progress();
    }

    /// Cheap probe: only a fresh, non-empty passing list asks for a full reload.
    fn check_need_refresh(&mut self, feed: &dyn LiveFeed, competition_id: i64) {
        match feed.last_passings(competition_id, &self.last_passing_hash) {
            FetchOutcome::Fresh { data, hash } => {
                self.last_passing_hash = hash;
                self.has_pending_faster_check = !data.is_empty();
                self.emit(Delta::SetLastPassings {
                    competition_id,
                    passings: data,
                });
                self.emit(Delta::Refreshed {
                    competition_id,
                    at: Local::now().time(),
                });
            }
            FetchOutcome::NotModified => {
                self.has_pending_faster_check = false;
                self.emit(Delta::Refreshed {
                    competition_id,
                    at: Local::now().time(),
                });
            }
            FetchOutcome::Error(err) => {
                self.log(format!("[WARN] Last passings failed: {err}"));
            }
        }
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.emit(Delta::ClubResultsLoading {
            competition_id: self.competition.id,
            loading,
        });
    }

    fn emit_progress(&self) {
        self.emit(Delta::RefreshProgress {
            competition_id: self.competition.id,
            view: RefreshView::Club,
            progress: self.countdown.progress(),
        });
    }

    fn emit(&self, delta: Delta) {
        let _ = self.tx.send(delta);
    }

    fn log(&self, msg: String) {
        self.emit(Delta::Log(msg));
    }
}

/// Owned by the UI. The worker thread starts on the first filter input and
/// stops when the handle is shut down or dropped.
pub struct ClubSessionHandle {
    competition: Competition,
    feed: Arc<dyn LiveFeed>,
    tx: Sender<Delta>,
    config: Config,
    signals: Arc<SessionSignals>,
    worker: Option<JoinHandle<()>>,
}

impl ClubSessionHandle {
    pub fn new(
        competition: Competition,
        feed: Arc<dyn LiveFeed>,
        tx: Sender<Delta>,
        config: Config,
    ) -> Self {
        Self {
            competition,
            feed,
            tx,
            config,
            signals: SessionSignals::new(""),
            worker: None,
        }
    }

    pub fn competition_id(&self) -> i64 {
        self.competition.id
    }

    /// Records the typed text. Never blocks on the network.
    pub fn input(&mut self, text: &str) {
        self.signals.set_filter(text);
        self.ensure_started();
    }

    pub fn request_refresh(&self) {
        self.signals.request_refresh();
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn shutdown(&mut self) {
        self.signals.cancel();
    }

    fn ensure_started(&mut self) {
        if self.is_running() || self.signals.is_cancelled() {
            return;
        }
        let competition = self.competition.clone();
        let feed = Arc::clone(&self.feed);
        let tx = self.tx.clone();
        let config = self.config.clone();
        let signals = Arc::clone(&self.signals);
        self.worker = Some(thread::spawn(move || {
            run_club_session(competition, feed, signals, tx, config)
        }));
    }
}

impl Drop for ClubSessionHandle {
    fn drop(&mut self) {
        self.signals.cancel();
    }
}

fn run_club_session(
    competition: Competition,
    feed: Arc<dyn LiveFeed>,
    signals: Arc<SessionSignals>,
    tx: Sender<Delta>,
    config: Config,
) {
    let mut session = ClubSession::new(competition, Arc::clone(&signals), tx, &config);
    session.load_club_names(feed.as_ref());
    while !signals.is_cancelled() {
        session.tick(feed.as_ref(), Local::now().date_naive());
        thread::sleep(config.timing.tick);
    }
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: Option<&rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match pool {
        Some(pool) => pool.install(action),
        None => action(),
    }
}
