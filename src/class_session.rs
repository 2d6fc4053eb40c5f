use std::sync::mpsc::Sender;

use chrono::{Local, NaiveDate};

use crate::feed_api::{FetchOutcome, LiveFeed};
use crate::model::{ClassResults, Competition};
use crate::refresh::{RefreshCountdown, SessionTiming};
use crate::state::{Delta, RefreshView};

/// Results of one selected class, re-fetched conditionally while the competition runs today.
pub struct ClassSession {
    competition: Competition,
    tx: Sender<Delta>,
    countdown: RefreshCountdown,
    class_name: Option<String>,
    results: Option<ClassResults>,
    last_hash: String,
}

impl ClassSession {
    pub fn new(competition: Competition, tx: Sender<Delta>, timing: SessionTiming) -> Self {
        Self {
            competition,
            tx,
            countdown: RefreshCountdown::new(timing),
            class_name: None,
            results: None,
            last_hash: String::new(),
        }
    }

    pub fn competition(&self) -> &Competition {
        &self.competition
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn results(&self) -> Option<&ClassResults> {
        self.results.as_ref()
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    pub fn countdown(&self) -> &RefreshCountdown {
        &self.countdown
    }

    /// Switching class always fetches unconditionally.
    pub fn select_class(&mut self, feed: &dyn LiveFeed, class_name: &str) {
        if self.class_name.as_deref() != Some(class_name) {
            self.results = None;
        }
        self.class_name = Some(class_name.to_string());
        self.last_hash.clear();
        self.countdown.reset();
        let _ = self.tx.send(Delta::ClassSelected {
            competition_id: self.competition.id,
            class_name: class_name.to_string(),
        });
        self.fetch(feed);
    }

    pub fn refresh_now(&mut self, feed: &dyn LiveFeed) {
        if self.class_name.is_some() {
            self.countdown.reset();
            self.fetch(feed);
        }
    }

    pub fn tick(&mut self, feed: &dyn LiveFeed, today: NaiveDate) {
        if self.class_name.is_none() || !self.competition.is_today_on(today) {
            if !self.countdown.is_disabled() {
                self.countdown.disable();
                self.emit_progress();
            }
            return;
        }
        if self.countdown.poll() {
            self.fetch(feed);
        }
        self.emit_progress();
    }

    fn fetch(&mut self, feed: &dyn LiveFeed) {
        let Some(class_name) = self.class_name.clone() else {
            return;
        };
        let competition_id = self.competition.id;
        let _ = self.tx.send(Delta::ClassResultsLoading {
            competition_id,
            loading: true,
        });
        match feed.class_results(competition_id, &class_name, &self.last_hash) {
            FetchOutcome::Fresh { mut data, hash } => {
                if data.class_name.is_empty() {
                    data.class_name = class_name;
                }
                self.last_hash = hash;
                self.results = Some(data.clone());
                let _ = self.tx.send(Delta::SetClassResults {
                    competition_id,
                    results: data,
                });
                let _ = self.tx.send(Delta::Refreshed {
                    competition_id,
                    at: Local::now().time(),
                });
            }
            FetchOutcome::NotModified => {
                let _ = self.tx.send(Delta::Refreshed {
                    competition_id,
                    at: Local::now().time(),
                });
            }
            FetchOutcome::Error(err) => {
                let _ = self.tx.send(Delta::Log(format!(
                    "[WARN] Results for {class_name} failed: {err}"
                )));
            }
        }
        let _ = self.tx.send(Delta::ClassResultsLoading {
            competition_id,
            loading: false,
        });
    }

    fn emit_progress(&self) {
        let _ = self.tx.send(Delta::RefreshProgress {
            competition_id: self.competition.id,
            view: RefreshView::Class,
            progress: self.countdown.progress(),
        });
    }
}
