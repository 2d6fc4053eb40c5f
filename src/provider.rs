use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;

use chrono::{Local, NaiveDate};

use crate::class_session::ClassSession;
use crate::config::Config;
use crate::feed_api::{FetchOutcome, LiveFeed};
use crate::model::{Competition, CompetitionClass, Competitions};
use crate::state::{Delta, ProviderCommand};

/// Competition list and class-results side of the app. The club side runs in
/// its own session worker owned by the UI.
pub struct Provider {
    feed: Arc<dyn LiveFeed>,
    tx: Sender<Delta>,
    config: Config,
    class_preference: Option<String>,
    class_session: Option<ClassSession>,
}

impl Provider {
    pub fn new(
        feed: Arc<dyn LiveFeed>,
        tx: Sender<Delta>,
        config: Config,
        class_preference: Option<String>,
    ) -> Self {
        Self {
            feed,
            tx,
            config,
            class_preference: class_preference.filter(|name| !name.is_empty()),
            class_session: None,
        }
    }

    pub fn class_session(&self) -> Option<&ClassSession> {
        self.class_session.as_ref()
    }

    pub fn handle(&mut self, cmd: ProviderCommand, today: NaiveDate) {
        match cmd {
            ProviderCommand::LoadCompetitions => self.load_competitions(today),
            ProviderCommand::SelectCompetition(competition) => {
                self.select_competition(competition)
            }
            ProviderCommand::SelectClass(class_name) => {
                self.class_preference = Some(class_name.clone());
                if let Some(session) = self.class_session.as_mut() {
                    session.select_class(self.feed.as_ref(), &class_name);
                }
            }
            ProviderCommand::RefreshClass => {
                if let Some(session) = self.class_session.as_mut() {
                    session.refresh_now(self.feed.as_ref());
                }
            }
        }
    }

    pub fn tick(&mut self, today: NaiveDate) {
        if let Some(session) = self.class_session.as_mut() {
            session.tick(self.feed.as_ref(), today);
        }
    }

    fn load_competitions(&mut self, today: NaiveDate) {
        let _ = self.tx.send(Delta::CompetitionsLoading(true));
        match self.feed.competitions() {
            FetchOutcome::Fresh { data, .. } => {
                let mut competitions: Competitions = data;
                let total = competitions.competitions.len();
                competitions.sort_for_display_on(today, self.config.max_competition_age_months);
                let _ = self.tx.send(Delta::Log(format!(
                    "[INFO] {} of {total} competitions listed",
                    competitions.competitions.len()
                )));
                let _ = self
                    .tx
                    .send(Delta::SetCompetitions(competitions.competitions));
            }
            FetchOutcome::NotModified => {
                let _ = self.tx.send(Delta::CompetitionsLoading(false));
            }
            FetchOutcome::Error(err) => {
                let _ = self
                    .tx
                    .send(Delta::Log(format!("[WARN] Competition list failed: {err}")));
                let _ = self.tx.send(Delta::CompetitionsLoading(false));
            }
        }
    }

    fn select_competition(&mut self, competition: Competition) {
        let competition_id = competition.id;
        let mut session = ClassSession::new(competition, self.tx.clone(), self.config.timing);
        let classes = match self.feed.classes(competition_id, "") {
            FetchOutcome::Fresh { data, .. } => data,
            FetchOutcome::NotModified => Vec::new(),
            FetchOutcome::Error(err) => {
                let _ = self
                    .tx
                    .send(Delta::Log(format!("[WARN] Class list failed: {err}")));
                Vec::new()
            }
        };
        let _ = self.tx.send(Delta::SetClasses {
            competition_id,
            classes: classes.clone(),
        });

        if let Some(class_name) = self.preferred_class(&classes) {
            session.select_class(self.feed.as_ref(), &class_name);
        }
        self.class_session = Some(session);
    }

    /// The remembered class if this competition has it, otherwise the first one.
    fn preferred_class(&mut self, classes: &[CompetitionClass]) -> Option<String> {
        if let Some(preferred) = self.class_preference.as_deref()
            && classes.iter().any(|c| c.class_name == preferred)
        {
            return Some(preferred.to_string());
        }
        self.class_preference = None;
        classes.first().map(|c| c.class_name.clone())
    }
}

pub fn spawn_provider(
    feed: Arc<dyn LiveFeed>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
    config: Config,
    class_preference: Option<String>,
) {
    thread::spawn(move || {
        let tick = config.timing.tick;
        let mut provider = Provider::new(feed, tx, config, class_preference);
        provider.handle(ProviderCommand::LoadCompetitions, Local::now().date_naive());

        loop {
            thread::sleep(tick);
            let today = Local::now().date_naive();
            loop {
                match cmd_rx.try_recv() {
                    Ok(cmd) => provider.handle(cmd, today),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
            provider.tick(today);
        }
    });
}
