use std::collections::{HashMap, VecDeque};

use chrono::NaiveTime;

use crate::model::{ClassResults, Competition, CompetitionClass, Passing, RunnerResult};
use crate::projection::{
    ClassView, ClubPicker, ClubSnapshot, ClubView, SortMode, club_picker, project_class_view,
    project_club_view, show_sort_control,
};
use crate::status::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Competitions,
    ClassResults,
    ClubResults,
}

impl Screen {
    pub fn next(self) -> Self {
        match self {
            Screen::Competitions => Screen::ClassResults,
            Screen::ClassResults => Screen::ClubResults,
            Screen::ClubResults => Screen::Competitions,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Screen::Competitions => Screen::ClubResults,
            Screen::ClassResults => Screen::Competitions,
            Screen::ClubResults => Screen::ClassResults,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Competitions => "Competitions",
            Screen::ClassResults => "Class",
            Screen::ClubResults => "Club",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshView {
    Class,
    Club,
}

pub struct AppState {
    pub screen: Screen,
    pub locale: Locale,
    pub help_overlay: bool,

    pub competitions: Vec<Competition>,
    pub competitions_loading: bool,
    pub competition_cursor: usize,
    pub selected_competition: Option<Competition>,

    pub classes: Vec<CompetitionClass>,
    pub class_cursor: usize,
    pub selected_class: Option<String>,
    pub class_results: Option<ClassResults>,
    pub class_loading: bool,
    pub class_scroll: usize,
    pub class_refresh_progress: f32,

    pub clubs: Vec<String>,
    pub runner_classes: HashMap<String, String>,
    pub clubs_loading: bool,
    /// Text as typed; the session catches up with it on its next tick.
    pub club_filter: String,
    pub applied_club_filter: String,
    pub selected_clubs: Vec<String>,
    pub club_results: Vec<RunnerResult>,
    pub club_results_loading: bool,
    pub club_cursor: usize,
    pub club_scroll: usize,
    pub club_refresh_progress: f32,
    pub sort: SortMode,

    pub last_passings: Vec<Passing>,
    pub last_refresh: Option<NaiveTime>,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl AppState {
    pub fn new(locale: Locale) -> Self {
        Self {
            screen: Screen::Competitions,
            locale,
            help_overlay: false,
            competitions: Vec::new(),
            competitions_loading: true,
            competition_cursor: 0,
            selected_competition: None,
            classes: Vec::new(),
            class_cursor: 0,
            selected_class: None,
            class_results: None,
            class_loading: false,
            class_scroll: 0,
            class_refresh_progress: 0.0,
            clubs: Vec::new(),
            runner_classes: HashMap::new(),
            clubs_loading: false,
            club_filter: String::new(),
            applied_club_filter: String::new(),
            selected_clubs: Vec::new(),
            club_results: Vec::new(),
            club_results_loading: false,
            club_cursor: 0,
            club_scroll: 0,
            club_refresh_progress: 0.0,
            sort: SortMode::default(),
            last_passings: Vec::new(),
            last_refresh: None,
            logs: VecDeque::with_capacity(200),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn selected_competition_id(&self) -> Option<i64> {
        self.selected_competition.as_ref().map(|c| c.id)
    }

    pub fn competition_under_cursor(&self) -> Option<&Competition> {
        self.competitions.get(self.competition_cursor)
    }

    /// Drops everything tied to the previous competition.
    pub fn begin_competition(&mut self, competition: Competition) {
        self.selected_competition = Some(competition);
        self.classes.clear();
        self.class_cursor = 0;
        self.selected_class = None;
        self.class_results = None;
        self.class_loading = true;
        self.class_scroll = 0;
        self.class_refresh_progress = 0.0;
        self.clubs.clear();
        self.runner_classes.clear();
        self.clubs_loading = false;
        self.applied_club_filter.clear();
        self.selected_clubs.clear();
        self.club_results.clear();
        self.club_results_loading = false;
        self.club_cursor = 0;
        self.club_scroll = 0;
        self.club_refresh_progress = 0.0;
        self.last_passings.clear();
        self.last_refresh = None;
    }

    pub fn select_next(&mut self) {
        match self.screen {
            Screen::Competitions => {
                if self.competition_cursor + 1 < self.competitions.len() {
                    self.competition_cursor += 1;
                }
            }
            Screen::ClassResults => self.class_scroll = self.class_scroll.saturating_add(1),
            Screen::ClubResults => self.club_scroll = self.club_scroll.saturating_add(1),
        }
    }

    pub fn select_prev(&mut self) {
        match self.screen {
            Screen::Competitions => {
                self.competition_cursor = self.competition_cursor.saturating_sub(1);
            }
            Screen::ClassResults => self.class_scroll = self.class_scroll.saturating_sub(1),
            Screen::ClubResults => self.club_scroll = self.club_scroll.saturating_sub(1),
        }
    }

    /// Wraps around the class list. Returns the class now under the cursor.
    pub fn cycle_class(&mut self, forward: bool) -> Option<&str> {
        if self.classes.is_empty() {
            return None;
        }
        let len = self.classes.len();
        self.class_cursor = if forward {
            (self.class_cursor + 1) % len
        } else {
            (self.class_cursor + len - 1) % len
        };
        self.classes
            .get(self.class_cursor)
            .map(|c| c.class_name.as_str())
    }

    /// Steps through the club list, for pickers that show clubs one by one.
    pub fn cycle_club(&mut self, forward: bool) -> Option<&str> {
        if self.clubs.is_empty() {
            return None;
        }
        let len = self.clubs.len();
        self.club_cursor = if forward {
            (self.club_cursor + 1) % len
        } else {
            (self.club_cursor + len - 1) % len
        };
        self.clubs.get(self.club_cursor).map(String::as_str)
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.club_scroll = 0;
    }

    pub fn club_snapshot(&self) -> ClubSnapshot<'_> {
        ClubSnapshot {
            competition_selected: self.selected_competition.is_some(),
            clubs_loading: self.clubs_loading,
            clubs: &self.clubs,
            results_loading: self.club_results_loading,
            applied_filter: &self.applied_club_filter,
            selected_clubs: &self.selected_clubs,
            results: &self.club_results,
        }
    }

    pub fn club_view(&self) -> ClubView {
        project_club_view(&self.club_snapshot(), self.sort)
    }

    pub fn class_view(&self) -> ClassView<'_> {
        project_class_view(
            self.selected_competition.is_some(),
            self.selected_class.as_deref(),
            self.class_loading,
            self.class_results.as_ref(),
        )
    }

    pub fn club_picker(&self) -> ClubPicker {
        club_picker(&self.clubs)
    }

    pub fn show_sort_control(&self) -> bool {
        show_sort_control(
            self.clubs_loading,
            self.club_results_loading,
            !self.club_results.is_empty(),
        )
    }

    pub fn class_of_runner(&self, runner_name: &str) -> Option<&str> {
        self.runner_classes.get(runner_name).map(String::as_str)
    }

    fn is_current(&self, competition_id: i64) -> bool {
        self.selected_competition_id() == Some(competition_id)
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    CompetitionsLoading(bool),
    SetCompetitions(Vec<Competition>),
    SetClasses {
        competition_id: i64,
        classes: Vec<CompetitionClass>,
    },
    ClassSelected {
        competition_id: i64,
        class_name: String,
    },
    ClassResultsLoading {
        competition_id: i64,
        loading: bool,
    },
    SetClassResults {
        competition_id: i64,
        results: ClassResults,
    },
    ClubsLoading {
        competition_id: i64,
        loading: bool,
    },
    SetClubs {
        competition_id: i64,
        clubs: Vec<String>,
        runner_classes: HashMap<String, String>,
    },
    ClubFilterApplied {
        competition_id: i64,
        filter: String,
        clubs: Vec<String>,
    },
    ClubResultsLoading {
        competition_id: i64,
        loading: bool,
    },
    SetClubResults {
        competition_id: i64,
        results: Vec<RunnerResult>,
    },
    SetLastPassings {
        competition_id: i64,
        passings: Vec<Passing>,
    },
    RefreshProgress {
        competition_id: i64,
        view: RefreshView,
        progress: f32,
    },
    Refreshed {
        competition_id: i64,
        at: NaiveTime,
    },
    Log(String),
}

impl Delta {
    pub fn competition_id(&self) -> Option<i64> {
        match self {
            Delta::CompetitionsLoading(_) | Delta::SetCompetitions(_) | Delta::Log(_) => None,
            Delta::SetClasses { competition_id, .. }
            | Delta::ClassSelected { competition_id, .. }
            | Delta::ClassResultsLoading { competition_id, .. }
            | Delta::SetClassResults { competition_id, .. }
            | Delta::ClubsLoading { competition_id, .. }
            | Delta::SetClubs { competition_id, .. }
            | Delta::ClubFilterApplied { competition_id, .. }
            | Delta::ClubResultsLoading { competition_id, .. }
            | Delta::SetClubResults { competition_id, .. }
            | Delta::SetLastPassings { competition_id, .. }
            | Delta::RefreshProgress { competition_id, .. }
            | Delta::Refreshed { competition_id, .. } => Some(*competition_id),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    LoadCompetitions,
    SelectCompetition(Competition),
    SelectClass(String),
    RefreshClass,
}

/// Deltas from a session that belongs to another competition are dropped.
pub fn apply_delta(state: &mut AppState, delta: Delta) {
    if let Some(competition_id) = delta.competition_id()
        && !state.is_current(competition_id)
    {
        return;
    }
    match delta {
        Delta::CompetitionsLoading(loading) => state.competitions_loading = loading,
        Delta::SetCompetitions(competitions) => {
            let keep_id = state
                .competition_under_cursor()
                .map(|c| c.id)
                .or(state.selected_competition_id());
            state.competitions = competitions;
            state.competitions_loading = false;
            state.competition_cursor = keep_id
                .and_then(|id| state.competitions.iter().position(|c| c.id == id))
                .unwrap_or(0);
        }
        Delta::SetClasses { classes, .. } => {
            state.classes = classes;
            state.class_loading = false;
            state.class_cursor = state
                .selected_class
                .as_deref()
                .and_then(|name| state.classes.iter().position(|c| c.class_name == name))
                .unwrap_or(0);
        }
        Delta::ClassSelected { class_name, .. } => {
            if let Some(idx) = state.classes.iter().position(|c| c.class_name == class_name) {
                state.class_cursor = idx;
            }
            if state.selected_class.as_deref() != Some(class_name.as_str()) {
                state.class_results = None;
                state.class_scroll = 0;
            }
            state.selected_class = Some(class_name);
        }
        Delta::ClassResultsLoading { loading, .. } => state.class_loading = loading,
        Delta::SetClassResults { results, .. } => {
            if state.selected_class.as_deref() == Some(results.class_name.as_str())
                || results.class_name.is_empty()
            {
                state.class_results = Some(results);
            }
        }
        Delta::ClubsLoading { loading, .. } => state.clubs_loading = loading,
        Delta::SetClubs {
            clubs,
            runner_classes,
            ..
        } => {
            state.clubs = clubs;
            state.runner_classes = runner_classes;
            state.clubs_loading = false;
            state.club_cursor = 0;
        }
        Delta::ClubFilterApplied { filter, clubs, .. } => {
            state.applied_club_filter = filter;
            state.selected_clubs = clubs;
            state.club_scroll = 0;
        }
        Delta::ClubResultsLoading { loading, .. } => state.club_results_loading = loading,
        Delta::SetClubResults { results, .. } => state.club_results = results,
        Delta::SetLastPassings { passings, .. } => state.last_passings = passings,
        Delta::RefreshProgress { view, progress, .. } => match view {
            RefreshView::Class => state.class_refresh_progress = progress,
            RefreshView::Club => state.club_refresh_progress = progress,
        },
        Delta::Refreshed { at, .. } => state.last_refresh = Some(at),
        Delta::Log(msg) => state.push_log(msg),
    }
}
