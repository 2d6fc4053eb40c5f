use std::collections::HashSet;

use crate::model::{ClassResults, RunnerResult};

/// Club-view ordering. Applied when projecting, never stored back into the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Alphabetical,
    Ranking,
    Club,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Alphabetical => SortMode::Ranking,
            SortMode::Ranking => SortMode::Club,
            SortMode::Club => SortMode::Alphabetical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Alphabetical => "abc",
            SortMode::Ranking => "123",
            SortMode::Club => "Team",
        }
    }
}

/// Stable sort, so equal keys keep feed order.
pub fn sort_results(results: &[RunnerResult], mode: SortMode) -> Vec<RunnerResult> {
    let mut sorted = results.to_vec();
    match mode {
        SortMode::Alphabetical => sorted.sort_by_cached_key(|r| r.display_name()),
        SortMode::Ranking => sorted.sort_by_key(|r| r.ranking_key()),
        SortMode::Club => sorted.sort_by(|a, b| a.club_name.cmp(&b.club_name)),
    }
    sorted
}

/// Borrowed view of the club-side state needed to decide what to show.
#[derive(Debug, Clone, Copy)]
pub struct ClubSnapshot<'a> {
    pub competition_selected: bool,
    pub clubs_loading: bool,
    pub clubs: &'a [String],
    pub results_loading: bool,
    pub applied_filter: &'a str,
    pub selected_clubs: &'a [String],
    pub results: &'a [RunnerResult],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClubView {
    NoCompetitionSelected,
    LoadingClubList,
    LoadingResults,
    EmptyNoClubEntered(usize),
    EmptyNoMatch,
    ResultsReady(Vec<RunnerResult>),
}

pub fn project_club_view(snapshot: &ClubSnapshot<'_>, sort: SortMode) -> ClubView {
    if !snapshot.competition_selected {
        return ClubView::NoCompetitionSelected;
    }
    if snapshot.clubs_loading && snapshot.clubs.is_empty() {
        return ClubView::LoadingClubList;
    }
    if snapshot.results_loading && snapshot.results.is_empty() {
        return ClubView::LoadingResults;
    }
    if !snapshot.clubs_loading && !snapshot.results.is_empty() {
        return ClubView::ResultsReady(sort_results(snapshot.results, sort));
    }
    if snapshot.applied_filter.trim().is_empty() && snapshot.selected_clubs.is_empty() {
        return ClubView::EmptyNoClubEntered(snapshot.clubs.len());
    }
    ClubView::EmptyNoMatch
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassView<'a> {
    NoCompetitionSelected,
    NoClassSelected,
    Loading,
    Empty,
    Ready(&'a ClassResults),
}

pub fn project_class_view<'a>(
    competition_selected: bool,
    selected_class: Option<&str>,
    loading: bool,
    results: Option<&'a ClassResults>,
) -> ClassView<'a> {
    if !competition_selected {
        return ClassView::NoCompetitionSelected;
    }
    if selected_class.is_none() {
        return ClassView::NoClassSelected;
    }
    match results {
        Some(results) if !results.results.is_empty() => ClassView::Ready(results),
        _ if loading => ClassView::Loading,
        _ => ClassView::Empty,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClubPicker {
    List,
    Search,
}

/// Long lists of near-identical names (relay teams like "OK Foo 1", "OK Foo 2")
/// are unusable as a plain list.
pub fn club_picker(clubs: &[String]) -> ClubPicker {
    if has_similar_names(clubs) {
        ClubPicker::Search
    } else {
        ClubPicker::List
    }
}

/// True when at least ten names are given and two differ only by their last character.
pub fn has_similar_names(names: &[String]) -> bool {
    if names.len() < 10 {
        return false;
    }
    let mut stems = HashSet::with_capacity(names.len());
    for name in names {
        let mut chars = name.char_indices();
        let Some((last_idx, _)) = chars.next_back() else {
            continue;
        };
        if last_idx == 0 {
            continue;
        }
        if !stems.insert(&name[..last_idx]) {
            return true;
        }
    }
    false
}

pub fn show_sort_control(clubs_loading: bool, results_loading: bool, has_results: bool) -> bool {
    !clubs_loading && !results_loading && has_results
}
