mod common;

use olive_terminal::model::{ClassResults, RunnerResult};
use olive_terminal::projection::{
    ClassView, ClubPicker, ClubSnapshot, ClubView, SortMode, club_picker, has_similar_names,
    project_class_view, project_club_view, show_sort_control, sort_results,
};

use common::runner;

fn sample() -> Vec<RunnerResult> {
    let mut out_runner = runner("nils holm", "OK Linné", 9, "", "");
    out_runner.start = 4_200_000;
    vec![
        runner("erik berg", "OK Ravinen", 0, "2", "230000"),
        out_runner,
        runner("anna lind", "IFK Lidingö SOK", 0, "1", "213400"),
        runner("sara dahl", "OK Ravinen", 3, "", ""),
        runner("Björn ek", "IFK Lidingö SOK", 0, "=", "240000"),
    ]
}

fn snapshot<'a>(
    clubs: &'a [String],
    selected: &'a [String],
    results: &'a [RunnerResult],
    filter: &'a str,
) -> ClubSnapshot<'a> {
    ClubSnapshot {
        competition_selected: true,
        clubs_loading: false,
        clubs,
        results_loading: false,
        applied_filter: filter,
        selected_clubs: selected,
        results,
    }
}

fn names(results: &[RunnerResult]) -> Vec<&str> {
    results.iter().map(|r| r.name.as_str()).collect()
}

#[test]
fn sort_modes_cycle() {
    assert_eq!(SortMode::default(), SortMode::Alphabetical);
    assert_eq!(SortMode::Alphabetical.next(), SortMode::Ranking);
    assert_eq!(SortMode::Ranking.next(), SortMode::Club);
    assert_eq!(SortMode::Club.next(), SortMode::Alphabetical);
    assert_eq!(SortMode::Ranking.label(), "123");
}

#[test]
fn alphabetical_sort_uses_display_names() {
    let sorted = sort_results(&sample(), SortMode::Alphabetical);
    assert_eq!(
        names(&sorted),
        vec!["anna lind", "Björn ek", "erik berg", "nils holm", "sara dahl"]
    );
}

#[test]
fn ranking_sort_puts_finishers_first() {
    let sorted = sort_results(&sample(), SortMode::Ranking);
    assert_eq!(
        names(&sorted),
        vec!["anna lind", "erik berg", "Björn ek", "sara dahl", "nils holm"]
    );
}

#[test]
fn club_sort_is_stable() {
    let sorted = sort_results(&sample(), SortMode::Club);
    assert_eq!(
        names(&sorted),
        vec!["anna lind", "Björn ek", "nils holm", "erik berg", "sara dahl"]
    );
}

#[test]
fn club_view_states() {
    let clubs = vec!["OK Ravinen".to_string(), "OK Linné".to_string()];
    let selected = vec!["OK Ravinen".to_string()];
    let results = sample();
    let none: Vec<String> = Vec::new();
    let empty: Vec<RunnerResult> = Vec::new();

    let mut snap = snapshot(&clubs, &selected, &results, "rav");
    snap.competition_selected = false;
    assert_eq!(project_club_view(&snap, SortMode::Alphabetical), ClubView::NoCompetitionSelected);

    let mut snap = snapshot(&none, &none, &empty, "");
    snap.clubs_loading = true;
    assert_eq!(project_club_view(&snap, SortMode::Alphabetical), ClubView::LoadingClubList);

    let mut snap = snapshot(&clubs, &selected, &empty, "rav");
    snap.results_loading = true;
    assert_eq!(project_club_view(&snap, SortMode::Alphabetical), ClubView::LoadingResults);

    let snap = snapshot(&clubs, &none, &empty, "  ");
    assert_eq!(
        project_club_view(&snap, SortMode::Alphabetical),
        ClubView::EmptyNoClubEntered(2)
    );

    let snap = snapshot(&clubs, &none, &empty, "zzz");
    assert_eq!(project_club_view(&snap, SortMode::Alphabetical), ClubView::EmptyNoMatch);

    let snap = snapshot(&clubs, &selected, &empty, "rav");
    assert_eq!(project_club_view(&snap, SortMode::Alphabetical), ClubView::EmptyNoMatch);

    let snap = snapshot(&clubs, &selected, &results, "rav");
    match project_club_view(&snap, SortMode::Ranking) {
        ClubView::ResultsReady(sorted) => assert_eq!(sorted[0].name, "anna lind"),
        other => panic!("unexpected view {other:?}"),
    }
}

#[test]
fn results_stay_visible_while_refreshing() {
    let clubs = vec!["OK Ravinen".to_string()];
    let results = sample();
    let mut snap = snapshot(&clubs, &clubs, &results, "rav");
    snap.results_loading = true;
    assert!(matches!(
        project_club_view(&snap, SortMode::Alphabetical),
        ClubView::ResultsReady(_)
    ));
}

#[test]
fn class_view_states() {
    let loaded = ClassResults {
        class_name: "H21".to_string(),
        results: sample(),
        ..ClassResults::default()
    };
    let empty = ClassResults::default();

    assert_eq!(
        project_class_view(false, Some("H21"), false, Some(&loaded)),
        ClassView::NoCompetitionSelected
    );
    assert_eq!(project_class_view(true, None, false, None), ClassView::NoClassSelected);
    assert_eq!(project_class_view(true, Some("H21"), true, None), ClassView::Loading);
    assert_eq!(project_class_view(true, Some("H21"), false, Some(&empty)), ClassView::Empty);
    assert_eq!(
        project_class_view(true, Some("H21"), true, Some(&loaded)),
        ClassView::Ready(&loaded)
    );
}

#[test]
fn similar_names_switch_the_picker_to_search() {
    let relay: Vec<String> = (1..=10).map(|n| format!("OK Ravinen {n}")).collect();
    assert!(has_similar_names(&relay));
    assert_eq!(club_picker(&relay), ClubPicker::Search);

    let short: Vec<String> = relay.iter().take(9).cloned().collect();
    assert!(!has_similar_names(&short));

    let distinct: Vec<String> = [
        "Alfta", "Bromma", "Cosmos", "Dala", "Eskil", "Falun", "Gävle", "Hagaby", "Ilsbo", "Järla",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    assert!(!has_similar_names(&distinct));
    assert_eq!(club_picker(&distinct), ClubPicker::List);
}

#[test]
fn sort_control_only_with_settled_results() {
    assert!(show_sort_control(false, false, true));
    assert!(!show_sort_control(true, false, true));
    assert!(!show_sort_control(false, true, true));
    assert!(!show_sort_control(false, false, false));
}
