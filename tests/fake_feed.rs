use chrono::Local;

use olive_terminal::fake_feed::{FAKE_COMPETITION_ID, FakeFeed};
use olive_terminal::feed_api::{FetchOutcome, LiveFeed};
use olive_terminal::model::{ClassResults, Passing};

const BEFORE_START: i64 = 9 * 3600;
const AFTER_FINISH: i64 = 14 * 3600;

fn fresh<T>(outcome: FetchOutcome<T>) -> (T, String) {
    match outcome {
        FetchOutcome::Fresh { data, hash } => (data, hash),
        FetchOutcome::NotModified => panic!("expected fresh data, got not modified"),
        FetchOutcome::Error(err) => panic!("expected fresh data, got {err}"),
    }
}

fn h21(feed: &FakeFeed, last_hash: &str) -> FetchOutcome<ClassResults> {
    feed.class_results(FAKE_COMPETITION_ID, "H21", last_hash)
}

#[test]
fn lists_todays_competition_and_its_classes() {
    let feed = FakeFeed::with_seed(7);
    let (list, _) = fresh(feed.competitions());
    let today = list.find(FAKE_COMPETITION_ID).expect("demo competition");
    assert!(today.is_today_on(Local::now().date_naive()));
    assert_eq!(list.competitions.len(), 4);

    let (classes, hash) = fresh(feed.classes(FAKE_COMPETITION_ID, ""));
    let names: Vec<&str> = classes.iter().map(|c| c.class_name.as_str()).collect();
    assert_eq!(names, vec!["H21", "D21", "H16", "D16", "Öppen 1"]);
    assert_eq!(feed.classes(FAKE_COMPETITION_ID, &hash), FetchOutcome::NotModified);
}

#[test]
fn hash_holds_until_the_race_clock_moves() {
    let feed = FakeFeed::with_seed(7);
    feed.set_clock(BEFORE_START);
    let (before, hash) = fresh(h21(&feed, ""));
    assert!(before.results.iter().all(|r| r.status == 10 || r.status == 1));
    assert_eq!(h21(&feed, &hash), FetchOutcome::NotModified);

    feed.set_clock(AFTER_FINISH);
    let (after, later_hash) = fresh(h21(&feed, &hash));
    assert_ne!(later_hash, hash);
    assert!(after.results.iter().all(|r| r.status != 9 && r.status != 10));
    if let Some(winner) = after.results.iter().find(|r| r.place == "1") {
        assert_eq!(winner.timeplus, "0");
        assert_eq!(winner.status, 0);
    }
}

#[test]
fn same_seed_gives_the_same_race() {
    let a = FakeFeed::with_seed(42);
    let b = FakeFeed::with_seed(42);
    a.set_clock(AFTER_FINISH);
    b.set_clock(AFTER_FINISH);
    assert_eq!(h21(&a, ""), h21(&b, ""));
}

#[test]
fn club_results_only_hold_that_club() {
    let feed = FakeFeed::with_seed(3);
    feed.set_clock(AFTER_FINISH);
    let (class, _) = fresh(h21(&feed, ""));
    let club = class.results[0].club_name.clone();

    let (results, hash) = fresh(feed.club_results(FAKE_COMPETITION_ID, &club, ""));
    assert!(!results.results.is_empty());
    assert!(results.results.iter().all(|r| r.club_name == club));
    assert!(results.results.iter().all(|r| r.class_name.is_some()));
    assert_eq!(
        feed.club_results(FAKE_COMPETITION_ID, &club, &hash),
        FetchOutcome::NotModified
    );
}

#[test]
fn last_passings_are_newest_first() {
    let feed = FakeFeed::with_seed(11);
    feed.set_clock(BEFORE_START);
    let (none, _): (Vec<Passing>, String) = fresh(feed.last_passings(FAKE_COMPETITION_ID, ""));
    assert!(none.is_empty());

    feed.set_clock(AFTER_FINISH);
    let (passings, hash) = fresh(feed.last_passings(FAKE_COMPETITION_ID, ""));
    assert_eq!(passings.len(), 10);
    assert!(
        passings
            .windows(2)
            .all(|pair| pair[0].pass_time >= pair[1].pass_time)
    );
    assert_eq!(
        feed.last_passings(FAKE_COMPETITION_ID, &hash),
        FetchOutcome::NotModified
    );
}

#[test]
fn unknown_competitions_are_empty() {
    let feed = FakeFeed::with_seed(1);
    let (classes, _) = fresh(feed.classes(1, ""));
    assert!(classes.is_empty());
}
