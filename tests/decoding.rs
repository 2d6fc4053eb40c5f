use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use olive_terminal::model::{
    Competition, Competitions, RunnerResult, SplitControl, UNPARSABLE_PLACE_KEY,
    capitalize_words, cet_seconds_of_day, decode_duration, decode_splits, flex_int, flex_string,
    format_seconds, place_text, ranking_key, result_text, time_behind_text,
};
use olive_terminal::refresh::{RefreshCountdown, SessionTiming};
use olive_terminal::status::{Locale, RunnerStatus};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn durations_decode_from_centiseconds() {
    assert_eq!(decode_duration("213400"), "35:34");
    assert_eq!(decode_duration("30000"), " 5:00");
    assert_eq!(decode_duration("3600000"), "10:00:00");
    assert_eq!(decode_duration("372099"), "1:02:00");
    assert_eq!(decode_duration("0"), " 0:00");
    assert_eq!(decode_duration("12:34"), "12:34");
    assert_eq!(format_seconds(-75), "-1:15");
}

#[test]
fn status_labels_follow_locale() {
    assert_eq!(RunnerStatus::from_code(3).short_label(Locale::English), "MP");
    assert_eq!(RunnerStatus::from_code(3).short_label(Locale::French), "PM");
    assert_eq!(RunnerStatus::from_code(10).short_label(Locale::English), "--");
    assert_eq!(RunnerStatus::from_code(9).long_label(Locale::English), "Not Started Yet");
    assert_eq!(RunnerStatus::from_code(12).long_label(Locale::French), "Surclassé");
    assert_eq!(RunnerStatus::from_code(77), RunnerStatus::Unknown(77));
    assert_eq!(Locale::from_tag("fr_CA.UTF-8"), Locale::French);
    assert_eq!(Locale::from_tag("sv-SE"), Locale::English);
}

#[test]
fn result_and_place_texts() {
    assert_eq!(result_text("213400", 0, Locale::English), "35:34");
    assert_eq!(result_text("", 0, Locale::English), "---");
    assert_eq!(result_text("213400", 2, Locale::English), "DNF");
    assert_eq!(result_text("", 1, Locale::French), "Non partant");
    assert_eq!(place_text("4", 0, Locale::English), "4");
    assert_eq!(place_text("", 4, Locale::English), "DSQ");
    assert_eq!(time_behind_text("16600", 0), "+ 2:46");
    assert_eq!(time_behind_text("16600", 3), "");
}

#[test]
fn ranking_orders_finishers_then_failures_then_runners_still_out() {
    assert_eq!(ranking_key("3", 0, 0), 3);
    assert_eq!(ranking_key("=", 0, 0), UNPARSABLE_PLACE_KEY);
    assert_eq!(ranking_key("", 5, 0), 10_001);
    assert_eq!(ranking_key("", 3, 0), 10_002);
    assert_eq!(ranking_key("", 2, 0), 10_003);
    assert_eq!(ranking_key("", 4, 0), 10_004);
    assert_eq!(ranking_key("", 9, 4_200_000), 62_000);
    assert_eq!(ranking_key("", 10, 3_600_000), 56_000);
    assert_eq!(ranking_key("", 1, 0), 110_001);
    assert_eq!(ranking_key("", 11, 0), 110_011);
}

#[test]
fn splits_need_all_four_keys_and_sort_by_time() {
    let controls = vec![
        SplitControl {
            code: 1050,
            name: "Radio 1".to_string(),
        },
        SplitControl {
            code: 1090,
            name: "Radio 2".to_string(),
        },
        SplitControl {
            code: 1100,
            name: "Radio 3".to_string(),
        },
    ];
    let splits: HashMap<String, i64> = [
        ("1050", 98_000),
        ("1050_status", 0),
        ("1050_place", 2),
        ("1050_timeplus", 1_200),
        ("1090", 45_000),
        ("1090_status", 0),
        ("1090_place", 1),
        ("1090_timeplus", 0),
        ("1100", 120_000),
        ("1100_status", 0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let decoded = decode_splits(Some(&splits), &controls);
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].label, "Radio 2");
    assert_eq!(decoded[0].time, " 7:30");
    assert_eq!(decoded[1].label, "Radio 1");
    assert_eq!(decoded[1].place, "2");
    assert_eq!(decoded[1].time_behind, " 0:12");
    assert!(decode_splits(None, &controls).is_empty());
}

#[test]
fn names_are_capitalized_per_word() {
    assert_eq!(capitalize_words("anna lind"), "Anna Lind");
    assert_eq!(capitalize_words("östen ek-berg"), "Östen Ek-berg");
    assert_eq!(capitalize_words("Erik BERG"), "Erik BERG");
}

#[test]
fn flexible_scalars_accept_numbers_and_strings() {
    assert_eq!(flex_int(&json!(12)), 12);
    assert_eq!(flex_int(&json!(" 12 ")), 12);
    assert_eq!(flex_int(&json!("x")), 0);
    assert_eq!(flex_int(&json!(null)), 0);
    assert_eq!(flex_string(&json!(230000)), "230000");
    assert_eq!(flex_string(&json!(null)), "");

    let runner: RunnerResult = serde_json::from_value(json!({
        "place": 2,
        "name": "erik berg",
        "club": "IFK Lidingö SOK",
        "result": 230000,
        "status": "0",
        "timeplus": 16600,
        "start": "3660000",
        "splits": []
    }))
    .expect("runner decodes");
    assert_eq!(runner.place, "2");
    assert_eq!(runner.result, "230000");
    assert_eq!(runner.status, 0);
    assert_eq!(runner.start, 3_660_000);
    assert!(!runner.has_splits());
    assert_eq!(runner.start_time_text(), "10:10:00");
}

#[test]
fn runners_still_out_report_running_time() {
    let runner: RunnerResult = serde_json::from_value(json!({
        "name": "nils holm",
        "status": 9,
        "start": 3_600_000
    }))
    .expect("runner decodes");
    assert!(runner.is_running_today(true));
    assert_eq!(runner.elapsed_since_start(0, 36_000 + 754), "(12:34)");
    assert_eq!(runner.elapsed_since_start(0, 35_000), "");
    assert_eq!(runner.elapsed_since_start(1, 36_000), "(1:00:00)");

    let unscheduled: RunnerResult = serde_json::from_value(json!({
        "name": "olof ek",
        "status": 10,
        "start": 0
    }))
    .expect("runner decodes");
    assert!(unscheduled.is_running_today(false));
    assert!(!unscheduled.is_running_today(true));
}

#[test]
fn central_european_clock_tracks_summer_time() {
    let winter = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
    assert_eq!(cet_seconds_of_day(winter), 10 * 3600);
    let summer = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
    assert_eq!(cet_seconds_of_day(summer), 11 * 3600);
    let after_switch = Utc.with_ymd_and_hms(2026, 10, 25, 1, 0, 0).unwrap();
    assert_eq!(cet_seconds_of_day(after_switch), 2 * 3600);
}

#[test]
fn competitions_are_listed_newest_first_within_the_window() {
    let today = date(2026, 10, 18);
    let make = |id: i64, d: NaiveDate| Competition {
        id,
        name: format!("C{id}"),
        organizer: String::new(),
        date: d,
        time_offset_hours: 0,
        multiday_stage: None,
        multiday_first_day: None,
    };
    let mut list = Competitions {
        competitions: vec![
            make(1, date(2026, 9, 1)),
            make(2, date(2026, 10, 19)),
            make(3, today),
            make(4, date(2026, 6, 17)),
            make(5, date(2026, 6, 18)),
        ],
    };
    list.sort_for_display_on(today, 4);

    let ids: Vec<i64> = list.competitions.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![3, 1, 5]);
    assert!(list.find(5).is_some());
    assert!(list.find(2).is_none());
    assert!(make(3, today).is_today_on(today));
    assert!(make(2, date(2026, 10, 19)).is_future_on(today));
}

#[test]
fn countdown_fires_immediately_when_disabled_then_paces() {
    let mut countdown = RefreshCountdown::new(SessionTiming {
        tick: std::time::Duration::from_millis(100),
        refresh_ticks: 3,
    });
    assert!(countdown.is_disabled());
    assert_eq!(countdown.progress(), 0.0);
    assert!(countdown.poll());
    assert_eq!(countdown.remaining(), 3);

    let fired: Vec<bool> = (0..4).map(|_| countdown.poll()).collect();
    assert_eq!(fired, vec![false, false, false, false]);
    assert!(countdown.is_disabled());
    assert!(countdown.poll());

    countdown.reset();
    assert!(!countdown.poll());
    assert!((countdown.progress() - 1.0 / 3.0).abs() < 1e-6);
    countdown.disable();
    assert_eq!(countdown.progress(), 0.0);
}

#[test]
fn listed_runner_examples_decode_as_documented() {
    let finisher: RunnerResult = serde_json::from_value(json!({
        "place": "3",
        "name": "karl sjöberg",
        "result": "102300",
        "status": 0
    }))
    .expect("runner decodes");
    assert_eq!(finisher.result_text(Locale::English), "17:03");
    assert_eq!(finisher.ranking_key(), 3);

    let still_out: RunnerResult = serde_json::from_value(json!({
        "name": "emma ek",
        "status": 9,
        "start": 360000
    }))
    .expect("runner decodes");
    assert_eq!(still_out.ranking_key(), 23_600);
}

#[test]
fn single_keyed_split_yields_one_split() {
    let controls = vec![
        SplitControl {
            code: 1110,
            name: "Radio 1110".to_string(),
        },
        SplitControl {
            code: 1120,
            name: "Radio 1120".to_string(),
        },
    ];
    let splits: HashMap<String, i64> = [
        ("1110", 5000),
        ("1110_status", 0),
        ("1110_place", 2),
        ("1110_timeplus", 100),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let decoded = decode_splits(Some(&splits), &controls);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].label, "Radio 1110");
    assert_eq!(decoded[0].time, " 0:50");
    assert_eq!(decoded[0].status, 0);
    assert_eq!(decoded[0].place, "2");
    assert_eq!(decoded[0].time_behind, " 0:01");
}

#[test]
fn extreme_codes_and_offsets_do_not_overflow() {
    let runner: RunnerResult = serde_json::from_value(json!({
        "name": "olof holm",
        "status": "9223372036854775807",
        "start": i64::MAX
    }))
    .expect("runner decodes");
    assert_eq!(runner.status, i64::MAX);
    assert_eq!(runner.ranking_key(), i64::MAX);
    assert_eq!(ranking_key("", 10, i64::MAX), 20_000 + i64::MAX / 100);
    assert_eq!(ranking_key("", i64::MIN, 0), 110_000 + i64::MIN);

    let early: RunnerResult = serde_json::from_value(json!({
        "name": "olof holm",
        "status": 9,
        "start": 0
    }))
    .expect("runner decodes");
    assert_eq!(early.elapsed_since_start(i64::MIN, 36_000), "");
    assert!(!early.elapsed_since_start(i64::MAX, 36_000).is_empty());
    assert_eq!(format_seconds(i64::MIN).chars().next(), Some('-'));
}
