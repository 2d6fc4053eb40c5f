use std::env;

use anyhow::{Context, Result, bail};

use olive_terminal::config::Config;
use olive_terminal::feed_api::{FetchOutcome, HttpFeed, LiveFeed};

/// Exercises the live service once: competition list, then the classes and a
/// conditional re-fetch of one class, printing what came back.
fn main() -> Result<()> {
    let config = Config::load();
    let feed = HttpFeed::new(&config)?;

    let competition_id = match env::args().nth(1) {
        Some(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("bad competition id {raw}"))?,
        None => {
            let mut competitions = match feed.competitions() {
                FetchOutcome::Fresh { data, .. } => data,
                FetchOutcome::NotModified => bail!("competition list came back not modified"),
                FetchOutcome::Error(err) => return Err(err).context("fetch competitions"),
            };
            competitions.sort_for_display();
            println!("{} recent competitions", competitions.competitions.len());
            for c in competitions.competitions.iter().take(10) {
                println!("  {:>6}  {}  {}", c.id, c.date, c.name);
            }
            let Some(first) = competitions.competitions.first() else {
                return Ok(());
            };
            first.id
        }
    };

    match feed.competition_info(competition_id) {
        FetchOutcome::Fresh { data, .. } => {
            println!("Competition {}: {} ({})", data.id, data.name, data.organizer)
        }
        FetchOutcome::NotModified => println!("Competition info not modified"),
        FetchOutcome::Error(err) => eprintln!("Competition info failed: {err}"),
    }

    let classes = match feed.classes(competition_id, "") {
        FetchOutcome::Fresh { data, .. } => data,
        FetchOutcome::NotModified => Vec::new(),
        FetchOutcome::Error(err) => return Err(err).context("fetch classes"),
    };
    println!("{} classes", classes.len());
    let Some(class) = classes.first() else {
        return Ok(());
    };

    let hash = match feed.class_results(competition_id, &class.class_name, "") {
        FetchOutcome::Fresh { data, hash } => {
            println!(
                "{}: {} runners, {} split controls, hash={hash}",
                class.class_name,
                data.results.len(),
                data.split_controls.len()
            );
            hash
        }
        FetchOutcome::NotModified => bail!("unconditional fetch came back not modified"),
        FetchOutcome::Error(err) => return Err(err).context("fetch class results"),
    };

    match feed.class_results(competition_id, &class.class_name, &hash) {
        FetchOutcome::Fresh { hash: next, .. } => println!("Re-fetch changed: hash={next}"),
        FetchOutcome::NotModified => println!("Re-fetch: not modified"),
        FetchOutcome::Error(err) => eprintln!("Re-fetch failed: {err}"),
    }

    match feed.last_passings(competition_id, "") {
        FetchOutcome::Fresh { data, hash } => {
            println!("{} last passings, hash={hash}", data.len());
            for p in data.iter().take(5) {
                println!(
                    "  {}  {} ({})  {}",
                    p.pass_time, p.runner_name, p.class_name, p.control_name
                );
            }
        }
        FetchOutcome::NotModified => println!("Last passings not modified"),
        FetchOutcome::Error(err) => eprintln!("Last passings failed: {err}"),
    }
    Ok(())
}
