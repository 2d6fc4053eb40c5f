use std::env;
use std::time::Duration;

use crate::model::DEFAULT_MAX_AGE_MONTHS;
use crate::refresh::SessionTiming;
use crate::status::Locale;

pub const DEFAULT_BASE_URL: &str = "https://liveresultat.orientering.se/";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub http_timeout: Duration,
    pub timing: SessionTiming,
    pub locale: Locale,
    pub offline: bool,
    pub max_competition_age_months: u32,
    pub fetch_parallelism: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(10),
            timing: SessionTiming::default(),
            locale: Locale::English,
            offline: false,
            max_competition_age_months: DEFAULT_MAX_AGE_MONTHS,
            fetch_parallelism: 6,
        }
    }
}

impl Config {
    /// Reads `.env.local` / `.env` first, then the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = env::var("LIVERESULTS_BASE_URL")
            .ok()
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .map(with_trailing_slash)
            .unwrap_or(defaults.base_url);
        let http_timeout = Duration::from_secs(
            env::var("LIVERESULTS_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(10)
                .clamp(2, 120),
        );
        let tick_ms = env::var("LIVERESULTS_TICK_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.timing.tick.as_millis() as u64)
            .clamp(50, 1000);
        let refresh_ticks = env::var("LIVERESULTS_REFRESH_TICKS")
            .ok()
            .and_then(|val| val.parse::<i32>().ok())
            .unwrap_or(defaults.timing.refresh_ticks)
            .clamp(20, 3000);
        let locale = env::var("LIVERESULTS_LOCALE")
            .or_else(|_| env::var("LANG"))
            .map(|tag| Locale::from_tag(&tag))
            .unwrap_or_default();
        let offline = env::var("LIVERESULTS_OFFLINE")
            .ok()
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let max_competition_age_months = env::var("LIVERESULTS_COMPETITION_MAX_AGE_MONTHS")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_AGE_MONTHS)
            .clamp(1, 60);
        let fetch_parallelism = env::var("FETCH_PARALLELISM")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.fetch_parallelism)
            .clamp(1, 32);

        Self {
            base_url,
            http_timeout,
            timing: SessionTiming {
                tick: Duration::from_millis(tick_ms),
                refresh_ticks,
            },
            locale,
            offline,
            max_competition_age_months,
            fetch_parallelism,
        }
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
