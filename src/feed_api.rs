use anyhow::Result;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::http_client::http_client;
use crate::model::{
    ClassResults, ClubResults, Competition, CompetitionClass, Competitions, Passing,
};

pub const NOT_MODIFIED_STATUS: &str = "NOT MODIFIED";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Unknown(String),
}

/// Result of one feed call. `NotModified` is a normal outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Fresh { data: T, hash: String },
    NotModified,
    Error(FeedError),
}

impl<T> FetchOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Fresh { data, hash } => FetchOutcome::Fresh {
                data: f(data),
                hash,
            },
            FetchOutcome::NotModified => FetchOutcome::NotModified,
            FetchOutcome::Error(err) => FetchOutcome::Error(err),
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, FetchOutcome::Fresh { .. })
    }
}

/// One call per remote method. Implementations recover every failure into
/// `FetchOutcome::Error`; nothing panics or propagates past this boundary.
pub trait LiveFeed: Send + Sync {
    fn competitions(&self) -> FetchOutcome<Competitions>;
    fn classes(&self, competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<CompetitionClass>>;
    fn class_results(
        &self,
        competition_id: i64,
        class_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClassResults>;
    fn club_results(
        &self,
        competition_id: i64,
        club_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClubResults>;
    fn last_passings(&self, competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<Passing>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedRequest<'a> {
    Competitions,
    CompetitionInfo {
        competition_id: i64,
    },
    Classes {
        competition_id: i64,
        last_hash: &'a str,
    },
    ClassResults {
        competition_id: i64,
        class_name: &'a str,
        last_hash: &'a str,
    },
    ClubResults {
        competition_id: i64,
        club_name: &'a str,
        last_hash: &'a str,
    },
    LastPassings {
        competition_id: i64,
        last_hash: &'a str,
    },
}

impl FeedRequest<'_> {
    /// `<base>api.php?method=...`, query values form-encoded.
    pub fn url(&self, base_url: &str) -> Result<Url, FeedError> {
        let endpoint = format!("{base_url}api.php");
        let params = self.params();
        Url::parse_with_params(&endpoint, params.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|err| FeedError::Transport(format!("bad url {endpoint}: {err}")))
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        match *self {
            FeedRequest::Competitions => vec![("method", "getcompetitions".to_string())],
            FeedRequest::CompetitionInfo { competition_id } => vec![
                ("method", "getcompetitioninfo".to_string()),
                ("comp", competition_id.to_string()),
            ],
            FeedRequest::Classes {
                competition_id,
                last_hash,
            } => vec![
                ("method", "getclasses".to_string()),
                ("comp", competition_id.to_string()),
                ("last_hash", last_hash.to_string()),
            ],
            FeedRequest::ClassResults {
                competition_id,
                class_name,
                last_hash,
            } => vec![
                ("method", "getclassresults".to_string()),
                ("comp", competition_id.to_string()),
                ("unformattedTimes", "true".to_string()),
                ("class", class_name.to_string()),
                ("last_hash", last_hash.to_string()),
            ],
            FeedRequest::ClubResults {
                competition_id,
                club_name,
                last_hash,
            } => vec![
                ("method", "getclubresults".to_string()),
                ("comp", competition_id.to_string()),
                ("unformattedTimes", "true".to_string()),
                ("club", club_name.to_string()),
                ("last_hash", last_hash.to_string()),
            ],
            FeedRequest::LastPassings {
                competition_id,
                last_hash,
            } => vec![
                ("method", "getlastpassings".to_string()),
                ("comp", competition_id.to_string()),
                ("last_hash", last_hash.to_string()),
            ],
        }
    }
}

pub struct HttpFeed {
    client: &'static Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(config.http_timeout)?,
            base_url: config.base_url.clone(),
        })
    }

    pub fn competition_info(&self, competition_id: i64) -> FetchOutcome<Competition> {
        match self.fetch_text(&FeedRequest::CompetitionInfo { competition_id }) {
            Ok(body) => parse_competition_info_json(&body),
            Err(err) => FetchOutcome::Error(err),
        }
    }

    fn fetch_text(&self, request: &FeedRequest<'_>) -> Result<String, FeedError> {
        let url = request.url(&self.base_url)?;
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|err| FeedError::Transport(err.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| FeedError::Transport(format!("failed reading body: {err}")))?;
        if !status.is_success() {
            return Err(FeedError::Transport(format!("http {status}")));
        }
        Ok(body)
    }
}

impl LiveFeed for HttpFeed {
    fn competitions(&self) -> FetchOutcome<Competitions> {
        match self.fetch_text(&FeedRequest::Competitions) {
            Ok(body) => parse_competitions_json(&body),
            Err(err) => FetchOutcome::Error(err),
        }
    }

    fn classes(&self, competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<CompetitionClass>> {
        let request = FeedRequest::Classes {
            competition_id,
            last_hash,
        };
        match self.fetch_text(&request) {
            Ok(body) => parse_classes_json(&body),
            Err(err) => FetchOutcome::Error(err),
        }
    }

    fn class_results(
        &self,
        competition_id: i64,
        class_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClassResults> {
        let request = FeedRequest::ClassResults {
            competition_id,
            class_name,
            last_hash,
        };
        match self.fetch_text(&request) {
            Ok(body) => parse_class_results_json(&body),
            Err(err) => FetchOutcome::Error(err),
        }
    }

    fn club_results(
        &self,
        competition_id: i64,
        club_name: &str,
        last_hash: &str,
    ) -> FetchOutcome<ClubResults> {
        let request = FeedRequest::ClubResults {
            competition_id,
            club_name,
            last_hash,
        };
        match self.fetch_text(&request) {
            Ok(body) => parse_club_results_json(&body),
            Err(err) => FetchOutcome::Error(err),
        }
    }

    fn last_passings(&self, competition_id: i64, last_hash: &str) -> FetchOutcome<Vec<Passing>> {
        let request = FeedRequest::LastPassings {
            competition_id,
            last_hash,
        };
        match self.fetch_text(&request) {
            Ok(body) => parse_last_passings_json(&body),
            Err(err) => FetchOutcome::Error(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClassesEnvelope {
    #[serde(default)]
    classes: Vec<CompetitionClass>,
    #[serde(default)]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct PassingsEnvelope {
    #[serde(default)]
    passings: Vec<Passing>,
    #[serde(default)]
    hash: String,
}

/// Competitions with an undecodable record (e.g. a malformed date) are skipped.
pub fn parse_competitions_json(raw: &str) -> FetchOutcome<Competitions> {
    let root = match parse_root(raw) {
        Ok(root) => root,
        Err(err) => return FetchOutcome::Error(err),
    };
    let Some(items) = root.get("competitions").and_then(Value::as_array) else {
        return FetchOutcome::Error(FeedError::Decode(
            "missing competitions array".to_string(),
        ));
    };
    let competitions = items
        .iter()
        .filter_map(|item| serde_json::from_value::<Competition>(item.clone()).ok())
        .collect();
    FetchOutcome::Fresh {
        data: Competitions { competitions },
        hash: String::new(),
    }
}

pub fn parse_competition_info_json(raw: &str) -> FetchOutcome<Competition> {
    match decode_envelope::<Competition>(raw) {
        Ok(Some(competition)) => FetchOutcome::Fresh {
            data: competition,
            hash: String::new(),
        },
        Ok(None) => FetchOutcome::NotModified,
        Err(err) => FetchOutcome::Error(err),
    }
}

pub fn parse_classes_json(raw: &str) -> FetchOutcome<Vec<CompetitionClass>> {
    match decode_envelope::<ClassesEnvelope>(raw) {
        Ok(Some(env)) => FetchOutcome::Fresh {
            data: env.classes,
            hash: env.hash,
        },
        Ok(None) => FetchOutcome::NotModified,
        Err(err) => FetchOutcome::Error(err),
    }
}

pub fn parse_class_results_json(raw: &str) -> FetchOutcome<ClassResults> {
    match decode_envelope::<ClassResults>(raw) {
        Ok(Some(results)) => {
            let hash = results.hash.clone();
            FetchOutcome::Fresh {
                data: results,
                hash,
            }
        }
        Ok(None) => FetchOutcome::NotModified,
        Err(err) => FetchOutcome::Error(err),
    }
}

pub fn parse_club_results_json(raw: &str) -> FetchOutcome<ClubResults> {
    match decode_envelope::<ClubResults>(raw) {
        Ok(Some(results)) => {
            let hash = results.hash.clone();
            FetchOutcome::Fresh {
                data: results,
                hash,
            }
        }
        Ok(None) => FetchOutcome::NotModified,
        Err(err) => FetchOutcome::Error(err),
    }
}

pub fn parse_last_passings_json(raw: &str) -> FetchOutcome<Vec<Passing>> {
    match decode_envelope::<PassingsEnvelope>(raw) {
        Ok(Some(env)) => FetchOutcome::Fresh {
            data: env.passings,
            hash: env.hash,
        },
        Ok(None) => FetchOutcome::NotModified,
        Err(err) => FetchOutcome::Error(err),
    }
}

fn parse_root(raw: &str) -> Result<Value, FeedError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(FeedError::Decode("empty response".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|err| FeedError::Decode(err.to_string()))
}

fn is_not_modified(root: &Value) -> bool {
    root.get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| status.trim().eq_ignore_ascii_case(NOT_MODIFIED_STATUS))
}

/// `Ok(None)` is the feed's "not modified" answer.
fn decode_envelope<T: DeserializeOwned>(raw: &str) -> Result<Option<T>, FeedError> {
    let root = parse_root(raw)?;
    if is_not_modified(&root) {
        return Ok(None);
    }
    serde_json::from_value(root)
        .map(Some)
        .map_err(|err| FeedError::Decode(err.to_string()))
}
