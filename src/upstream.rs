use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Registry that software metadata is imported from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalDataOrigin {
    #[default]
    #[serde(rename = "wikidata")]
    Wikidata,
    #[serde(rename = "HAL")]
    Hal,
    #[serde(rename = "ComptoirDuLibre")]
    ComptoirDuLibre,
    #[serde(rename = "GitHub")]
    GitHub,
}

impl ExternalDataOrigin {
    pub const ALL: [ExternalDataOrigin; 4] = [
        ExternalDataOrigin::Wikidata,
        ExternalDataOrigin::Hal,
        ExternalDataOrigin::ComptoirDuLibre,
        ExternalDataOrigin::GitHub,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExternalDataOrigin::Wikidata => "wikidata",
            ExternalDataOrigin::Hal => "HAL",
            ExternalDataOrigin::ComptoirDuLibre => "ComptoirDuLibre",
            ExternalDataOrigin::GitHub => "GitHub",
        }
    }
}

impl fmt::Display for ExternalDataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown external data origin: {0}")]
pub struct UnknownOriginError(pub String);

impl FromStr for ExternalDataOrigin {
    type Err = UnknownOriginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|origin| origin.as_str() == s)
            .ok_or_else(|| UnknownOriginError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(500),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(delay.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("rate limited by upstream")]
    RateLimited,
    #[error("not found upstream")]
    NotFound,
    #[error("gave up after {attempts} rate-limited attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("upstream request failed: {0}")]
    Request(String),
}

/// Runs `fetch` until it succeeds, reports "not found", or fails with
/// anything other than rate limiting. Rate-limited attempts sleep for the
/// policy delay before retrying.
pub fn fetch_with_retry<T, F>(policy: &RetryPolicy, mut fetch: F) -> Result<Option<T>, UpstreamError>
where
    F: FnMut() -> Result<T, UpstreamError>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match fetch() {
            Ok(value) => return Ok(Some(value)),
            Err(UpstreamError::NotFound) => return Ok(None),
            Err(UpstreamError::RateLimited) => {
                warn!(attempt, max_attempts, "upstream rate limited");
                if attempt < max_attempts {
                    debug!(delay_ms = policy.delay.as_millis() as u64, "waiting before retry");
                    thread::sleep(policy.delay);
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(UpstreamError::RetriesExhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn retries_until_success() {
        let mut calls = 0;
        let result = fetch_with_retry(&instant(5), || {
            calls += 1;
            if calls < 3 {
                Err(UpstreamError::RateLimited)
            } else {
                Ok("Q12345")
            }
        });

        assert_eq!(result.unwrap(), Some("Q12345"));
        assert_eq!(calls, 3);
    }

    #[test]
    fn not_found_is_empty_result() {
        let mut calls = 0;
        let result: Result<Option<()>, _> = fetch_with_retry(&instant(5), || {
            calls += 1;
            Err(UpstreamError::NotFound)
        });

        assert_eq!(result.unwrap(), None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<Option<()>, _> = fetch_with_retry(&instant(3), || {
            calls += 1;
            Err(UpstreamError::RateLimited)
        });

        assert!(matches!(
            result,
            Err(UpstreamError::RetriesExhausted { attempts: 3 })
        ));
        assert_eq!(calls, 3);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<Option<()>, _> = fetch_with_retry(&instant(3), || {
            calls += 1;
            Err(UpstreamError::Request("connection reset".to_string()))
        });

        assert!(matches!(result, Err(UpstreamError::Request(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn origin_names_round_trip_through_serde() {
        assert_eq!(
            serde_json::to_string(&ExternalDataOrigin::ComptoirDuLibre).unwrap(),
            "\"ComptoirDuLibre\""
        );
        assert_eq!(
            "HAL".parse::<ExternalDataOrigin>().unwrap(),
            ExternalDataOrigin::Hal
        );
        assert!("hal".parse::<ExternalDataOrigin>().is_err());
    }
}
