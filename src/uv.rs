//! UV index provider client
//! https://www.openuv.io/uvindex

use crate::location::Coordinates;
use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use serde::Deserialize;
use std::fmt::{self, Display, Formatter};

/// Shown in place of the index when the fetch fails
pub const FETCH_ERROR_TEXT: &str = "Error fetching UV data";

/// Anything that can give us a UV index for a position
pub trait UvSource: Send {
    fn fetch(&self, coordinates: Coordinates)
        -> Result<UvObservation, UvFetchError>;
}

/// Whatever we know about the UV index. A failed fetch is stored as a
/// reading too, so everything downstream just sees "no window"
#[derive(Clone, Debug, PartialEq)]
pub enum UvReading {
    Index(UvObservation),
    Failed,
}

impl UvReading {
    /// Numeric index, if we have one
    pub fn index(&self) -> Option<f64> {
        match self {
            Self::Index(observation) => Some(observation.uv),
            Self::Failed => None,
        }
    }
}

impl From<Result<UvObservation, UvFetchError>> for UvReading {
    fn from(result: Result<UvObservation, UvFetchError>) -> Self {
        match result {
            Ok(observation) => Self::Index(observation),
            Err(err) => {
                warn!("{FETCH_ERROR_TEXT}: {err}");
                Self::Failed
            }
        }
    }
}

impl Display for UvReading {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(observation) => write!(f, "{observation}"),
            Self::Failed => write!(f, "{FETCH_ERROR_TEXT}"),
        }
    }
}

/// One successful answer from the provider
#[derive(Clone, Debug, PartialEq)]
pub struct UvObservation {
    pub uv: f64,
    /// Peak index for the day
    pub uv_max: Option<f64>,
    /// When `uv` was measured
    pub uv_time: Option<DateTime<Utc>>,
    pub uv_max_time: Option<DateTime<Utc>>,
}

impl UvObservation {
    pub fn new(uv: f64) -> Self {
        Self {
            uv,
            uv_max: None,
            uv_time: None,
            uv_max_time: None,
        }
    }
}

impl Display for UvObservation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // As the provider sent it, so band edges like 5.004 aren't hidden
        write!(f, "{}", self.uv)?;
        if let Some(time) = self.uv_time {
            write!(f, " at {}", local_time(time))?;
        }
        if let Some(uv_max) = self.uv_max {
            write!(f, " (max {uv_max}")?;
            if let Some(time) = self.uv_max_time {
                write!(f, " at {}", local_time(time))?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Short local clock time, e.g. `1:30pm`
fn local_time(time: DateTime<Utc>) -> String {
    // https://docs.rs/chrono/latest/chrono/format/strftime/index.html
    time.with_timezone(&Local).format("%-I:%M%P").to_string()
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UvFetchError {
    #[error("Provider responded with status {0}")]
    Status(u16),
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid UV index {0}")]
    Invalid(f64),
}

/// Blocking client for the OpenUV API
pub struct UvClient {
    agent: ureq::Agent,
    url: String,
    api_key: Option<String>,
}

impl UvClient {
    const TOKEN_HEADER: &'static str = "x-access-token";

    pub fn new(
        agent: ureq::Agent,
        url: impl Into<String>,
        api_key: Option<&str>,
    ) -> Self {
        Self {
            agent,
            url: url.into(),
            api_key: api_key.map(String::from),
        }
    }
}

impl UvSource for UvClient {
    fn fetch(
        &self,
        coordinates: Coordinates,
    ) -> Result<UvObservation, UvFetchError> {
        info!("Fetching UV index for {coordinates}");
        let mut request = self
            .agent
            .get(&self.url)
            .query("lat", &coordinates.latitude.to_string())
            .query("lng", &coordinates.longitude.to_string());
        match &self.api_key {
            Some(key) => request = request.set(Self::TOKEN_HEADER, key),
            // The provider will reject this, and we'll report it as a failed
            // fetch like anything else
            None => warn!("No UV API key configured, sending request anyway"),
        }

        let response = request.call().map_err(|err| match err {
            ureq::Error::Status(status, _) => UvFetchError::Status(status),
            ureq::Error::Transport(transport) => {
                UvFetchError::Transport(transport.to_string())
            }
        })?;
        let body = response
            .into_string()
            .map_err(|err| UvFetchError::Transport(err.to_string()))?;
        parse_response(&body)
    }
}

/// Pull the observation out of a provider response body
pub fn parse_response(body: &str) -> Result<UvObservation, UvFetchError> {
    let response: UvResponse = serde_json::from_str(body)
        .map_err(|err| UvFetchError::Parse(err.to_string()))?;
    let result = response.result;
    if !result.uv.is_finite() || result.uv < 0.0 {
        return Err(UvFetchError::Invalid(result.uv));
    }
    Ok(UvObservation {
        uv: result.uv,
        uv_max: result.uv_max,
        uv_time: result.uv_time,
        uv_max_time: result.uv_max_time,
    })
}

#[derive(Debug, Deserialize)]
struct UvResponse {
    result: UvResult,
}

#[derive(Debug, Deserialize)]
struct UvResult {
    uv: f64,
    #[serde(default)]
    uv_max: Option<f64>,
    #[serde(default)]
    uv_time: Option<DateTime<Utc>>,
    #[serde(default)]
    uv_max_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let observation = parse_response(
            r#"{"result": {
                "uv": 4.2261,
                "uv_time": "2024-05-24T17:00:00.000Z",
                "uv_max": 7.1,
                "uv_max_time": "2024-05-24T16:30:00.000Z",
                "ozone": 310.5,
                "safe_exposure_time": {"st1": 39}
            }}"#,
        )
        .unwrap();
        assert_eq!(observation.uv, 4.2261);
        assert_eq!(observation.uv_max, Some(7.1));
        assert_eq!(
            observation.uv_time,
            Some("2024-05-24T17:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn test_parse_minimal_response() {
        assert_eq!(
            parse_response(r#"{"result": {"uv": 0}}"#),
            Ok(UvObservation::new(0.0))
        );
    }

    #[test]
    fn test_parse_bad_response() {
        assert!(matches!(
            parse_response(r#"{"error": "Daily API quota exceeded"}"#),
            Err(UvFetchError::Parse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"result": {"uv": "high"}}"#),
            Err(UvFetchError::Parse(_))
        ));
        assert!(matches!(
            parse_response("<html>nope</html>"),
            Err(UvFetchError::Parse(_))
        ));
        assert_eq!(
            parse_response(r#"{"result": {"uv": -1.5}}"#),
            Err(UvFetchError::Invalid(-1.5))
        );
    }

    #[test]
    fn test_failed_fetch_becomes_sentinel() {
        let reading: UvReading = Err(UvFetchError::Status(403)).into();
        assert_eq!(reading, UvReading::Failed);
        assert_eq!(reading.index(), None);
        assert_eq!(reading.to_string(), "Error fetching UV data");
    }

    #[test]
    fn test_display() {
        let reading = UvReading::Index(UvObservation::new(4.0));
        assert_eq!(reading.index(), Some(4.0));
        assert_eq!(reading.to_string(), "4");
        let reading = UvReading::Index(UvObservation {
            uv_max: Some(7.25),
            ..UvObservation::new(4.0)
        });
        assert_eq!(reading.to_string(), "4 (max 7.25)");
        let reading = UvReading::Index(UvObservation::new(5.004));
        assert_eq!(reading.to_string(), "5.004");
    }
}
