//! Where are we? The terminal has no geolocation API, so the position either
//! comes from config or from an IP lookup.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A position on the globe, in degrees
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting anything that isn't on Earth
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
        {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(LocationError::Unavailable(format!(
                "Coordinates out of range: ({latitude}, {longitude})"
            )))
        }
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Position lookup failed. This is terminal; nobody retries.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LocationError {
    /// The service refused to give us a position
    #[error("{0}")]
    Denied(String),
    /// The service couldn't be reached, or gave us garbage
    #[error("{0}")]
    Unavailable(String),
}

impl LocationError {
    /// Message to show the user
    pub fn user_message(&self) -> String {
        format!("Unable to get location: {self}")
    }
}

/// Source of the current position. Called exactly once per session.
pub trait LocationService: Send {
    /// Get a descriptive name for this service, for logging
    fn name(&self) -> &str;

    fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Position pinned in config
#[derive(Debug)]
pub struct FixedLocation(pub Coordinates);

impl LocationService for FixedLocation {
    fn name(&self) -> &str {
        "config"
    }

    fn current_position(&self) -> Result<Coordinates, LocationError> {
        Coordinates::new(self.0.latitude, self.0.longitude)
    }
}

/// Approximate position based on our public IP
/// http://ip-api.com/docs/api:json
pub struct IpLocation {
    agent: ureq::Agent,
    url: String,
}

impl IpLocation {
    pub fn new(agent: ureq::Agent, url: impl Into<String>) -> Self {
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl LocationService for IpLocation {
    fn name(&self) -> &str {
        "ip-api"
    }

    fn current_position(&self) -> Result<Coordinates, LocationError> {
        info!("Looking up position from {}", self.url);
        let response = self.agent.get(&self.url).call().map_err(|err| {
            LocationError::Unavailable(format!(
                "Error contacting {}: {err}",
                self.url
            ))
        })?;
        let body: IpLookup = response.into_json().map_err(|err| {
            LocationError::Unavailable(format!(
                "Error parsing location response: {err}"
            ))
        })?;
        body.into_coordinates()
    }
}

#[derive(Debug, Deserialize)]
struct IpLookup {
    status: IpLookupStatus,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum IpLookupStatus {
    Success,
    Fail,
}

impl IpLookup {
    fn into_coordinates(self) -> Result<Coordinates, LocationError> {
        match (self.status, self.lat, self.lon) {
            (IpLookupStatus::Success, Some(lat), Some(lon)) => {
                Coordinates::new(lat, lon)
            }
            (IpLookupStatus::Success, _, _) => Err(LocationError::Unavailable(
                "Location response is missing coordinates".into(),
            )),
            (IpLookupStatus::Fail, _, _) => Err(LocationError::Denied(
                self.message.unwrap_or_else(|| "unknown reason".into()),
            )),
        }
    }
}
