//! Safe exposure lookup. This is a fixed table keyed by UV index band and
//! skin type, nothing more.

use crate::uv::UvReading;
use anyhow::anyhow;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// Coarse skin classification, used to pick a more or less conservative
/// exposure window
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    #[default]
    Dark,
    Light,
}

impl SkinType {
    pub const ALL: &'static [Self] = &[Self::Dark, Self::Light];
}

impl FromStr for SkinType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            _ => Err(anyhow!(
                "Invalid skin type `{s}`, expected {}",
                Self::ALL.iter().map(|skin| format!("`{skin}`")).join(" or ")
            )),
        }
    }
}

impl Display for SkinType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dark => write!(f, "dark"),
            Self::Light => write!(f, "light"),
        }
    }
}

/// Lowest UV index with a defined exposure window (inclusive)
pub const UV_MIN: f64 = 3.0;
/// Upper edge of the moderate band (inclusive)
pub const UV_MODERATE_MAX: f64 = 5.0;
/// Highest UV index with a defined exposure window (inclusive)
pub const UV_MAX: f64 = 8.0;

/// Recommended exposure in minutes, or `None` when the index is outside the
/// table. 5 belongs to the moderate band; anything above it, up to and
/// including 8, is the high band.
pub fn exposure_minutes(uv: f64, skin: SkinType) -> Option<u32> {
    // NaN fails every comparison below, so it falls through to None
    if (UV_MIN..=UV_MODERATE_MAX).contains(&uv) {
        Some(match skin {
            SkinType::Light => 15,
            SkinType::Dark => 30,
        })
    } else if uv > UV_MODERATE_MAX && uv <= UV_MAX {
        Some(match skin {
            SkinType::Light => 9,
            SkinType::Dark => 17,
        })
    } else {
        None
    }
}

/// Exposure for whatever we currently know about the UV index. Missing and
/// failed readings have no window.
pub fn exposure_for(reading: Option<&UvReading>, skin: SkinType) -> Option<u32> {
    reading
        .and_then(UvReading::index)
        .and_then(|uv| exposure_minutes(uv, skin))
}

/// What to tell the user about the current reading
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Advice {
    /// Still waiting on location or the provider
    Pending,
    /// Provider failed, there's nothing to go on
    Unavailable,
    TooLow,
    TooHigh,
    Window { minutes: u32 },
}

impl Advice {
    pub fn new(reading: Option<&UvReading>, skin: SkinType) -> Self {
        let uv = match reading {
            None => return Self::Pending,
            Some(UvReading::Failed) => return Self::Unavailable,
            Some(UvReading::Index(observation)) => observation.uv,
        };
        match exposure_minutes(uv, skin) {
            Some(minutes) => Self::Window { minutes },
            None if uv < UV_MIN => Self::TooLow,
            None => Self::TooHigh,
        }
    }

    /// Line shown under the UV index. `None` means nothing to say.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Pending => None,
            Self::Unavailable => {
                Some("No exposure window without a UV reading.".into())
            }
            Self::TooLow => Some(
                "UV index is too low. Please try again when UV index is \
                higher."
                    .into(),
            ),
            Self::TooHigh => Some(
                "UV index is too high. Please wait for safer conditions."
                    .into(),
            ),
            Self::Window { minutes } => {
                Some(format!("Recommended exposure: {minutes} min"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uv::UvObservation;

    fn reading(uv: f64) -> UvReading {
        UvReading::Index(UvObservation::new(uv))
    }

    #[test]
    fn test_moderate_band() {
        for uv in [3.0, 3.5, 4.0, 4.99, 5.0] {
            assert_eq!(exposure_minutes(uv, SkinType::Light), Some(15), "{uv}");
            assert_eq!(exposure_minutes(uv, SkinType::Dark), Some(30), "{uv}");
        }
    }

    #[test]
    fn test_high_band() {
        for uv in [5.01, 6.0, 7.5, 8.0] {
            assert_eq!(exposure_minutes(uv, SkinType::Light), Some(9), "{uv}");
            assert_eq!(exposure_minutes(uv, SkinType::Dark), Some(17), "{uv}");
        }
    }

    #[test]
    fn test_out_of_range() {
        for uv in [-1.0, 0.0, 2.99, 8.01, 9.0, 11.0, f64::NAN, f64::INFINITY] {
            for &skin in SkinType::ALL {
                assert_eq!(exposure_minutes(uv, skin), None, "{uv} {skin}");
            }
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(exposure_minutes(5.0, SkinType::Light), Some(15));
        assert_eq!(exposure_minutes(5.01, SkinType::Light), Some(9));
        assert_eq!(exposure_minutes(3.0, SkinType::Dark), Some(30));
        assert_eq!(exposure_minutes(8.0, SkinType::Dark), Some(17));
    }

    #[test]
    fn test_exposure_for_failed_reading() {
        for &skin in SkinType::ALL {
            assert_eq!(exposure_for(Some(&UvReading::Failed), skin), None);
            assert_eq!(exposure_for(None, skin), None);
        }
        assert_eq!(exposure_for(Some(&reading(4.0)), SkinType::Dark), Some(30));
    }

    #[test]
    fn test_advice() {
        assert_eq!(Advice::new(None, SkinType::Dark), Advice::Pending);
        assert_eq!(
            Advice::new(Some(&UvReading::Failed), SkinType::Dark),
            Advice::Unavailable
        );
        assert_eq!(
            Advice::new(Some(&reading(1.2)), SkinType::Dark),
            Advice::TooLow
        );
        assert_eq!(
            Advice::new(Some(&reading(9.0)), SkinType::Light),
            Advice::TooHigh
        );
        assert_eq!(
            Advice::new(Some(&reading(6.0)), SkinType::Light),
            Advice::Window { minutes: 9 }
        );
        assert!(Advice::Pending.message().is_none());
        assert_eq!(
            Advice::TooLow.message().unwrap(),
            "UV index is too low. Please try again when UV index is higher."
        );
    }

    #[test]
    fn test_parse_skin_type() {
        assert_eq!("dark".parse::<SkinType>().unwrap(), SkinType::Dark);
        assert_eq!(" LIGHT ".parse::<SkinType>().unwrap(), SkinType::Light);
        assert_eq!(
            "olive".parse::<SkinType>().unwrap_err().to_string(),
            "Invalid skin type `olive`, expected `dark` or `light`"
        );
        assert_eq!(SkinType::Light.to_string(), "light");
    }
}
