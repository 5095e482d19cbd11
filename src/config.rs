//! Library configuration

use crate::error::{Error, Result};

/// Environment variable read by [`Config::from_env`]
pub const AUTOCOMPUTE_ENV: &str = "GRAPHALG_AUTOCOMPUTE";

/// Settings applied when a [`Context`](crate::Context) is created
///
/// # Example
///
/// ```
/// use graphalg::Config;
///
/// let config = Config::new().autocompute(true);
/// assert!(config.autocompute);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Whether deferred expressions compute themselves on access
    #[cfg_attr(feature = "serde", serde(default))]
    pub autocompute: bool,
}

impl Config {
    /// Defaults: autocompute off
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the autocompute policy
    pub fn autocompute(mut self, on: bool) -> Self {
        self.autocompute = on;
        self
    }

    /// Defaults overridden by `GRAPHALG_AUTOCOMPUTE`, when set
    pub fn from_env() -> Result<Self> {
        Self::from_var(std::env::var(AUTOCOMPUTE_ENV).ok().as_deref())
    }

    fn from_var(value: Option<&str>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = value {
            config.autocompute = parse_flag(v)?;
        }
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::invalid_value(format!(
            "{AUTOCOMPUTE_ENV} must be one of 1/true/yes/on or 0/false/no/off, got {other:?}"
        ))),
    }
}
