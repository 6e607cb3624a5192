use anyhow::{Result, anyhow};

use crate::config::AppConfig;

/// Where on earth the user is. Feeds prayer-time computation; any failure
/// falls back to wall-clock defaults upstream.
pub trait LocationProvider {
    fn current_position(&self) -> Result<(f64, f64)>;
}

/// Coordinates pinned in the config file — the CLI stand-in for a device
/// geolocation fix.
pub struct ConfigLocation {
    latitude: f64,
    longitude: f64,
}

impl ConfigLocation {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            latitude: config.location.latitude,
            longitude: config.location.longitude,
        }
    }
}

impl LocationProvider for ConfigLocation {
    fn current_position(&self) -> Result<(f64, f64)> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(anyhow!(
                "Configured coordinates out of range: {}, {}",
                self.latitude,
                self.longitude
            ));
        }
        Ok((self.latitude, self.longitude))
    }
}
