//! Runtime configuration
//!
//! Defaults match the deployed device. Secrets and per-install values are
//! baked in at build time through environment variables, e.g.
//!
//! ```text
//! WIFI_SSID=home WIFI_PASS=secret DOG_FEED_API=http://192.168.1.85:1880/dog-feed-status \
//! MQTT_BROKER=192.168.1.85 UTC_OFFSET_HOURS=-5 cargo build --release
//! ```

use std::time::Duration;

use crate::error::ConfigError;

/// Hours of the day during which the device stays awake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindows {
    pub morning_start: u8,
    pub morning_end: u8,
    pub evening_start: u8,
    pub evening_end: u8,
}

impl ActiveWindows {
    pub fn new(
        morning_start: u8,
        morning_end: u8,
        evening_start: u8,
        evening_end: u8,
    ) -> Result<Self, ConfigError> {
        let windows = Self {
            morning_start,
            morning_end,
            evening_start,
            evening_end,
        };
        windows.validate()?;
        Ok(windows)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.morning_start < self.morning_end
            && self.morning_end <= self.evening_start
            && self.evening_start < self.evening_end
            && self.evening_end <= 24;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::Windows {
                morning_start: self.morning_start,
                morning_end: self.morning_end,
                evening_start: self.evening_start,
                evening_end: self.evening_end,
            })
        }
    }
}

impl Default for ActiveWindows {
    fn default() -> Self {
        Self {
            morning_start: 7,
            morning_end: 11,
            evening_start: 16,
            evening_end: 21,
        }
    }
}

/// Broker connection and feeding topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub broker: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub morning_topic: String,
    pub evening_topic: String,
    pub keep_alive: Duration,
}

impl MqttSettings {
    pub fn url(&self) -> String {
        format!("mqtt://{}:{}", self.broker, self.port)
    }
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker: "192.168.1.85".into(),
            port: 1883,
            username: None,
            password: None,
            client_id: "bowlwatch-magtag".into(),
            morning_topic: "dog/fed/morning".into(),
            evening_topic: "dog/fed/evening".into(),
            keep_alive: Duration::from_secs(60),
        }
    }
}

/// NeoPixel layout, MagTag has four pixels along the top edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSettings {
    pub count: usize,
    pub brightness: f32,
    /// Top right
    pub morning_index: usize,
    /// Top left
    pub evening_index: usize,
}

impl Default for PixelSettings {
    fn default() -> Self {
        Self {
            count: 4,
            brightness: 0.05,
            morning_index: 3,
            evening_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub status_url: String,
    pub mqtt: MqttSettings,
    pub windows: ActiveWindows,
    pub pixels: PixelSettings,
    /// Hours added to UTC to get local wall clock time
    pub utc_offset_hours: i32,

    pub time_sync_interval: Duration,
    pub status_fetch_interval: Duration,
    pub min_refresh_interval: Duration,
    /// Delay of the extra refresh after waking from deep sleep
    pub wake_refresh_delay: Duration,
    /// Shorter sleeps than this are skipped to avoid thrashing at window edges
    pub min_sleep: Duration,

    pub max_retries: u32,
    pub retry_delay: Duration,
    pub connection_failure_threshold: u32,
    pub http_timeout: Duration,
    /// MQTT loop timeout, must be at least the socket timeout
    pub mqtt_loop_timeout: Duration,

    pub loop_delay: Duration,
    pub fault_delay: Duration,
    pub button_debounce: Duration,
    /// Pause between publishing a button change and re-reading the API
    pub publish_settle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            status_url: "http://192.168.1.85:1880/dog-feed-status".into(),
            mqtt: MqttSettings::default(),
            windows: ActiveWindows::default(),
            pixels: PixelSettings::default(),
            utc_offset_hours: 0,

            time_sync_interval: Duration::from_secs(3600),
            status_fetch_interval: Duration::from_secs(300),
            min_refresh_interval: Duration::from_secs(10),
            wake_refresh_delay: Duration::from_secs(15),
            min_sleep: Duration::from_secs(60),

            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            connection_failure_threshold: 5,
            http_timeout: Duration::from_secs(5),
            mqtt_loop_timeout: Duration::from_secs(1),

            loop_delay: Duration::from_secs(3),
            fault_delay: Duration::from_secs(5),
            button_debounce: Duration::from_millis(200),
            publish_settle: Duration::from_millis(500),
        }
    }
}

impl Config {
    /// Build the configuration from values baked in at compile time
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ssid) = option_env!("WIFI_SSID") {
            config.wifi_ssid = ssid.into();
        }
        if let Some(pass) = option_env!("WIFI_PASS") {
            config.wifi_password = pass.into();
        }
        if let Some(url) = option_env!("DOG_FEED_API") {
            config.status_url = url.into();
        }
        if let Some(broker) = option_env!("MQTT_BROKER") {
            config.mqtt.broker = broker.into();
        }
        if let Some(port) = option_env!("MQTT_PORT") {
            config.mqtt.port = parse_value("MQTT_PORT", port)?;
        }
        config.mqtt.username = option_env!("MQTT_USERNAME")
            .filter(|v| !v.is_empty())
            .map(String::from);
        config.mqtt.password = option_env!("MQTT_PASSWORD")
            .filter(|v| !v.is_empty())
            .map(String::from);
        if let Some(offset) = option_env!("UTC_OFFSET_HOURS") {
            config.utc_offset_hours = parse_value("UTC_OFFSET_HOURS", offset)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.windows.validate()?;
        if self.min_refresh_interval < Duration::from_secs(5) {
            return Err(ConfigError::RefreshInterval(
                self.min_refresh_interval.as_secs(),
            ));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::UtcOffset(self.utc_offset_hours));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.windows.evening_end, 21);
        assert_eq!(config.mqtt.url(), "mqtt://192.168.1.85:1883");
    }

    #[test]
    fn overlapping_windows_are_rejected() {
        assert!(ActiveWindows::new(7, 17, 16, 21).is_err());
        assert!(ActiveWindows::new(7, 11, 16, 25).is_err());
        assert!(ActiveWindows::new(11, 11, 16, 21).is_err());
        assert!(ActiveWindows::new(0, 11, 11, 24).is_ok());
    }

    #[test]
    fn refresh_interval_has_a_floor() {
        let config = Config {
            min_refresh_interval: Duration::from_secs(3),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::RefreshInterval(3)));
    }

    #[test]
    fn parse_value_reports_the_variable() {
        let err = parse_value::<u16>("MQTT_PORT", "18a3").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "MQTT_PORT",
                value: "18a3".into()
            }
        );
        assert_eq!(parse_value::<i32>("UTC_OFFSET_HOURS", " -5 "), Ok(-5));
    }
}
