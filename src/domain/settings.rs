use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::domain::models::{LocationEstimate, PeerAddress, DEFAULT_ACCURACY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "ble_senml_gateway".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Bounds for the delivery protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySettings {
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_redirects() -> u32 {
    8
}
fn default_max_retries() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    500
}

/// Fallback policy for the location estimate obtained by the embedding
/// application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSettings {
    /// When true, constructing a gateway without a location estimate is an
    /// error. When false, the default estimate (0/0 at the default
    /// accuracy) is used silently.
    #[serde(default = "default_false")]
    pub require_estimate: bool,
    #[serde(default = "default_accuracy")]
    pub default_accuracy: u32,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            require_estimate: default_false(),
            default_accuracy: default_accuracy(),
        }
    }
}

fn default_accuracy() -> u32 {
    DEFAULT_ACCURACY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Allow-listed peer hardware addresses, colon-separated lowercase hex.
    pub devices: Vec<String>,

    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,

    #[serde(default)]
    pub delivery: DeliverySettings,

    #[serde(default)]
    pub location: LocationSettings,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            ble_service_uuid: default_service_uuid(),
            delivery: DeliverySettings::default(),
            location: LocationSettings::default(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_service_uuid() -> String {
    "34defd2c-c8fe-b18e-9a70-591970cba32b".to_string()
}

impl Settings {
    /// Parses the configured device addresses into the allow-list.
    pub fn allow_list(&self) -> anyhow::Result<Vec<PeerAddress>> {
        self.devices
            .iter()
            .map(|s| {
                s.parse::<PeerAddress>()
                    .map_err(|e| anyhow::anyhow!("bad device address in settings: {}", e))
            })
            .collect()
    }

    /// Resolves the location estimate per the configured fallback policy.
    pub fn resolve_location(
        &self,
        estimate: Option<LocationEstimate>,
    ) -> anyhow::Result<LocationEstimate> {
        match estimate {
            Some(loc) => Ok(loc),
            None if self.location.require_estimate => {
                Err(anyhow::anyhow!("no location estimate available"))
            }
            None => Ok(LocationEstimate {
                latitude: 0.0,
                longitude: 0.0,
                accuracy: self.location.default_accuracy,
            }),
        }
    }
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("BleSenmlGateway");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn add_device(&mut self, address: &PeerAddress) -> anyhow::Result<()> {
        let formatted = address.to_string();
        if !self.settings.devices.contains(&formatted) {
            self.settings.devices.push(formatted);
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.delivery.max_redirects, 8);
        assert_eq!(settings.delivery.max_retries, 5);
        assert_eq!(settings.location.default_accuracy, DEFAULT_ACCURACY);
        assert_eq!(
            settings.ble_service_uuid,
            "34defd2c-c8fe-b18e-9a70-591970cba32b"
        );
    }

    #[test]
    fn test_allow_list_parses_addresses() {
        let settings = Settings {
            devices: vec!["68:72:c3:eb:8e:a9".into(), "d6:ea:13:f5:11:3b".into()],
            ..Default::default()
        };
        let list = settings.allow_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].to_string(), "68:72:c3:eb:8e:a9");
    }

    #[test]
    fn test_allow_list_rejects_bad_address() {
        let settings = Settings {
            devices: vec!["not-a-mac".into()],
            ..Default::default()
        };
        assert!(settings.allow_list().is_err());
    }

    #[test]
    fn test_resolve_location_fallback_policy() {
        let mut settings = Settings::default();
        let fallback = settings.resolve_location(None).unwrap();
        assert_eq!(fallback.accuracy, DEFAULT_ACCURACY);

        settings.location.require_estimate = true;
        assert!(settings.resolve_location(None).is_err());

        let given = LocationEstimate {
            latitude: 48.2,
            longitude: 16.37,
            accuracy: 40,
        };
        let resolved = settings.resolve_location(Some(given)).unwrap();
        assert_eq!(resolved.accuracy, 40);
    }

    #[test]
    fn test_settings_deserialize_partial_json() {
        let settings: Settings =
            serde_json::from_str(r#"{"devices":["aa:bb:cc:dd:ee:ff"]}"#).unwrap();
        assert_eq!(settings.devices.len(), 1);
        assert_eq!(settings.delivery.retry_delay_ms, 500);
    }
}
