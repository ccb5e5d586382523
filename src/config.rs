use crate::prelude::*;

use serde::Deserialize;
use serde_with::serde_as;
use serde_yaml;
use std::sync::{Arc, Mutex};

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_serial")]
    pub serial: Serial,

    #[serde(default = "Config::default_metrics")]
    pub metrics: Metrics,

    /// Seconds between poll cycles
    #[serde(default = "Config::default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    /// Optional path to output each sample in JSON format
    pub datalog_file: Option<String>,
}

// Serial {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Serial {
    #[serde(default = "Config::default_serial_device")]
    pub device: String,

    #[serde(default = "Config::default_serial_baud")]
    pub baud: u32,

    #[serde(default = "Config::default_serial_read_timeout_ms")]
    pub read_timeout_ms: u64,
}
impl Serial {
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn read_timeout_ms(&self) -> u64 {
        self.read_timeout_ms
    }
} // }}}

// Metrics {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Metrics {
    #[serde(default = "Config::default_metrics_file")]
    pub file: String,

    #[serde(default = "Config::default_metrics_publish_ac")]
    pub publish_ac: bool,
}
impl Metrics {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn publish_ac(&self) -> bool {
        self.publish_ac
    }
} // }}}

pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        let config = Config::new(file)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub fn serial(&self) -> Serial {
        self.config.lock().unwrap().serial.clone()
    }

    pub fn metrics_file(&self) -> String {
        self.config.lock().unwrap().metrics.file.clone()
    }

    pub fn publish_ac(&self) -> bool {
        self.config.lock().unwrap().metrics.publish_ac
    }

    pub fn poll_interval(&self) -> u64 {
        self.config.lock().unwrap().poll_interval
    }

    pub fn loglevel(&self) -> String {
        self.config.lock().unwrap().loglevel.clone()
    }

    pub fn datalog_file(&self) -> Option<String> {
        self.config.lock().unwrap().datalog_file.clone()
    }

    pub fn summary(&self) {
        self.config.lock().unwrap().summary();
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        let config: Self = serde_yaml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    pub fn summary(&self) {
        info!("Configuration:");
        info!("  Serial:");
        info!("    Device: {}", self.serial.device);
        info!("    Baud: {}", self.serial.baud);
        info!("    Read Timeout: {}ms", self.serial.read_timeout_ms);
        info!("  Metrics:");
        info!("    File: {}", self.metrics.file);
        info!("    Publish AC: {}", self.metrics.publish_ac);
        info!("  Poll Interval: {}s", self.poll_interval);
        info!("  Log Level: {}", self.loglevel);
        if let Some(datalog_file) = &self.datalog_file {
            info!("  Datalog File: {}", datalog_file);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.serial.device.is_empty() {
            bail!("serial.device cannot be empty");
        }
        if self.serial.baud == 0 {
            bail!("serial.baud must be greater than 0");
        }
        if self.serial.read_timeout_ms == 0 {
            bail!("serial.read_timeout_ms must be greater than 0");
        }
        if self.metrics.file.is_empty() {
            bail!("metrics.file cannot be empty");
        }
        if self.poll_interval == 0 {
            bail!("poll_interval must be greater than 0");
        }

        Ok(())
    }

    fn default_serial() -> Serial {
        Serial {
            device: Self::default_serial_device(),
            baud: Self::default_serial_baud(),
            read_timeout_ms: Self::default_serial_read_timeout_ms(),
        }
    }
    fn default_serial_device() -> String {
        "/dev/ttyUSB0".to_string()
    }
    fn default_serial_baud() -> u32 {
        2400
    }
    fn default_serial_read_timeout_ms() -> u64 {
        1000
    }

    fn default_metrics() -> Metrics {
        Metrics {
            file: Self::default_metrics_file(),
            publish_ac: Self::default_metrics_publish_ac(),
        }
    }
    fn default_metrics_file() -> String {
        "/ramdisk/VICTRON_MULTIPLUS.prom".to_string()
    }
    fn default_metrics_publish_ac() -> bool {
        false
    }

    fn default_poll_interval() -> u64 {
        10
    }
    fn default_loglevel() -> String {
        "info".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> Result<()> {
        let config: Config = serde_yaml::from_str("{}")?;

        assert_eq!(config.serial.device(), "/dev/ttyUSB0");
        assert_eq!(config.serial.baud(), 2400);
        assert_eq!(config.serial.read_timeout_ms(), 1000);
        assert_eq!(config.metrics.file(), "/ramdisk/VICTRON_MULTIPLUS.prom");
        assert!(!config.metrics.publish_ac());
        assert_eq!(config.poll_interval, 10);
        assert_eq!(config.loglevel, "info");
        assert_eq!(config.datalog_file, None);

        config.validate()
    }

    #[test]
    fn full_parse() -> Result<()> {
        let config: Config = serde_yaml::from_str(
            r#"
serial:
  device: /dev/ttyUSB1
  baud: 9600
  read_timeout_ms: 2000
metrics:
  file: /tmp/multiplus.prom
  publish_ac: true
poll_interval: 30
loglevel: debug
datalog_file: /tmp/multiplus.json
"#,
        )?;

        assert_eq!(config.serial.device(), "/dev/ttyUSB1");
        assert_eq!(config.serial.baud(), 9600);
        assert_eq!(config.serial.read_timeout_ms(), 2000);
        assert_eq!(config.metrics.file(), "/tmp/multiplus.prom");
        assert!(config.metrics.publish_ac());
        assert_eq!(config.poll_interval, 30);
        assert_eq!(config.loglevel, "debug");
        assert_eq!(config.datalog_file, Some("/tmp/multiplus.json".to_string()));

        config.validate()
    }

    #[test]
    fn rejects_zero_baud() {
        let config: Config = serde_yaml::from_str("serial:\n  baud: 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config: Config = serde_yaml::from_str("poll_interval: 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
