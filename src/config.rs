//! TOML configuration: device kinematics, tooling profiles, serial port,
//! and HTTP bind address.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::{AccelerationProfile, Device, Hardware, ToolingProfile};
use crate::vec2::Vec2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid server bind address {0:?}: {1}")]
    BindAddr(String, std::net::AddrParseError),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub steps_per_mm: u32,
    pub servo_min: i32,
    pub servo_max: i32,
    pub hardware: Hardware,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub acceleration: f64,
    pub max_velocity: f64,
    pub cornering_factor: f64,
}

impl From<&ProfileConfig> for AccelerationProfile {
    fn from(p: &ProfileConfig) -> Self {
        AccelerationProfile {
            acceleration: p.acceleration,
            max_velocity: p.max_velocity,
            cornering_factor: p.cornering_factor,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfilesConfig {
    pub pen_up: ProfileConfig,
    pub pen_down: ProfileConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServoConfig {
    /// Pen-up height as a percentage of the servo's travel (`0` = fully
    /// raised, `100` = fully lowered); see `Device::pen_pct_to_pos`.
    pub pen_up_pct: f64,
    pub pen_down_pct: f64,
    pub lift_duration: f64,
    pub drop_duration: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Fixed serial port path. When absent, the EBB is auto-detected among
    /// the host's available serial ports at startup.
    #[serde(default)]
    pub port: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub device: DeviceConfig,
    pub profile: ProfilesConfig,
    pub servo: ServoConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default = "default_server")]
    pub server: ServerConfig,
}

fn default_server() -> ServerConfig {
    ServerConfig { bind_addr: default_bind_addr() }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn device(&self) -> Device {
        Device::new(self.device.steps_per_mm, self.device.servo_min, self.device.servo_max, self.device.hardware)
    }

    pub fn tooling_profile(&self) -> ToolingProfile {
        let device = self.device();
        ToolingProfile {
            pen_down_profile: AccelerationProfile::from(&self.profile.pen_down),
            pen_up_profile: AccelerationProfile::from(&self.profile.pen_up),
            pen_down_pos: device.pen_pct_to_pos(self.servo.pen_down_pct),
            pen_up_pos: device.pen_pct_to_pos(self.servo.pen_up_pct),
            pen_lift_duration: self.servo.lift_duration,
            pen_drop_duration: self.servo.drop_duration,
        }
    }

    /// Plan and carriage home position; fixed at the origin of device step
    /// space since repositioning it is equivalent to shifting every input
    /// polyline by a constant offset before planning.
    pub fn pen_home(&self) -> Vec2 {
        Vec2::ZERO
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e| ConfigError::BindAddr(self.server.bind_addr.clone(), e))
    }
}
