//! # x728-ups-monitor
//!
//! `x728-ups-monitor` reads a Geekworm X728 UPS and the host it powers, and sends the values to
//! Domoticz or to the MQTT integration of Home Assistant. Each run sends one report, scheduling is
//! left to cron.
//!

pub use self::configuration::Configuration;
pub use self::configuration::Domoticz;
pub use self::configuration::Mqtt;
pub use self::configuration::PublishTarget;
pub use self::configuration::Sensors;
pub use self::configuration::Ups;
pub use self::domoticz::DomoticzPublisher;
pub use self::home_assistant::DeviceDescriptor;
pub use self::home_assistant::DiscoveryConfig;
pub use self::home_assistant::Sensor;
pub use self::host::HostMetrics;
pub use self::monitor::Monitor;
pub use self::mqtt::MqttPublisher;
pub use self::report::Report;
pub use self::status::StatusMessage;
pub use self::ups::{BatteryReading, RawRegisterPair, RegisterBus};

/// Contains the configuration stuff
pub mod configuration;
/// Contains the Domoticz HTTP publisher
pub mod domoticz;
/// Contains Home Assistant discovery data
pub mod home_assistant;
/// Reads the host sensors
pub mod host;
/// Contains the code of a run
pub mod monitor;
/// Contains the MQTT publisher
pub mod mqtt;
/// Contains the values read during a run
pub mod report;
/// Contains the status that is sent to MQTT
pub mod status;
/// Reads and decodes the UPS registers
pub mod ups;
