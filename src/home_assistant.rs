use crate::configuration::Mqtt;
use serde::Serialize;
use std::fmt;
use strum_macros::EnumIter;

/// Contains the different values that are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Sensor {
    /// Battery voltage in V
    Voltage,

    /// Battery capacity in %
    Capacity,

    /// CPU temperature in °C
    CpuTemperature,

    /// CPU usage in %
    CpuUsage,

    /// Core voltage of the board in V
    SystemVoltage,
}

impl Sensor {
    /// Name of the sensor value as sent in the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensor::Voltage => "voltage",
            Sensor::Capacity => "capacity",
            Sensor::CpuTemperature => "cpu_temp",
            Sensor::CpuUsage => "cpu_usage",
            Sensor::SystemVoltage => "system_voltage",
        }
    }

    /// Sensor type used in the discovery topic
    pub fn kind(&self) -> &'static str {
        match self {
            Sensor::CpuTemperature => "temperature",
            other => other.as_str(),
        }
    }

    /// Name shown in Home Assistant
    pub fn name(&self) -> &'static str {
        match self {
            Sensor::Voltage => "Battery Voltage",
            Sensor::Capacity => "Battery Capacity",
            Sensor::CpuTemperature => "CPU Temperature",
            Sensor::CpuUsage => "CPU Usage",
            Sensor::SystemVoltage => "System Voltage",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Sensor::Voltage | Sensor::SystemVoltage => "V",
            Sensor::Capacity | Sensor::CpuUsage => "%",
            Sensor::CpuTemperature => "°C",
        }
    }

    /// See <https://www.home-assistant.io/integrations/sensor#device-class> for possible values here
    pub fn device_class(&self) -> &'static str {
        match self {
            Sensor::Voltage | Sensor::SystemVoltage => "voltage",
            Sensor::Capacity => "battery",
            Sensor::CpuTemperature => "temperature",
            Sensor::CpuUsage => "power_factor",
        }
    }
}

/// Replaces everything but ASCII letters, digits, `_` and `-` by `_` in the lower-cased hostname
///
/// ```
/// assert_eq!(x728_ups_monitor::home_assistant::host_slug(" Kitchen Pi.local "), "kitchen_pi_local");
/// ```
pub fn host_slug(hostname: &str) -> String {
    hostname
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Identity of the UPS, shared by every discovery message
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Device {
    /// Identifier of the device, `{device_slug}_{host_slug}`
    identifiers: Vec<String>,

    /// Name of the device, for example `X728 UPS (raspberrypi)`
    name: String,

    manufacturer: String,

    model: String,
}

/// Describes the origin of the messages, in this case `x728-ups-monitor`
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Origin {
    /// Name of the origin, always `x728-ups-monitor`
    name: &'static str,

    /// Version of `x728-ups-monitor`
    sw_version: &'static str,

    /// URL of `x728-ups-monitor`
    url: &'static str,
}

/// Topics and identity of one UPS on one host
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    host_slug: String,
    device_slug: String,
    registration_prefix: String,
    state_topic: String,
    device: Device,
}

impl DeviceDescriptor {
    /// Creates the descriptor from the MQTT configuration
    ///
    /// ## Example
    ///
    /// ```
    /// use x728_ups_monitor::{Configuration, DeviceDescriptor, PublishTarget};
    ///
    /// let config = Configuration::load("conf/x728-ups-monitor.conf").expect("Cannot load configuration");
    /// let PublishTarget::Mqtt(mut mqtt) = config.publish else { unreachable!() };
    /// mqtt.hostname = "Pi Zero".to_string();
    ///
    /// let descriptor = DeviceDescriptor::new(&mqtt);
    /// assert_eq!(descriptor.state_topic(), "geekworm/sensor/pi_zero/x728_ups/state");
    /// ```
    pub fn new(mqtt: &Mqtt) -> DeviceDescriptor {
        let host_slug = host_slug(&mqtt.hostname);
        let device_slug = mqtt.device_slug.clone();

        DeviceDescriptor {
            state_topic: format!("{}/sensor/{host_slug}/{device_slug}/state", mqtt.prefix),
            registration_prefix: mqtt.registration_prefix.clone(),
            device: Device {
                identifiers: vec![format!("{device_slug}_{host_slug}")],
                name: format!("{} UPS ({})", mqtt.model, mqtt.hostname.trim()),
                manufacturer: mqtt.manufacturer.clone(),
                model: mqtt.model.clone(),
            },
            host_slug,
            device_slug,
        }
    }

    /// Topic receiving the state of every sensor
    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }

    /// Discovery topic of a sensor
    pub fn discovery_topic(&self, sensor: Sensor) -> String {
        format!(
            "{}/sensor/{}_{}_{}/config",
            self.registration_prefix,
            self.host_slug,
            self.device_slug,
            sensor.kind()
        )
    }

    /// Unique ID of a sensor, constructed from the host, the device and the sensor value name
    pub fn unique_id(&self, sensor: Sensor) -> String {
        format!("{}_{}_{}", self.host_slug, self.device_slug, sensor.as_str())
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Discovery document sent to Home Assistant for one sensor
#[derive(Serialize, Debug)]
pub struct DiscoveryConfig {
    /// Name of the sensor, shown in Home Assistant and converted into the entity ID
    name: &'static str,

    /// Topic where the combined state is sent
    state_topic: String,

    unit_of_measurement: &'static str,

    /// Tells Home Assistant where to find the value in the JSON payload
    value_template: String,

    device_class: &'static str,

    /// Describes how Home Assistant stores the data
    state_class: &'static str,

    unique_id: String,

    device: Device,

    origin: Origin,
}

impl DiscoveryConfig {
    /// Creates the discovery document of a sensor
    pub fn new(sensor: Sensor, descriptor: &DeviceDescriptor) -> DiscoveryConfig {
        DiscoveryConfig {
            name: sensor.name(),
            state_topic: descriptor.state_topic().to_string(),
            unit_of_measurement: sensor.unit(),
            value_template: format!("{{{{ value_json.{} }}}}", sensor.as_str()),
            device_class: sensor.device_class(),
            state_class: "measurement",
            unique_id: descriptor.unique_id(sensor),
            device: descriptor.device().clone(),
            origin: Origin {
                name: env!("CARGO_PKG_NAME"),
                sw_version: env!("CARGO_PKG_VERSION"),
                url: env!("CARGO_PKG_HOMEPAGE"),
            },
        }
    }
}

impl fmt::Display for DiscoveryConfig {
    /// Formats the document in JSON format
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Ok(config) = serde_json::to_string(&self) else {
            return Err(fmt::Error);
        };
        write!(f, "{config}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Configuration, PublishTarget};
    use serde_json::Value;
    use strum::IntoEnumIterator;

    fn mqtt(hostname: &str) -> Mqtt {
        let config = Configuration::load("conf/x728-ups-monitor.conf")
            .expect("Failed to load default config");
        let PublishTarget::Mqtt(mut mqtt) = config.publish else {
            panic!("the default target should be MQTT");
        };
        mqtt.hostname = hostname.to_string();
        mqtt
    }

    #[test]
    fn test_host_slug() {
        assert_eq!(host_slug("raspberrypi"), "raspberrypi");
        assert_eq!(host_slug("  Pi-Garage_2 \n"), "pi-garage_2");
        assert_eq!(host_slug("My Pi"), "my_pi");
        assert_eq!(host_slug("pi.lan"), "pi_lan");
        assert_eq!(host_slug("café"), "caf_");
    }

    #[test]
    fn test_topics() {
        let descriptor = DeviceDescriptor::new(&mqtt("Garage Pi"));

        assert_eq!(
            descriptor.state_topic(),
            "geekworm/sensor/garage_pi/x728_ups/state"
        );
        assert_eq!(
            descriptor.discovery_topic(Sensor::CpuTemperature),
            "homeassistant/sensor/garage_pi_x728_ups_temperature/config"
        );
        assert_eq!(
            descriptor.discovery_topic(Sensor::SystemVoltage),
            "homeassistant/sensor/garage_pi_x728_ups_system_voltage/config"
        );
        assert_eq!(
            descriptor.unique_id(Sensor::CpuTemperature),
            "garage_pi_x728_ups_cpu_temp"
        );
    }

    /// Test that all sensors produce a complete document
    #[test]
    fn test_discovery_documents() -> Result<(), Box<dyn std::error::Error>> {
        let descriptor = DeviceDescriptor::new(&mqtt("Garage Pi"));

        for sensor in Sensor::iter() {
            let name = sensor.as_str();
            let json: Value =
                serde_json::from_str(&DiscoveryConfig::new(sensor, &descriptor).to_string())?;

            assert_eq!(json["name"], sensor.name());
            assert_eq!(json["state_topic"], "geekworm/sensor/garage_pi/x728_ups/state");
            assert_eq!(json["unit_of_measurement"], sensor.unit());
            assert_eq!(json["value_template"], format!("{{{{ value_json.{name} }}}}"));
            assert_eq!(json["device_class"], sensor.device_class());
            assert_eq!(json["state_class"], "measurement");
            assert_eq!(json["unique_id"], format!("garage_pi_x728_ups_{name}"));
            assert_eq!(json["device"]["identifiers"][0], "x728_ups_garage_pi");
            assert_eq!(json["device"]["name"], "X728 UPS (Garage Pi)");
            assert_eq!(json["device"]["manufacturer"], "Geekworm");
            assert_eq!(json["device"]["model"], "X728");
            assert_eq!(json["origin"]["name"], "x728-ups-monitor");
        }

        Ok(())
    }

    #[test]
    fn test_units() {
        assert_eq!(Sensor::CpuTemperature.unit(), "°C");
        assert_eq!(Sensor::Capacity.device_class(), "battery");
        assert_eq!(Sensor::CpuUsage.kind(), "cpu_usage");
    }
}
