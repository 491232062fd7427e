use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use std::error::Error;

/// Contains the configuration for reaching the UPS fuel gauge
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Ups {
    /// I2C bus number, as in `/dev/i2c-N`. Default: 1
    pub bus: u8,

    /// Address of the fuel gauge on the bus. Default: 0x36
    pub address: u16,

    /// Register holding the cell voltage. Default: 0x02
    #[serde(rename = "voltage-register")]
    pub voltage_register: u8,

    /// Register holding the state of charge. Default: 0x04
    #[serde(rename = "capacity-register")]
    pub capacity_register: u8,
}

impl Default for Ups {
    fn default() -> Self {
        Ups {
            bus: 1,
            address: 0x36,
            voltage_register: 0x02,
            capacity_register: 0x04,
        }
    }
}

/// Contains the configuration for the host sensors
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Sensors {
    /// File containing the CPU temperature in millidegrees
    #[serde(rename = "temperature-file")]
    pub temperature_file: String,

    /// Reads the core voltage with `vcgencmd`. Default: true
    #[serde(rename = "core-voltage")]
    pub core_voltage: bool,
}

impl Default for Sensors {
    fn default() -> Self {
        Sensors {
            temperature_file: String::from("/sys/class/thermal/thermal_zone0/temp"),
            core_voltage: true,
        }
    }
}

/// Contains the configuration for a Domoticz server
#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Domoticz {
    /// Base URL of the server, for example `http://192.168.1.10:8080`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Idx of the dummy voltage sensor
    #[serde(rename = "voltage-idx")]
    pub voltage_idx: u32,

    /// Idx of the dummy percentage sensor
    #[serde(rename = "capacity-idx")]
    pub capacity_idx: u32,

    /// Idx of the CPU temperature sensor. Not sent if unset.
    #[serde(rename = "temperature-idx")]
    pub temperature_idx: Option<u32>,

    /// Idx of the CPU usage sensor. Not sent if unset.
    #[serde(rename = "cpu-usage-idx")]
    pub cpu_usage_idx: Option<u32>,

    /// Idx of the core voltage sensor. Not sent if unset.
    #[serde(rename = "system-voltage-idx")]
    pub system_voltage_idx: Option<u32>,

    /// User for HTTP basic authentication
    pub user: Option<String>,

    /// Password for HTTP basic authentication
    pub password: Option<String>,

    /// Timeout of each request in seconds. Default: 10 seconds
    #[serde_inline_default(10)]
    pub timeout: u64,
}

/// Contains the configuration for communicating with the MQTT broker
#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Mqtt {
    /// Hostname or IP address. Default: localhost
    #[serde_inline_default(String::from("localhost"))]
    pub host: String,

    /// Port of the connection to the broker. Default: 1883
    #[serde_inline_default(1883)]
    pub port: u16,

    /// Username for the connection to the broker. Default: empty
    #[serde(default)]
    pub user: String,

    /// Password for the connection to the broker. Default: empty
    #[serde(default)]
    pub password: String,

    /// MQTT client id. It must be unique on the broker. Default: x728-ups-monitor-{host slug}
    #[serde(rename = "client-id")]
    pub client_id: Option<String>,

    /// Prefix of the state topic. Default: geekworm
    #[serde_inline_default(String::from("geekworm"))]
    pub prefix: String,

    /// Prefix for the registration topic sent to Home Assistant. Default: homeassistant
    ///
    /// This must match the configuration of the MQTT integration in Home Assistant
    ///
    /// See <https://www.home-assistant.io/integrations/mqtt#discovery-options>
    #[serde_inline_default(String::from("homeassistant"))]
    #[serde(rename = "registration-prefix")]
    pub registration_prefix: String,

    /// Name of the machine, used in topics and unique ids. Default: machine hostname
    #[serde(default = "hostname")]
    pub hostname: String,

    /// Slug of the UPS device. Default: x728_ups
    #[serde_inline_default(String::from("x728_ups"))]
    #[serde(rename = "device-slug")]
    pub device_slug: String,

    /// Default: Geekworm
    #[serde_inline_default(String::from("Geekworm"))]
    pub manufacturer: String,

    /// Default: X728
    #[serde_inline_default(String::from("X728"))]
    pub model: String,

    /// Time allowed to connect and get every publication acknowledged, in seconds. Default: 10
    #[serde_inline_default(10)]
    pub timeout: u64,
}

/// Where the report is sent
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PublishTarget {
    /// One HTTP request per value to a Domoticz server
    Domoticz(Domoticz),

    /// Home Assistant discovery and state messages through an MQTT broker
    Mqtt(Mqtt),
}

/// Contains all the configuration for `x728-ups-monitor`
#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Configuration {
    /// Contains the configuration for reaching the UPS
    #[serde(default)]
    pub ups: Ups,

    /// Contains the configuration for the host sensors
    #[serde(default)]
    pub sensors: Sensors,

    /// Contains the configuration of the target
    pub publish: PublishTarget,

    /// Sets the verbosity of the logs.
    ///   * 1 => Error
    ///  * 2 => Warning
    ///  * 3 => Info
    ///  * 4 => Debug
    ///  * 5 => Trace
    #[serde_inline_default(2)]
    #[serde(rename = "log-verbosity")]
    pub log_verbosity: usize,

    /// Prints every value and request. Raises the verbosity to at least Debug.
    #[serde(default)]
    pub debug: bool,
}

fn hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| String::from("localhost"))
}

impl Configuration {
    /// Load the configuration from a file
    ///
    /// ## Example
    ///
    /// ```
    /// use x728_ups_monitor::Configuration;
    ///
    /// let config = Configuration::load("conf/x728-ups-monitor.conf").expect("Cannot load configuration");
    ///
    /// assert_eq!(config.ups.address, 0x36);
    /// ```
    pub fn load(path: &str) -> Result<Configuration, Box<dyn Error>> {
        Self::parse(std::fs::read_to_string(path)?.as_str())
    }

    /// Parses the configuration from a TOML string
    pub fn parse(content: &str) -> Result<Configuration, Box<dyn Error>> {
        toml::from_str(content).map_err(|err| err.into())
    }

    /// Verbosity given to the logger
    pub fn verbosity(&self) -> usize {
        if self.debug {
            self.log_verbosity.max(4)
        } else {
            self.log_verbosity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that we can properly load the default configuration
    #[test]
    fn test_default_config() -> Result<(), Box<dyn Error>> {
        let conf = Configuration::load("conf/x728-ups-monitor.conf")?;

        assert_eq!(conf.ups.bus, 1);
        assert_eq!(conf.ups.address, 0x36);
        assert_eq!(conf.ups.voltage_register, 2);
        assert_eq!(conf.ups.capacity_register, 4);
        assert_eq!(
            conf.sensors.temperature_file,
            "/sys/class/thermal/thermal_zone0/temp"
        );
        assert_eq!(conf.verbosity(), 2);

        let PublishTarget::Mqtt(mqtt) = conf.publish else {
            panic!("the default target should be MQTT");
        };
        assert_eq!(mqtt.host, String::from("localhost"));
        assert_eq!(mqtt.registration_prefix, String::from("homeassistant"));
        assert_eq!(mqtt.prefix, String::from("geekworm"));
        assert_eq!(mqtt.device_slug, String::from("x728_ups"));

        // By default, the hostname is the one of the machine
        assert_eq!(mqtt.hostname, hostname());

        Ok(())
    }

    #[test]
    fn test_domoticz_config() -> Result<(), Box<dyn Error>> {
        let conf = Configuration::parse(
            r#"
            debug = true

            [ups]
            [sensors]
            core-voltage = false

            [publish]
            kind = "domoticz"
            base-url = "http://192.168.1.10:8080"
            voltage-idx = 2077
            capacity-idx = 2078
            temperature-idx = 2079
            user = "admin"
            password = "secret"
            "#,
        )?;

        assert_eq!(conf.verbosity(), 4);
        assert!(!conf.sensors.core_voltage);

        let PublishTarget::Domoticz(domoticz) = conf.publish else {
            panic!("the target should be Domoticz");
        };
        assert_eq!(domoticz.voltage_idx, 2077);
        assert_eq!(domoticz.capacity_idx, 2078);
        assert_eq!(domoticz.temperature_idx, Some(2079));
        assert_eq!(domoticz.cpu_usage_idx, None);
        assert_eq!(domoticz.user.as_deref(), Some("admin"));
        assert_eq!(domoticz.timeout, 10);

        Ok(())
    }

    #[test]
    fn test_missing_idx() {
        let result = Configuration::parse(
            r#"
            [publish]
            kind = "domoticz"
            base-url = "http://localhost:8080"
            voltage-idx = 1
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_sections_default() {
        let config = Configuration::parse(
            r#"
            [publish]
            kind = "mqtt"
            "#,
        )
        .expect("Failed to parse a config without [ups] and [sensors]");

        assert_eq!(config.ups.bus, 1);
        assert_eq!(config.ups.address, 0x36);
        assert_eq!(config.ups.voltage_register, 0x02);
        assert_eq!(config.ups.capacity_register, 0x04);
        assert_eq!(
            config.sensors.temperature_file,
            "/sys/class/thermal/thermal_zone0/temp"
        );
        assert!(config.sensors.core_voltage);

        let PublishTarget::Mqtt(mqtt) = config.publish else {
            panic!("the target should be MQTT");
        };
        assert_eq!(mqtt.client_id, None);
    }
}
