use crate::configuration::Domoticz;
use crate::home_assistant::Sensor;
use crate::report::Report;
use log::{debug, info, warn};
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use strum::IntoEnumIterator;

/// Update of one Domoticz device
#[derive(Debug, Clone, PartialEq)]
pub struct DomoticzRequest {
    pub sensor: Sensor,
    pub url: String,
}

/// Outcome of a request: the HTTP status, or `None` if no response was received
#[derive(Debug)]
pub struct Delivery {
    pub request: DomoticzRequest,
    pub status: Option<u16>,
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|status| (200..300).contains(&status))
    }
}

impl Domoticz {
    /// Idx of the Domoticz device receiving a sensor, if configured
    pub fn idx(&self, sensor: Sensor) -> Option<u32> {
        match sensor {
            Sensor::Voltage => Some(self.voltage_idx),
            Sensor::Capacity => Some(self.capacity_idx),
            Sensor::CpuTemperature => self.temperature_idx,
            Sensor::CpuUsage => self.cpu_usage_idx,
            Sensor::SystemVoltage => self.system_voltage_idx,
        }
    }

    /// URL updating the device `idx` with `value`
    ///
    /// ```
    /// use x728_ups_monitor::configuration::{Configuration, PublishTarget};
    ///
    /// let config = Configuration::parse(r#"
    ///     [publish]
    ///     kind = "domoticz"
    ///     base-url = "http://domoticz:8080/"
    ///     voltage-idx = 2077
    ///     capacity-idx = 2078
    /// "#).expect("Cannot parse configuration");
    /// let PublishTarget::Domoticz(domoticz) = config.publish else { unreachable!() };
    ///
    /// assert_eq!(
    ///     domoticz.url(2077, 4.16),
    ///     "http://domoticz:8080/json.htm?type=command&param=udevice&idx=2077&nvalue=0&svalue=4.16"
    /// );
    /// ```
    pub fn url(&self, idx: u32, value: f64) -> String {
        format!(
            "{}/json.htm?type=command&param=udevice&idx={idx}&nvalue=0&svalue={value}",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Requests to send for this report
    ///
    /// A sensor is skipped when it has no idx or when its value is implausible.
    pub fn requests(&self, report: &Report) -> Vec<DomoticzRequest> {
        Sensor::iter()
            .filter_map(|sensor| {
                let idx = self.idx(sensor)?;
                let value = report.value(sensor);
                if !should_publish(sensor, value) {
                    debug!("Skipping {}: {value:?}", sensor.name());
                    return None;
                }
                Some(DomoticzRequest {
                    sensor,
                    url: self.url(idx, value.unwrap_or_default()),
                })
            })
            .collect()
    }
}

/// Threshold policy. An uninitialized gauge reports garbage above these limits.
fn should_publish(sensor: Sensor, value: Option<f64>) -> bool {
    match sensor {
        Sensor::Voltage => value.is_some_and(|v| v < 10.0),
        Sensor::Capacity => value.is_some_and(|v| v < 100.0),
        Sensor::CpuTemperature => {
            let temp = value.unwrap_or_default();
            temp > 1.0 && temp < 100.0
        }
        Sensor::CpuUsage => value.is_some_and(|v| (0.0..=100.0).contains(&v)),
        Sensor::SystemVoltage => value.is_some(),
    }
}

/// Sends the report to Domoticz, one GET request per value
pub struct DomoticzPublisher {
    config: Domoticz,
    client: Client,
}

impl DomoticzPublisher {
    pub fn new(config: Domoticz) -> Result<DomoticzPublisher, Box<dyn Error>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        info!("Sending to Domoticz at {}", config.base_url);
        Ok(DomoticzPublisher { config, client })
    }

    /// Sends every qualifying value
    ///
    /// Failures are logged and do not prevent the following requests. Nothing is retried.
    pub async fn publish(&self, report: &Report) -> Vec<Delivery> {
        let mut deliveries = Vec::new();

        for request in self.config.requests(report) {
            debug!("{}: {}", request.sensor.name(), request.url);

            let mut builder = self.client.get(&request.url);
            if let Some(user) = &self.config.user {
                builder = builder.basic_auth(user, self.config.password.as_ref());
            }

            let status = match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!("Request Status {}", status.as_u16());
                    if !status.is_success() {
                        warn!("Domoticz answered {status} for {}", request.sensor.name());
                    }
                    Some(status.as_u16())
                }
                Err(e) => {
                    warn!("Cannot send {} to Domoticz: {e}", request.sensor.name());
                    None
                }
            };

            deliveries.push(Delivery { request, status });
        }

        deliveries
    }
}
