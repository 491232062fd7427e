use crate::configuration::{Configuration, PublishTarget};
use crate::domoticz::DomoticzPublisher;
use crate::host::HostReader;
use crate::mqtt::MqttPublisher;
use crate::report::Report;
use crate::ups::RegisterBus;
use log::{info, warn};
use std::error::Error;

/// Reads the UPS and the host once and sends the report to the configured target
pub struct Monitor {
    config: Configuration,
    host: HostReader,
}

impl Monitor {
    /// Constructs a monitor from the specified configuration
    ///
    /// ```
    /// use x728_ups_monitor::{Configuration, Monitor};
    ///
    /// let config = Configuration::load("conf/x728-ups-monitor.conf").expect("Cannot load configuration");
    /// let monitor = Monitor::new(config);
    ///
    /// // later, run monitor.run() in an async function
    /// ```
    pub fn new(config: Configuration) -> Monitor {
        Monitor {
            host: HostReader::new(&config.sensors),
            config,
        }
    }

    /// Reads every value
    pub fn collect(&self, bus: &mut impl RegisterBus) -> Result<Report, Box<dyn Error>> {
        Report::collect(bus, &self.config.ups, &self.host)
    }

    /// Sends the report to the configured target
    pub async fn publish(&self, report: &Report) -> Result<(), Box<dyn Error>> {
        match &self.config.publish {
            PublishTarget::Domoticz(domoticz) => {
                let deliveries = DomoticzPublisher::new(domoticz.clone())?
                    .publish(report)
                    .await;
                let accepted = deliveries.iter().filter(|d| d.is_success()).count();
                if accepted < deliveries.len() {
                    warn!("{accepted}/{} values accepted by Domoticz", deliveries.len());
                } else {
                    info!("{accepted} values sent to Domoticz");
                }
                Ok(())
            }
            PublishTarget::Mqtt(mqtt) => MqttPublisher::new(mqtt.clone()).publish(report).await,
        }
    }

    /// Reads the values from `bus` and publishes them
    pub async fn run_with(&self, bus: &mut impl RegisterBus) -> Result<Report, Box<dyn Error>> {
        let report = self.collect(bus)?;
        self.publish(&report).await?;
        Ok(report)
    }

    /// Opens the I2C bus, reads the values and publishes them
    #[cfg(feature = "i2c")]
    pub async fn run(&self) -> Result<Report, Box<dyn Error>> {
        let report = {
            let mut bus = crate::ups::I2cBus::open(&self.config.ups)?;
            self.collect(&mut bus)?
        };
        self.publish(&report).await?;
        Ok(report)
    }

    #[cfg(not(feature = "i2c"))]
    pub async fn run(&self) -> Result<Report, Box<dyn Error>> {
        Err("built without the i2c feature, cannot reach the UPS".into())
    }
}
