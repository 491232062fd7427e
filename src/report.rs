use crate::configuration::Ups;
use crate::home_assistant::Sensor;
use crate::host::{HostMetrics, HostReader};
use crate::ups::{BatteryReading, RawRegisterPair, RegisterBus};
use log::debug;
use std::error::Error;

/// Every value read during one run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Report {
    pub battery: BatteryReading,
    pub host: HostMetrics,
}

impl Report {
    /// Reads the UPS and the host
    ///
    /// A bus failure is returned as an error. Host reads never fail, missing values are `None`.
    pub fn collect(
        bus: &mut impl RegisterBus,
        ups: &Ups,
        host: &HostReader,
    ) -> Result<Report, Box<dyn Error>> {
        let battery = BatteryReading::decode(RawRegisterPair::read(bus, ups)?);
        debug!(
            "Voltage: {:5.2}V, Battery: {:5.0}%",
            battery.voltage, battery.capacity
        );

        Ok(Report {
            battery,
            host: host.read(),
        })
    }

    /// Value of a sensor, `None` if it could not be read
    pub fn value(&self, sensor: Sensor) -> Option<f64> {
        match sensor {
            Sensor::Voltage => Some(self.battery.voltage),
            Sensor::Capacity => Some(self.battery.capacity),
            Sensor::CpuTemperature => self.host.cpu_temp,
            Sensor::CpuUsage => self.host.cpu_usage,
            Sensor::SystemVoltage => self.host.core_voltage,
        }
    }
}
