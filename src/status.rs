use crate::report::Report;
use serde::Serialize;
use std::fmt;

/// Message sent to the MQTT broker which later forwards it to Home Assistant
///
/// This contains the payload that Home Assistant uses to read the values. Every key is always
/// present, values that could not be read are sent as 0.
#[derive(Serialize, Debug, Default, PartialEq)]
pub struct StatusMessage {
    /// Battery voltage in V, rounded to 2 decimals
    pub voltage: f64,

    /// Battery capacity in %, rounded to an integer
    pub capacity: f64,

    /// CPU temperature in °C
    pub cpu_temp: f64,

    /// CPU usage in %, rounded to 1 decimal
    pub cpu_usage: f64,

    /// Core voltage in V, rounded to 2 decimals
    pub system_voltage: f64,
}

fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl From<&Report> for StatusMessage {
    fn from(report: &Report) -> Self {
        StatusMessage {
            voltage: round(report.battery.voltage, 2),
            capacity: report.battery.capacity.round(),
            cpu_temp: report.host.cpu_temp.unwrap_or_default(),
            cpu_usage: round(report.host.cpu_usage.unwrap_or_default(), 1),
            system_voltage: round(report.host.core_voltage.unwrap_or_default(), 2),
        }
    }
}

impl fmt::Display for StatusMessage {
    /// Formats the message to a JSON string
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Ok(str) = serde_json::to_string(&self) else {
            return Err(fmt::Error);
        };
        write!(f, "{str}")
    }
}
