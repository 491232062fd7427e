use crate::configuration::Sensors;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Values read from the host. `None` means that the read failed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostMetrics {
    /// CPU temperature in °C
    pub cpu_temp: Option<f64>,

    /// CPU usage in %
    pub cpu_usage: Option<f64>,

    /// Board core voltage in V
    pub core_voltage: Option<f64>,
}

/// Reads the host metrics. Every read is best-effort and independent of the others.
pub struct HostReader {
    temperature_file: PathBuf,
    core_voltage: bool,
}

impl HostReader {
    /// Creates a reader from the sensors configuration
    pub fn new(sensors: &Sensors) -> HostReader {
        HostReader {
            temperature_file: PathBuf::from(&sensors.temperature_file),
            core_voltage: sensors.core_voltage,
        }
    }

    /// Reads all the metrics
    pub fn read(&self) -> HostMetrics {
        let metrics = HostMetrics {
            cpu_temp: read_cpu_temp(&self.temperature_file),
            cpu_usage: read_cpu_usage(),
            core_voltage: if self.core_voltage {
                read_core_voltage()
            } else {
                None
            },
        };
        debug!("Host metrics: {metrics:?}");
        metrics
    }
}

/// Reads the CPU temperature from a thermal zone file, which contains millidegrees
pub fn read_cpu_temp(path: &Path) -> Option<f64> {
    let content = std::fs::read_to_string(path)
        .inspect_err(|e| debug!("Cannot read {}: {e}", path.display()))
        .ok()?;
    parse_millidegrees(&content)
}

/// Parses the first line of a thermal zone file
fn parse_millidegrees(content: &str) -> Option<f64> {
    let line = content.lines().next()?.trim();
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        debug!("Unexpected temperature content {line:?}");
        return None;
    }
    line.parse::<f64>().ok().map(|millis| millis / 1000.0)
}

/// Reads the CPU usage from a batch run of `top`
pub fn read_cpu_usage() -> Option<f64> {
    parse_top_cpu(&run("top", &["-bn1"])?)
}

/// Extracts the user CPU percentage from `top` output
///
/// Both `Cpu(s):  2.3%us, ...` and `%Cpu(s):  2.3 us, ...` layouts are accepted.
fn parse_top_cpu(output: &str) -> Option<f64> {
    let line = output.lines().find(|l| l.contains("Cpu(s)"))?;
    let (_, values) = line.split_once(':')?;
    let token = values.split(',').next()?.trim();
    let number = token
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c.is_whitespace())
        .trim_end_matches('%');
    number.trim().parse().ok()
}

/// Reads the core voltage with `vcgencmd`, which only exists on Raspberry Pi OS
pub fn read_core_voltage() -> Option<f64> {
    parse_vcgencmd_volts(&run("vcgencmd", &["measure_volts", "core"])?)
}

/// Parses `volt=1.2000V`
fn parse_vcgencmd_volts(output: &str) -> Option<f64> {
    output
        .trim()
        .strip_prefix("volt=")?
        .strip_suffix('V')?
        .parse()
        .ok()
}

/// Runs a command and returns its standard output if it succeeded
fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .inspect_err(|e| debug!("Cannot run {program}: {e}"))
        .ok()?;
    if !output.status.success() {
        debug!("{program} exited with {}", output.status);
        return None;
    }
    String::from_utf8(output.stdout).ok()
}
