use log::error;
use std::process::ExitCode;
use x728_ups_monitor::configuration;
use x728_ups_monitor::monitor::Monitor;

const DEFAULT_CONFIG_PATH: &str = "/etc/x728-ups-monitor.conf";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => path.as_str(),
        None => DEFAULT_CONFIG_PATH,
    };

    let config = match configuration::Configuration::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration {config_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .verbosity(config.verbosity())
        .init()
    {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match Monitor::new(config).run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
