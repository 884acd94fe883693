use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use flexi_logger::{DeferredNow, Logger, LoggerHandle};
use log::{error, info, warn, Record};

use crate::config::{Config, LoggingConfig, DEFAULT_CONFIG_PATH};
use crate::devices;
use crate::error::MediaLaunchError;
use crate::handoff::HandoffSpec;
use crate::maintenance;

#[derive(Parser)]
#[command(
    name = "medialaunch",
    version,
    about = "Container entrypoint: database maintenance, device permissions, media server handoff"
)]
pub struct Cli {
    /// Path to the config file
    #[arg(long = "config", short = 'c', default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override the directory scanned for database files
    #[arg(long = "db-dir")]
    pub db_dir: Option<PathBuf>,

    /// Override the device tree root
    #[arg(long = "device-root")]
    pub device_root: Option<PathBuf>,

    /// Override the media server executable
    #[arg(long = "server")]
    pub server: Option<PathBuf>,
}

impl Cli {
    pub fn handle_command_line() -> Result<(), MediaLaunchError> {
        let args = Cli::parse();

        let mut config = Config::load_config(&args.config);
        args.apply_overrides(&mut config);

        let _logger = init_logging(&config.logging)?;

        Self::run(&config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(db_dir) = &self.db_dir {
            config.maintenance.db_dir = db_dir.clone();
        }
        if let Some(device_root) = &self.device_root {
            config.devices.root = device_root.clone();
        }
        if let Some(server) = &self.server {
            config.server.program = server.clone();
        }
    }

    /// The one-shot startup sequence. Maintenance runs to its join barrier,
    /// then the device pass, then the handoff — unconditionally, since the
    /// first two are best-effort. Returning at all means the handoff failed.
    fn run(config: &Config) -> Result<(), MediaLaunchError> {
        let outcomes = maintenance::run_maintenance(&config.maintenance);
        let failures = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failures > 0 {
            warn!(
                "{} of {} database file(s) reported maintenance errors; continuing startup",
                failures,
                outcomes.len()
            );
        }

        devices::normalize_devices(&config.devices);

        let handoff = HandoffSpec::from_config(&config.server);
        info!("starting media server: {}", handoff.command_line());

        // exec only returns on failure, and that failure is fatal
        let err = handoff.exec();
        error!("FATAL: media server handoff failed: {}", err);
        Err(err)
    }
}

fn log_format(
    w: &mut dyn Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(w, "[medialaunch] {} {}", record.level(), record.args())
}

/// Single-line, immediately flushed stdout logging. `RUST_LOG` wins over
/// the configured level when set.
fn init_logging(logging: &LoggingConfig) -> Result<LoggerHandle, MediaLaunchError> {
    Logger::try_with_env_or_str(&logging.level)
        .map_err(|e| MediaLaunchError::Error(format!("Failed to configure logging: {}", e)))?
        .log_to_stdout()
        .format(log_format)
        .start()
        .map_err(|e| MediaLaunchError::Error(format!("Failed to start logger: {}", e)))
}
