use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default config file location inside the container image.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/medialaunch.toml";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const DEFAULT_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            level: Self::DEFAULT_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        let str_original = self.level.clone();
        self.level = self.level.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.level.as_str()) {
            eprintln!(
                "Config error: log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::DEFAULT_LEVEL
            );
            self.level = Self::DEFAULT_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MaintenanceConfig {
    pub db_dir: PathBuf,
    pub extension: String,
    threads: usize,
}

impl MaintenanceConfig {
    const DEFAULT_DB_DIR: &str = "/var/lib/emby/data";
    const DEFAULT_EXTENSION: &str = "db";
    const DEFAULT_THREADS: usize = 8;

    /// Worker pool cap, always at least one.
    pub fn threads(&self) -> usize {
        self.threads.max(1)
    }

    fn default() -> Self {
        MaintenanceConfig {
            db_dir: PathBuf::from(Self::DEFAULT_DB_DIR),
            extension: Self::DEFAULT_EXTENSION.to_owned(),
            threads: Self::DEFAULT_THREADS,
        }
    }

    #[cfg(test)]
    pub fn new(db_dir: PathBuf, extension: &str, threads: usize) -> Self {
        MaintenanceConfig {
            db_dir,
            extension: extension.to_owned(),
            threads,
        }
    }

    fn ensure_valid(&mut self) {
        // Accept ".db" and "db" alike; matching uses the bare extension
        let trimmed = self.extension.trim().trim_start_matches('.').to_owned();
        if trimmed.is_empty() {
            eprintln!(
                "Config error: empty database extension - using default of '{}'",
                Self::DEFAULT_EXTENSION
            );
            self.extension = Self::DEFAULT_EXTENSION.to_owned();
        } else {
            self.extension = trimmed;
        }

        if self.threads == 0 {
            eprintln!(
                "Config error: maintenance threads of 0 is invalid - using default of {}",
                Self::DEFAULT_THREADS
            );
            self.threads = Self::DEFAULT_THREADS;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DevicesConfig {
    pub root: PathBuf,
    pub prefixes: Vec<String>,
}

impl DevicesConfig {
    const DEFAULT_ROOT: &str = "/dev";

    fn default() -> Self {
        DevicesConfig {
            root: PathBuf::from(Self::DEFAULT_ROOT),
            // NVIDIA accelerator nodes plus DRM card/render nodes
            prefixes: vec![
                "nvi".to_owned(),
                "dri/card".to_owned(),
                "dri/render".to_owned(),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ServerConfig {
    fn default() -> Self {
        ServerConfig {
            program: PathBuf::from("/usr/lib/emby-server/EmbyServer"),
            args: vec![
                "-ffdetect".to_owned(),
                "/usr/bin/ffdetect-emby".to_owned(),
                "-ffmpeg".to_owned(),
                "/usr/bin/ffmpeg-emby".to_owned(),
                "-ffprobe".to_owned(),
                "/usr/bin/ffprobe-emby".to_owned(),
                "-programdata".to_owned(),
                "/var/lib/emby".to_owned(),
                "-noautorunwebapp".to_owned(),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub maintenance: MaintenanceConfig,
    pub devices: DevicesConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Loads the configuration from defaults, an optional TOML file, and
    /// `MEDIALAUNCH_*` environment variables, in increasing precedence.
    /// A missing config file is normal for containers running on defaults;
    /// a file that fails to parse falls back to defaults with a message.
    pub fn load_config(config_path: &Path) -> Self {
        let default_config = Config::default();

        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("MEDIALAUNCH_").split("__"));

        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
        self.maintenance.ensure_valid();
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            logging: LoggingConfig::default(),
            maintenance: MaintenanceConfig::default(),
            devices: DevicesConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_without_config_file() {
        figment::Jail::expect_with(|jail| {
            let config = Config::load_config(&jail.directory().join("missing.toml"));

            assert_eq!(config.logging.level, "info");
            assert_eq!(config.maintenance.db_dir, PathBuf::from("/var/lib/emby/data"));
            assert_eq!(config.maintenance.extension, "db");
            assert_eq!(config.maintenance.threads(), 8);
            assert_eq!(config.devices.root, PathBuf::from("/dev"));
            assert_eq!(
                config.devices.prefixes,
                vec!["nvi", "dri/card", "dri/render"]
            );
            assert_eq!(
                config.server.program,
                PathBuf::from("/usr/lib/emby-server/EmbyServer")
            );
            assert!(config.server.args.contains(&"-noautorunwebapp".to_string()));
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "medialaunch.toml",
                r#"
                [logging]
                level = "debug"

                [maintenance]
                db_dir = "/data/dbs"
                threads = 2

                [server]
                program = "/usr/bin/jellyfin"
                args = ["--datadir", "/data"]
                "#,
            )?;

            let config = Config::load_config(&jail.directory().join("medialaunch.toml"));

            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.maintenance.db_dir, PathBuf::from("/data/dbs"));
            assert_eq!(config.maintenance.threads(), 2);
            assert_eq!(config.server.program, PathBuf::from("/usr/bin/jellyfin"));
            assert_eq!(config.server.args, vec!["--datadir", "/data"]);
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "medialaunch.toml",
                r#"
                [logging]
                level = "warn"
                "#,
            )?;
            jail.set_env("MEDIALAUNCH_LOGGING__LEVEL", "trace");

            let config = Config::load_config(&jail.directory().join("medialaunch.toml"));

            assert_eq!(config.logging.level, "trace");
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back_to_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "medialaunch.toml",
                r#"
                [logging]
                level = "verbose"

                [maintenance]
                extension = ""
                threads = 0
                "#,
            )?;

            let config = Config::load_config(&jail.directory().join("medialaunch.toml"));

            assert_eq!(config.logging.level, "info");
            assert_eq!(config.maintenance.extension, "db");
            assert_eq!(config.maintenance.threads(), 8);
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_dotted_extension_is_normalized() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "medialaunch.toml",
                r#"
                [maintenance]
                extension = ".sqlite"
                "#,
            )?;

            let config = Config::load_config(&jail.directory().join("medialaunch.toml"));

            assert_eq!(config.maintenance.extension, "sqlite");
            Ok(())
        });
    }
}
