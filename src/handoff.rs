use std::path::PathBuf;
use std::process::Command;

use crate::config::ServerConfig;
use crate::error::MediaLaunchError;

/// The fixed target the entrypoint hands the process over to. Assembled
/// once from config; nothing discovered at runtime feeds into it.
#[derive(Debug, Clone)]
pub struct HandoffSpec {
    program: PathBuf,
    args: Vec<String>,
}

impl HandoffSpec {
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            program: server.program.clone(),
            args: server.args.clone(),
        }
    }

    /// Full command line for the handoff log line.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Replaces the current process image with the target. Returns only on
    /// failure; on success the target owns the process from here on, with
    /// the same pid, standard streams, and environment.
    #[cfg(unix)]
    pub fn exec(&self) -> MediaLaunchError {
        use std::os::unix::process::CommandExt;

        let err = Command::new(&self.program).args(&self.args).exec();
        MediaLaunchError::Error(format!(
            "failed to exec {}: {}",
            self.program.display(),
            err
        ))
    }

    /// No execve on this platform: run the target as a child, wait for it,
    /// and adopt its exit status so nothing runs after the handoff.
    #[cfg(not(unix))]
    pub fn exec(&self) -> MediaLaunchError {
        match Command::new(&self.program).args(&self.args).status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(err) => MediaLaunchError::Error(format!(
                "failed to launch {}: {}",
                self.program.display(),
                err
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec_for(program: &str, args: &[&str]) -> HandoffSpec {
        HandoffSpec::from_config(&ServerConfig {
            program: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    #[test]
    fn test_command_line_rendering() {
        let spec = spec_for(
            "/usr/lib/emby-server/EmbyServer",
            &["-programdata", "/var/lib/emby", "-noautorunwebapp"],
        );
        assert_eq!(
            spec.command_line(),
            "/usr/lib/emby-server/EmbyServer -programdata /var/lib/emby -noautorunwebapp"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_of_missing_target_returns_an_error() {
        let spec = spec_for("/nonexistent/media-server-binary", &[]);
        // exec only returns on failure, so reaching the assertion at all
        // proves the process image was not replaced
        let err = spec.exec();
        assert!(err.to_string().contains("/nonexistent/media-server-binary"));
    }
}
