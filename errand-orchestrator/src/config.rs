//! Orchestrator configuration
//!
//! Defines the listen address, the workspace root, the concurrency bound of
//! the executor and the engine command line.

use std::path::PathBuf;

/// Port used when neither `ERRAND_BIND_ADDR` nor `PORT` is set
pub const DEFAULT_PORT: u16 = 8000;

/// Engine command line used when `ERRAND_ENGINE_COMMAND` is not set
pub const DEFAULT_ENGINE_COMMAND: &str = "python3 main.py --prompt";

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to (e.g., "0.0.0.0:8000")
    pub bind_addr: String,

    /// Root directory holding one subdirectory per job
    pub workspace_dir: PathBuf,

    /// Maximum number of jobs executing at the same time
    pub max_concurrent_jobs: usize,

    /// Engine program followed by its fixed arguments; the prompt is appended
    pub engine_command: Vec<String>,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - ERRAND_BIND_ADDR (optional, default: 0.0.0.0:$PORT)
    /// - PORT (optional, default: 8000)
    /// - ERRAND_WORKSPACE_DIR (optional, default: ./workspace)
    /// - ERRAND_MAX_CONCURRENT_JOBS (optional, default: 4)
    /// - ERRAND_ENGINE_COMMAND (optional, whitespace separated)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = match lookup("ERRAND_BIND_ADDR") {
            Some(addr) => addr,
            None => {
                let port = match lookup("PORT") {
                    Some(port) => port
                        .parse::<u16>()
                        .map_err(|_| anyhow::anyhow!("PORT must be a port number, got '{}'", port))?,
                    None => DEFAULT_PORT,
                };
                format!("0.0.0.0:{}", port)
            }
        };

        let workspace_dir = lookup("ERRAND_WORKSPACE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.workspace_dir);

        let max_concurrent_jobs = match lookup("ERRAND_MAX_CONCURRENT_JOBS") {
            Some(value) => value.parse::<usize>().map_err(|_| {
                anyhow::anyhow!(
                    "ERRAND_MAX_CONCURRENT_JOBS must be a number, got '{}'",
                    value
                )
            })?,
            None => defaults.max_concurrent_jobs,
        };

        let engine_command = lookup("ERRAND_ENGINE_COMMAND")
            .map(|command| split_command(&command))
            .unwrap_or(defaults.engine_command);

        Ok(Self {
            bind_addr,
            workspace_dir,
            max_concurrent_jobs,
            engine_command,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.workspace_dir.as_os_str().is_empty() {
            anyhow::bail!("workspace_dir cannot be empty");
        }

        if self.max_concurrent_jobs == 0 {
            anyhow::bail!("max_concurrent_jobs must be greater than 0");
        }

        if self.engine_command.is_empty() {
            anyhow::bail!("engine_command cannot be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            workspace_dir: PathBuf::from("./workspace"),
            max_concurrent_jobs: 4,
            engine_command: split_command(DEFAULT_ENGINE_COMMAND),
        }
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.workspace_dir, PathBuf::from("./workspace"));
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.engine_command, vec!["python3", "main.py", "--prompt"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_environment_matches_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr, Config::default().bind_addr);
        assert_eq!(config.max_concurrent_jobs, 4);
    }

    #[test]
    fn test_port_and_bind_addr() {
        let config = load(&[("PORT", "9001")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9001");

        let config = load(&[("PORT", "9001"), ("ERRAND_BIND_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000");

        assert!(load(&[("PORT", "http")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ERRAND_WORKSPACE_DIR", "/srv/errand"),
            ("ERRAND_MAX_CONCURRENT_JOBS", "8"),
            ("ERRAND_ENGINE_COMMAND", "  my-agent   run --prompt "),
        ])
        .unwrap();

        assert_eq!(config.workspace_dir, PathBuf::from("/srv/errand"));
        assert_eq!(config.max_concurrent_jobs, 8);
        assert_eq!(config.engine_command, vec!["my-agent", "run", "--prompt"]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
        config.max_concurrent_jobs = 1;

        config.engine_command = split_command("   ");
        assert!(config.validate().is_err());
        config.engine_command = split_command("agent");

        config.bind_addr = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_concurrency_is_a_load_error() {
        assert!(load(&[("ERRAND_MAX_CONCURRENT_JOBS", "many")]).is_err());

        let config = load(&[("ERRAND_MAX_CONCURRENT_JOBS", "0")]).unwrap();
        assert!(config.validate().is_err());
    }
}
