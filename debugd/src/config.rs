//! Layered server configuration: environment > `debugd.toml` > defaults.
//!
//! The resolved [`ServerConfig`] is built once at startup and never
//! mutated afterwards; handlers receive it behind an `Arc`.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_LOG_SUBDIR: &str = ".claude";

pub const PORT_ENV: &str = "DEBUG_PORT";
pub const LOG_DIR_ENV: &str = "DEBUG_LOG_DIR";

const CONFIG_FILE: &str = "debugd.toml";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub project_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_dir: PathBuf,
}

/// Raw environment overrides, captured as strings so parsing errors can be
/// reported with context instead of panicking deep in a handler.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub port: Option<String>,
    pub log_subdir: Option<String>,
}

impl EnvOverrides {
    pub fn from_process_env() -> Self {
        Self {
            port: env::var(PORT_ENV).ok(),
            log_subdir: env::var(LOG_DIR_ENV).ok(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_subdir: Option<String>,
}

#[derive(Deserialize)]
struct RootConfig {
    #[serde(default)]
    server: Option<RawServerConfig>,
}

#[derive(Deserialize, Default)]
struct RawServerConfig {
    host: Option<String>,
    port: Option<u16>,
    log_subdir: Option<String>,
}

/// Load the optional `debugd.toml` next to the project directory. A missing
/// file is fine; an unreadable or unparseable one is a startup error.
pub fn load_file_config(project_dir: &Path) -> Result<Option<FileServerConfig>> {
    let path = project_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let parsed: RootConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config {}", path.display()))?;

    Ok(parsed.server.map(|raw| FileServerConfig {
        host: raw.host,
        port: raw.port,
        log_subdir: raw.log_subdir,
    }))
}

/// Resolve the full configuration for a project directory from the real
/// process environment.
pub fn resolve(project_dir: PathBuf) -> Result<ServerConfig> {
    let file_cfg = load_file_config(&project_dir)?;
    determine_config(
        project_dir,
        &EnvOverrides::from_process_env(),
        file_cfg.as_ref(),
    )
}

pub fn determine_config(
    project_dir: PathBuf,
    env: &EnvOverrides,
    file_cfg: Option<&FileServerConfig>,
) -> Result<ServerConfig> {
    let port = match env.port.as_deref() {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid {PORT_ENV} value '{raw}'"))?,
        None => file_cfg.and_then(|cfg| cfg.port).unwrap_or(DEFAULT_PORT),
    };

    let host = file_cfg
        .and_then(|cfg| cfg.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let log_subdir = env
        .log_subdir
        .clone()
        .or_else(|| file_cfg.and_then(|cfg| cfg.log_subdir.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_SUBDIR.to_string());

    let log_dir = project_dir.join(log_subdir);

    Ok(ServerConfig {
        project_dir,
        host,
        port,
        log_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_without_env_or_file() {
        let config = determine_config(PathBuf::from("/proj"), &EnvOverrides::default(), None)
            .expect("resolve defaults");

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.log_dir, PathBuf::from("/proj/.claude"));
    }

    #[test]
    fn file_config_drives_port_and_subdir() {
        let file_cfg = FileServerConfig {
            host: Some("127.0.0.1".to_string()),
            port: Some(4000),
            log_subdir: Some(".debug".to_string()),
        };

        let config = determine_config(
            PathBuf::from("/proj"),
            &EnvOverrides::default(),
            Some(&file_cfg),
        )
        .expect("resolve file config");

        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.log_dir, PathBuf::from("/proj/.debug"));
    }

    #[test]
    fn env_overrides_file_config() {
        let file_cfg = FileServerConfig {
            host: None,
            port: Some(4000),
            log_subdir: Some(".debug".to_string()),
        };
        let env = EnvOverrides {
            port: Some("9100".to_string()),
            log_subdir: Some(".logs".to_string()),
        };

        let config = determine_config(PathBuf::from("/proj"), &env, Some(&file_cfg))
            .expect("resolve env overrides");

        assert_eq!(config.port, 9100);
        assert_eq!(config.log_dir, PathBuf::from("/proj/.logs"));
    }

    #[test]
    fn malformed_port_env_is_a_startup_error() {
        let env = EnvOverrides {
            port: Some("not-a-port".to_string()),
            log_subdir: None,
        };

        let err = determine_config(PathBuf::from("/proj"), &env, None)
            .expect_err("should reject bad port");
        assert!(err.to_string().contains(PORT_ENV));
    }

    #[test]
    fn missing_config_file_is_none() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_file_config(dir.path()).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn config_file_is_parsed() {
        let dir = tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[server]\nport = 4100\nlog_subdir = \".debug\"\n",
        )
        .expect("write config");

        let loaded = load_file_config(dir.path())
            .expect("load")
            .expect("server section");
        assert_eq!(loaded.port, Some(4100));
        assert_eq!(loaded.log_subdir.as_deref(), Some(".debug"));
        assert!(loaded.host.is_none());
    }

    #[test]
    fn broken_config_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE), "[server\nport=").expect("write config");

        assert!(load_file_config(dir.path()).is_err());
    }
}
