//! Configuration for qcat.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (QCAT_HOME, QCAT_DB)
//! 2. Config file (.qcat/config.yaml)
//! 3. Defaults (~/.qcat)
//!
//! Config file discovery:
//! - Searches the start directory and its parents for .qcat/config.yaml
//! - Paths in the config file are relative to the .qcat/ directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{CodecConfig, ContextMap};
use crate::domain::ContextScope;
use crate::store::HostStamp;

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".qcat";

/// Database file name used when none is configured
pub const DEFAULT_DATABASE: &str = "categories.db";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub codec: Option<CodecConfig>,
    /// Scope to storage context id, merged over the built-in table
    #[serde(default)]
    pub contexts: HashMap<ContextScope, i64>,
    /// Host part of generated record stamps
    #[serde(default)]
    pub stamp_host: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .qcat/)
    pub home: Option<String>,
    /// Database file (relative to .qcat/)
    pub database: Option<String>,
}

/// Values taken from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

impl EnvOverrides {
    /// Read QCAT_HOME and QCAT_DB
    pub fn from_env() -> Self {
        Self {
            home: std::env::var_os("QCAT_HOME").map(PathBuf::from),
            database: std::env::var_os("QCAT_DB").map(PathBuf::from),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Import/export options
    pub codec: CodecConfig,
    /// Scope to context mapping
    pub contexts: ContextMap,
    /// Host part of generated record stamps
    pub stamp_host: String,
}

impl ResolvedConfig {
    /// Stamp generator for new records
    pub fn stamps(&self) -> HostStamp {
        HostStamp::new(self.stamp_host.clone())
    }
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine the config file, environment and defaults
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: EnvOverrides,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_file, file) = match file {
        Some((path, file)) => (Some(path), Some(file)),
        None => (None, None),
    };
    let config_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));
    let paths = file.as_ref().map(|f| f.paths.clone()).unwrap_or_default();

    let home = env
        .home
        .or_else(|| paths.home.as_deref().map(|p| resolve_path(config_dir, p)))
        .unwrap_or(default_home);

    let database = env
        .database
        .or_else(|| paths.database.as_deref().map(|p| resolve_path(config_dir, p)))
        .unwrap_or_else(|| home.join(DEFAULT_DATABASE));

    let (codec, contexts, stamp_host) = match file {
        Some(file) => {
            let contexts = file
                .contexts
                .into_iter()
                .fold(ContextMap::default(), |map, (scope, id)| map.with(scope, id));
            (file.codec.unwrap_or_default(), contexts, file.stamp_host)
        }
        None => (CodecConfig::default(), ContextMap::default(), None),
    };

    ResolvedConfig {
        home,
        database,
        config_file,
        codec,
        contexts,
        stamp_host: stamp_host.unwrap_or_else(|| HostStamp::default().host().to_string()),
    }
}

/// Load configuration, searching for a config file from `start`
pub fn load_config_from(start: &Path, env: EnvOverrides) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let file = match find_config_file(start) {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            Some((path, parsed))
        }
        None => None,
    };

    Ok(resolve(file, env, default_home))
}

/// Load configuration for the current directory and environment
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd, EnvOverrides::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    use crate::core::{ContextResolver, MissingParentPolicy};

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", body).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, EnvOverrides::default(), PathBuf::from("/home/u/.qcat"));

        assert_eq!(config.home, PathBuf::from("/home/u/.qcat"));
        assert_eq!(config.database, PathBuf::from("/home/u/.qcat/categories.db"));
        assert!(config.config_file.is_none());
        assert_eq!(config.codec, CodecConfig::default());
        assert_eq!(config.stamp_host, "localhost");
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            temp.path(),
            r#"
version: "1.0"
paths:
  home: ./state
  database: ./state/bank.db
codec:
  stop_on_error: true
  missing_parent: skip
contexts:
  module: 70
  course: 20
stamp_host: quiz.example.org
"#,
        );

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./state".to_string()));
        assert_eq!(config.contexts.get(&ContextScope::Module), Some(&70));

        let codec = config.codec.unwrap();
        assert!(codec.stop_on_error);
        assert_eq!(codec.missing_parent, MissingParentPolicy::Skip);
        assert!(codec.context_to_file);
    }

    #[test]
    fn test_discovery_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "version: \"1.0\"\ncontexts:\n  course: 20\nstamp_host: bank.local\n",
        );
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = load_config_from(&nested, EnvOverrides::default()).unwrap();

        assert!(config.config_file.is_some());
        assert_eq!(config.contexts.context_id(ContextScope::Course), Some(20));
        assert_eq!(config.contexts.context_id(ContextScope::System), Some(1));
        assert_eq!(config.stamp_host, "bank.local");
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            temp.path(),
            "version: \"1.0\"\npaths:\n  database: ./file.db\n",
        );
        let parsed = load_config_file(&config_path).unwrap();

        let env = EnvOverrides {
            home: Some(PathBuf::from("/env/home")),
            database: Some(PathBuf::from("/env/cats.db")),
        };
        let config = resolve(Some((config_path, parsed)), env, PathBuf::from("/unused"));

        assert_eq!(config.home, PathBuf::from("/env/home"));
        assert_eq!(config.database, PathBuf::from("/env/cats.db"));
    }

    #[test]
    fn test_database_relative_to_config_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            temp.path(),
            "version: \"1.0\"\npaths:\n  database: bank.db\n",
        );
        let parsed = load_config_file(&config_path).unwrap();

        let config = resolve(
            Some((config_path, parsed)),
            EnvOverrides::default(),
            PathBuf::from("/home/u/.qcat"),
        );

        assert_eq!(config.database, temp.path().join(CONFIG_DIR).join("bank.db"));
        assert_eq!(config.home, PathBuf::from("/home/u/.qcat"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
