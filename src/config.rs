use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codegen::Target;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Knobs for the grammar engine and the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Lines starting with this character are dropped before lexing.
    pub comment_marker: char,
    pub memoize: bool,
    pub max_depth: usize,
    pub fallback: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            comment_marker: '\\',
            memoize: true,
            max_depth: 64,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Config::from_toml(&text, path)
    }

    /// Load the first config found, falling back to defaults. An explicit
    /// path must exist; discovered ones are skipped when missing.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = explicit {
            return Config::from_file(path);
        }
        match find_config_path() {
            Some(path) => {
                log::debug!("using config {}", path.display());
                Config::from_file(&path)
            }
            None => Ok(Config::default()),
        }
    }
}

/// Resolution order:
/// 1. ENGLANG_CONFIG environment variable
/// 2. XDG config file (~/.config/englang/config.toml)
/// 3. englang.toml in the working directory
pub fn find_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("ENGLANG_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let config_dir = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")));
    if let Ok(dir) = config_dir {
        let path = dir.join("englang").join("config.toml");
        if path.exists() {
            return Some(path);
        }
    }

    let local = PathBuf::from("englang.toml");
    if local.exists() {
        return Some(local);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = Config::from_toml("[parser]\nmax_depth = 8\n", Path::new("inline")).unwrap();
        assert_eq!(config.parser.max_depth, 8);
        assert_eq!(config.parser.comment_marker, '\\');
        assert!(config.parser.memoize);
        assert!(config.parser.fallback);
        assert_eq!(config.output.target, Target::CSharp);
    }

    #[test]
    fn test_full_config() {
        let text = r##"
            [parser]
            comment_marker = "#"
            memoize = false
            fallback = false

            [output]
            target = "javascript"
        "##;
        let config = Config::from_toml(text, Path::new("inline")).unwrap();
        assert_eq!(config.parser.comment_marker, '#');
        assert!(!config.parser.memoize);
        assert!(!config.parser.fallback);
        assert_eq!(config.output.target, Target::JavaScript);
    }

    #[test]
    fn test_bad_toml_is_reported() {
        let err = Config::from_toml("[parser\n", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\ntarget = \"javascript\"").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.output.target, Target::JavaScript);

        let missing = Config::load(Some(Path::new("/nonexistent/englang.toml")));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
