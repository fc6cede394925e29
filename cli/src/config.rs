use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Looked up in the current directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "marputils.toml";

const DEFAULT_OUT_FILE: &str = "build.md";
const DEFAULT_MARP_BINARY: &str = "marp";
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Settings from `marputils.toml`. Every field has a default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub process: ProcessConfig,
    pub export: ExportConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessConfig {
    /// File name of the processed output, placed next to the input.
    pub out_file: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        ProcessConfig {
            out_file: DEFAULT_OUT_FILE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub binary: String,
    /// Pass `--html` to the renderer even without the flag.
    pub html: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            binary: DEFAULT_MARP_BINARY.to_string(),
            html: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), else `./marputils.toml` if present.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let local = PathBuf::from(CONFIG_FILE_NAME);
                if !local.is_file() {
                    return Ok(Config::default());
                }
                local
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Where `process` writes when no `--out-path` is given.
    pub fn default_out_path(&self, input: &Path) -> PathBuf {
        input.with_file_name(&self.process.out_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.process.out_file, "build.md");
        assert_eq!(config.export.binary, "marp");
        assert!(!config.export.html);
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = Config::parse("[export]\nhtml = true\n\n[watch]\ndebounce_ms = 50\n").unwrap();
        assert!(config.export.html);
        assert_eq!(config.export.binary, "marp");
        assert_eq!(config.watch.debounce_ms, 50);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("[process]\noutput = 'x.md'\n").is_err());
    }

    #[test]
    fn out_path_sits_next_to_the_input() {
        let config = Config::default();
        assert_eq!(
            config.default_out_path(Path::new("talks/deck.md")),
            PathBuf::from("talks/build.md")
        );
        assert_eq!(config.default_out_path(Path::new("deck.md")), PathBuf::from("build.md"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[process]\nout_file = 'slides.md'\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.process.out_file, "slides.md");
    }
}
