//! Configuration of the viewer.
//!
//! Settings are read from `~/.gnuplot-viewer/config.yaml` when present and
//! fall back to defaults field by field, so a config file only needs the
//! keys it wants to change. Command line flags override the file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::renderer::RendererConfig;
use crate::workflow::WorkflowOptions;

const CONFIG_DIR: &str = ".gnuplot-viewer";
const CONFIG_FILE: &str = "config.yaml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("HOME env var not set")]
    NoHome,
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Window
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Native window title.
    pub title: String,
    /// Initial inner size in logical pixels.
    pub inner_size: [f32; 2],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "gnuplot viewer".to_string(),
            inner_size: [950.0, 550.0],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ViewerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// | Field               | Purpose |
/// |---------------------|---------|
/// | `renderer`          | Plotting binary, output file name and working directory |
/// | `watch_interval_ms` | Poll interval of the script change watch |
/// | `window`            | Title and initial size of the native window |
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub renderer: RendererConfig,
    pub watch_interval_ms: u64,
    pub window: WindowConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            watch_interval_ms: 250,
            window: WindowConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            watch_interval: Duration::from_millis(self.watch_interval_ms.max(10)),
        }
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&s)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let s = self.to_yaml()?;
        let mut f = fs::File::create(path).map_err(io_err)?;
        f.write_all(s.as_bytes()).map_err(io_err)?;
        Ok(())
    }

    /// Load `~/.gnuplot-viewer/config.yaml`, or defaults if it does not exist.
    pub fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }
}
