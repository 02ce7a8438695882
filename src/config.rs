use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEGATE_CONFIG_PATH").unwrap_or("/usr/local/etc/facegate/config.toml"))
});

pub static ENCODING_STORE_DIR: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEGATE_STORE_DIR").unwrap_or("/usr/local/etc/facegate/encodings"))
});

pub static MODEL_DIR: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEGATE_MODEL_DIR").unwrap_or("/usr/local/share/facegate/models"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum Euclidean distance for declaring a match. Inherited from the
    /// deployed system; recalibrate whenever the encoder model changes.
    pub threshold: f32,
    pub store_dir: PathBuf,
    pub model_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 0.48,
            store_dir: ENCODING_STORE_DIR.to_path_buf(),
            model_dir: MODEL_DIR.to_path_buf(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    std::fs::write(path, data).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
