use anyhow::{Context, Result};
use cadence_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_cadence_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone used to interpret days and clock times on the command
    /// line. The engine itself runs in UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_owner")]
    pub default_owner: String,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_timezone() -> String {
    "America/Chicago".to_string()
}

fn default_owner() -> String {
    "me".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            default_owner: default_owner(),
            engine: EngineConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_cadence_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let cfg = Config::default();
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}
