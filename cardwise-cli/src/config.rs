use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use cardwise_store::ensure_cardwise_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub display: DisplaySection,
    pub wallet: WalletSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySection {
    pub currency_symbol: String,
    /// Upper bound on history rows printed before truncation.
    pub max_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// Card used when --card is omitted.
    pub default_card: Option<u64>,
    /// Statement file picked up when --csv is omitted.
    pub statement_csv: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplaySection {
                currency_symbol: "₹".to_string(),
                max_rows: 25,
            },
            wallet: WalletSection {
                default_card: None,
                statement_csv: "statement.csv".to_string(),
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_cardwise_home()?.join("config.toml"))
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
