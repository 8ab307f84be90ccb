//! Wallet persistence: one pretty-printed JSON snapshot under ~/.cardwise.

use anyhow::{Context, Result};
use cardwise_core::{Wallet, WalletSnapshot};
use std::fs;
use std::path::{Path, PathBuf};

pub fn cardwise_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cardwise"))
}

pub fn ensure_cardwise_home() -> Result<PathBuf> {
    let dir = cardwise_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn wallet_path() -> Result<PathBuf> {
    Ok(ensure_cardwise_home()?.join("wallet.json"))
}

pub fn save_wallet(path: &Path, wallet: &Wallet) -> Result<()> {
    let json = serde_json::to_string_pretty(&wallet.snapshot())?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// A missing file is a fresh wallet, same as the first run.
pub fn load_wallet(path: &Path) -> Result<Wallet> {
    if !path.exists() {
        return Ok(Wallet::new());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let snapshot: WalletSnapshot =
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Wallet::from_snapshot(snapshot))
}
