//! Small key-value file used to carry state from one command to the next,
//! e.g. the recipients picked in `collect` for a later `send`.

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::recipients::RecipientSet;

pub const MESSAGE_NUMBERS_KEY: &str = "message-numbers";

#[derive(Debug, Clone)]
pub struct HandoffStore {
    path: PathBuf,
}

impl HandoffStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("handoff.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed reading {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Failed parsing {}", self.path.display()))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut all = self.read_all()?;
        match all.remove(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .with_context(|| format!("Failed decoding hand-off key {key}")),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut all = self.read_all()?;
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed encoding hand-off key {key}"))?;
        all.insert(key.to_string(), value);
        write_json_atomic(&self.path, &all)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut all = self.read_all()?;
        if all.remove(key).is_none() {
            return Ok(());
        }
        if all.is_empty() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed deleting {}", self.path.display()))?;
            return Ok(());
        }
        write_json_atomic(&self.path, &all)
    }

    pub fn load_recipients(&self) -> Result<RecipientSet> {
        Ok(self.get(MESSAGE_NUMBERS_KEY)?.unwrap_or_default())
    }

    pub fn save_recipients(&self, recipients: &RecipientSet) -> Result<()> {
        self.set(MESSAGE_NUMBERS_KEY, recipients)
    }

    pub fn clear_recipients(&self) -> Result<()> {
        self.remove(MESSAGE_NUMBERS_KEY)
    }
}

/// Serializes `value` to a sibling temp file, then renames it into place.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed creating state directory {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or("state.json");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let text = serde_json::to_string_pretty(value).context("Failed encoding state JSON")?;
    fs::write(&tmp_path, text).with_context(|| format!("Failed writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed moving {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
