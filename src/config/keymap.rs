use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::defaults::GBA_BUTTON_KEYS;

/// Token → key-name aliases applied to each command before it is pressed.
///
/// Lookups are case-insensitive on the token. Tokens without an alias pass
/// through unchanged, so an empty map is a plain passthrough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    aliases: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(transparent)]
struct KeyMapFile(BTreeMap<String, String>);

impl KeyMap {
    /// The default layout of mGBA for GBA buttons.
    pub fn gba() -> Self {
        let aliases = GBA_BUTTON_KEYS
            .iter()
            .map(|(token, key)| ((*token).to_string(), (*key).to_string()))
            .collect();
        Self { aliases }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let KeyMapFile(entries) = serde_yaml::from_str(raw).context("invalid keymap YAML")?;
        let mut aliases = BTreeMap::new();
        for (token, key) in entries {
            let token = token.trim().to_ascii_lowercase();
            let key = key.trim().to_string();
            if token.is_empty() {
                bail!("keymap contains an empty token");
            }
            if key.is_empty() || key.chars().any(char::is_whitespace) {
                bail!("keymap entry '{token}' must map to a single key name");
            }
            aliases.insert(token, key);
        }
        Ok(Self { aliases })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read keymap '{}'", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("in keymap '{}'", path.display()))
    }

    /// Overlay `other` on top of this map; entries in `other` win.
    pub fn merged(mut self, other: KeyMap) -> Self {
        self.aliases.extend(other.aliases);
        self
    }

    pub fn resolve<'a>(&'a self, token: &'a str) -> &'a str {
        self.aliases
            .get(&token.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(token)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
