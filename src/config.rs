use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;

use crate::error::{Error, Result};

/// identity used when user.name/user.email are not configured
pub const UNKNOWN_IDENTITY: &str = "Unknown <unknown@example.com>";

/// layered repository configuration
///
/// sections and keys are lowercased on read (git config keys are
/// case-insensitive); later files in the chain override earlier ones.
#[derive(Clone, Debug, Default)]
pub struct Config {
    values: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// the schema written into a fresh repository
    pub fn defaults() -> Self {
        let mut config = Self::default();
        config.set("core", "repositoryformatversion", "0");
        config.set("core", "filemode", "false");
        config.set("core", "bare", "false");
        config
    }

    /// read the full precedence chain for a repository
    pub fn load(gitdir: &Path) -> Result<Self> {
        let mut config = Self::defaults();
        for file in config_file_chain(gitdir) {
            if file.is_file() {
                config.merge_file(&file)?;
            }
        }
        Ok(config)
    }

    /// merge configuration files in order, later files winning
    pub fn from_files(files: &[PathBuf]) -> Result<Self> {
        let mut config = Self::defaults();
        for file in files {
            if file.is_file() {
                config.merge_file(file)?;
            }
        }
        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let mut ini = Ini::new();
        let map = ini
            .load(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        for (section, keys) in map {
            for (key, value) in keys {
                if let Some(value) = value {
                    self.set(&section, &key, &value);
                }
            }
        }
        Ok(())
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.values
            .entry(section.to_lowercase())
            .or_default()
            .insert(key.to_lowercase(), value.to_string());
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.values
            .get(&section.to_lowercase())
            .and_then(|keys| keys.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        match self.get(section, key)?.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    /// whether executable-bit changes are tracked
    pub fn filemode(&self) -> bool {
        self.get_bool("core", "filemode").unwrap_or(false)
    }

    /// validate core.repositoryformatversion on repository load
    pub fn check_format_version(&self) -> Result<()> {
        let raw = self
            .get("core", "repositoryformatversion")
            .ok_or_else(|| Error::Config("missing core.repositoryformatversion".to_string()))?;
        if raw.trim() != "0" {
            return Err(Error::UnsupportedFormatVersion(raw.to_string()));
        }
        Ok(())
    }

    /// committer identity from user.name and user.email
    ///
    /// falls back to a sentinel identity with a notice when either is
    /// missing.
    pub fn user_identity(&self) -> String {
        match (self.get("user", "name"), self.get("user", "email")) {
            (Some(name), Some(email)) => format!("{} <{}>", name, email),
            _ => {
                log::info!(
                    "no user identity in config; set user.name and user.email \
                     (using '{}')",
                    UNKNOWN_IDENTITY
                );
                UNKNOWN_IDENTITY.to_string()
            }
        }
    }
}

/// contents of the config file written by init
pub fn default_config_text() -> String {
    "[core]\n\trepositoryformatversion = 0\n\tfilemode = false\n\tbare = false\n".to_string()
}

/// config precedence chain: system, xdg, user, repository
fn config_file_chain(gitdir: &Path) -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from("/etc/gitconfig")];
    if let Some(config_home) = xdg_config_home() {
        files.push(config_home.join("git/config"));
    }
    if let Ok(home) = std::env::var("HOME") {
        files.push(PathBuf::from(home).join(".gitconfig"));
    }
    files.push(gitdir.join("config"));
    files
}

/// $XDG_CONFIG_HOME with the ~/.config fallback
pub fn xdg_config_home() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg));
        }
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config"))
}
