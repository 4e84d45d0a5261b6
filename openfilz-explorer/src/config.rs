use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::ops::retry::DEFAULT_MAX_ATTEMPTS;
use crate::view::DEFAULT_PAGE_SIZE;

const DEFAULT_API_URL: &str = "http://localhost:8081";
const PREFS_DIR_NAME: &str = "openfilz";
const PREFS_FILE_NAME: &str = "preferences.json";

#[derive(Clone, Debug)]
pub struct ExplorerConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub prefs_path: PathBuf,
    pub default_page_size: u32,
    pub max_attempts: u32,
}

impl ExplorerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("home directory is unavailable")?;
        let api_url =
            std::env::var("OPENFILZ_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let token = std::env::var("OPENFILZ_TOKEN")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let prefs_path = std::env::var("OPENFILZ_PREFS_FILE")
            .ok()
            .map(|value| expand_with_home(&value, &home))
            .unwrap_or_else(|| default_prefs_path(&home));
        let default_page_size = read_u32_env("OPENFILZ_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        let max_attempts = read_u32_env("OPENFILZ_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);

        Ok(Self {
            api_url,
            token,
            prefs_path,
            default_page_size,
            max_attempts,
        })
    }
}

fn default_prefs_path(home: &Path) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home.join(".config"))
        .join(PREFS_DIR_NAME)
        .join(PREFS_FILE_NAME)
}

pub(crate) fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn read_u32_env(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
