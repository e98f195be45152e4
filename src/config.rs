// src/config.rs
//! Runtime configuration: environment variables plus the optional
//! priority-category file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

const ENV_DB_PATH: &str = "FRESHRSS_DB_PATH";
const ENV_HOURS_BACK: &str = "HOURS_BACK";
const ENV_AI_API_KEY: &str = "AI_API_KEY";
const ENV_AI_MODEL: &str = "AI_MODEL";
const ENV_AI_BASE_URL: &str = "AI_BASE_URL";
const ENV_TARGET_WORD_COUNT: &str = "TARGET_WORD_COUNT";
const ENV_SUMMARY_CONCURRENCY: &str = "SUMMARY_CONCURRENCY";
const ENV_LEDGER_PATH: &str = "PROCESSED_IDS_PATH";
const ENV_CATEGORIES_PATH: &str = "DIGEST_CATEGORIES_PATH";

const DEFAULT_HOURS_BACK: u64 = 8;
const DEFAULT_TARGET_WORD_COUNT: u32 = 1000;
const DEFAULT_SUMMARY_CONCURRENCY: usize = 4;
const DEFAULT_LEDGER_PATH: &str = "processed_entries.json";

/// Everything the pipeline needs from the environment. Telegram credentials
/// stay out of here; the notifier reads its own variables and is optional.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub hours_back: u64,
    pub ai_api_key: String,
    pub ai_model: String,
    pub ai_base_url: String,
    pub target_word_count: u32,
    pub summary_concurrency: usize,
    pub ledger_path: PathBuf,
    pub priority_categories: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let db_path = required(ENV_DB_PATH)?.into();
        let ai_api_key = required(ENV_AI_API_KEY)?;
        let ai_model = required(ENV_AI_MODEL)?;
        let ai_base_url = required(ENV_AI_BASE_URL)?;

        Ok(Self {
            db_path,
            hours_back: parsed_or(ENV_HOURS_BACK, DEFAULT_HOURS_BACK),
            ai_api_key,
            ai_model,
            ai_base_url,
            target_word_count: parsed_or(ENV_TARGET_WORD_COUNT, DEFAULT_TARGET_WORD_COUNT),
            summary_concurrency: parsed_or(ENV_SUMMARY_CONCURRENCY, DEFAULT_SUMMARY_CONCURRENCY)
                .max(1),
            ledger_path: std::env::var(ENV_LEDGER_PATH)
                .unwrap_or_else(|_| DEFAULT_LEDGER_PATH.to_string())
                .into(),
            priority_categories: load_priority_categories_default(),
        })
    }
}

fn required(name: &'static str) -> Result<String> {
    let value = std::env::var(name).map_err(|_| anyhow!("missing {name} env var"))?;
    if value.trim().is_empty() {
        return Err(anyhow!("{name} env var is empty"));
    }
    Ok(value)
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(var = name, value = %raw, "unparseable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Category order the stage-2 editor is told to put first. Matches the feed
/// corpus this job was built around; override via the categories file.
pub fn default_priority_categories() -> Vec<String> {
    ["AI and Tech", "PC and Smartphone", "World News"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Load the priority-category list from an explicit path. Supports TOML
/// (`categories = [...]`) or a bare JSON array.
pub fn load_priority_categories_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading categories from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_categories(&content, ext.as_str())
}

/// Load the priority-category list using env var + fallbacks:
/// 1) $DIGEST_CATEGORIES_PATH
/// 2) config/priority_categories.toml
/// 3) config/priority_categories.json
/// 4) the built-in default order
pub fn load_priority_categories_default() -> Vec<String> {
    let loaded = match std::env::var(ENV_CATEGORIES_PATH) {
        Ok(p) => {
            let pb = PathBuf::from(p);
            if pb.exists() {
                load_priority_categories_from(&pb)
            } else {
                Err(anyhow!("{ENV_CATEGORIES_PATH} points to non-existent path"))
            }
        }
        Err(_) => {
            let toml_p = PathBuf::from("config/priority_categories.toml");
            let json_p = PathBuf::from("config/priority_categories.json");
            if toml_p.exists() {
                load_priority_categories_from(&toml_p)
            } else if json_p.exists() {
                load_priority_categories_from(&json_p)
            } else {
                return default_priority_categories();
            }
        }
    };

    match loaded {
        Ok(cats) if !cats.is_empty() => cats,
        Ok(_) => default_priority_categories(),
        Err(e) => {
            warn!(error = %e, "cannot load priority categories, using defaults");
            default_priority_categories()
        }
    }
}

fn parse_categories(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("categories");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported categories format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlCats {
        categories: Vec<String>,
    }
    let v: TomlCats = toml::from_str(s)?;
    Ok(clean_list(v.categories))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim + drop empties + dedup, keeping first-seen order. Order is the whole
/// point of this list, so no sorting.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}
