use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 4] = ["max_tokens", "total_tokens", "token_count", "tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("VERBA_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config merged with the secrets overlay, as a raw value tree.
    pub fn load_value(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    /// Typed settings: merged files, then the `VERBA_API_KEY` env override,
    /// then validation.
    pub fn load_settings(&self) -> Result<Settings, ApiError> {
        let merged = self.load_value();
        let mut settings: Settings =
            serde_json::from_value(merged).map_err(|e| ApiError::BadRequest(e.to_string()))?;

        if let Ok(key) = env::var("VERBA_API_KEY") {
            if !key.trim().is_empty() {
                settings.llm.api_key = key;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn redacted_settings(&self, settings: &Settings) -> Value {
        let value = serde_json::to_value(settings).unwrap_or(Value::Null);
        redact_sensitive_values(&value)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    if SENSITIVE_WHITELIST.iter().any(|safe| lowered == *safe) {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, entry) in map {
                if is_sensitive_key(key) && entry.is_string() {
                    let is_empty = entry.as_str().map(str::is_empty).unwrap_or(false);
                    let replacement = if is_empty {
                        Value::String(String::new())
                    } else {
                        Value::String(REDACT_PLACEHOLDER.to_string())
                    };
                    redacted.insert(key.clone(), replacement);
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(entry));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_overlays_nested_keys() {
        let base = json!({ "llm": { "base_url": "http://a", "api_key": "" }, "rag": {} });
        let overlay = json!({ "llm": { "api_key": "k" } });
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged["llm"]["base_url"], "http://a");
        assert_eq!(merged["llm"]["api_key"], "k");
    }

    #[test]
    fn redacts_key_like_fields_only() {
        let value = json!({ "api_key": "secret-value", "max_tokens": "512", "nested": { "password": "p" } });
        let redacted = redact_sensitive_values(&value);
        assert_eq!(redacted["api_key"], REDACT_PLACEHOLDER);
        assert_eq!(redacted["max_tokens"], "512");
        assert_eq!(redacted["nested"]["password"], REDACT_PLACEHOLDER);
    }

    #[test]
    fn empty_secrets_stay_empty_after_redaction() {
        let value = json!({ "api_key": "" });
        let redacted = redact_sensitive_values(&value);
        assert_eq!(redacted["api_key"], "");
    }
}
