use std::env;
use std::fs;
use std::path::Path;

use renoquote_core::config::{resolve_config_path, AppConfig, ConfigOverrides, LoadOptions};
use renoquote_core::errors::ApplicationError;
use toml::Value;

use crate::commands::CommandResult;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    flag: Option<&'static str>,
    value: String,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let overridden = overridden_flags(&options.overrides);
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::from_application_error(
                "config",
                ApplicationError::from(error),
            )
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    for field in fields(&config) {
        if let Some(flag) = field.flag.filter(|flag| overridden.contains(flag)) {
            lines.push(render_line(field.key, &field.value, format!("flag ({flag})")));
            continue;
        }
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::raw(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key: "reference.data_path",
            env_keys: &["RENOQUOTE_REFERENCE_DATA_PATH"],
            flag: Some("--reference-data"),
            value: config
                .reference
                .data_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<builtin>".to_string()),
        },
        Field {
            key: "pricing.margin_rate",
            env_keys: &["RENOQUOTE_PRICING_MARGIN_RATE"],
            flag: None,
            value: config.pricing.margin_rate.to_string(),
        },
        Field {
            key: "pricing.contingency_rate",
            env_keys: &["RENOQUOTE_PRICING_CONTINGENCY_RATE"],
            flag: None,
            value: config.pricing.contingency_rate.to_string(),
        },
        Field {
            key: "pricing.permit_fee",
            env_keys: &["RENOQUOTE_PRICING_PERMIT_FEE"],
            flag: None,
            value: config.pricing.permit_fee.to_string(),
        },
        Field {
            key: "pricing.vat_type",
            env_keys: &["RENOQUOTE_PRICING_VAT_TYPE"],
            flag: Some("--vat-type"),
            value: config.pricing.vat_type.clone(),
        },
        Field {
            key: "pricing.logic_version",
            env_keys: &["RENOQUOTE_PRICING_LOGIC_VERSION"],
            flag: None,
            value: config.pricing.logic_version.clone(),
        },
        Field {
            key: "output.directory",
            env_keys: &["RENOQUOTE_OUTPUT_DIRECTORY"],
            flag: Some("--output-dir"),
            value: config.output.directory.display().to_string(),
        },
        Field {
            key: "logging.level",
            env_keys: &["RENOQUOTE_LOGGING_LEVEL", "RENOQUOTE_LOG_LEVEL"],
            flag: Some("--log-level"),
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["RENOQUOTE_LOGGING_FORMAT", "RENOQUOTE_LOG_FORMAT"],
            flag: Some("--log-format"),
            value: config.logging.format.as_str().to_string(),
        },
    ]
}

fn overridden_flags(overrides: &ConfigOverrides) -> Vec<&'static str> {
    [
        ("--reference-data", overrides.reference_data_path.is_some()),
        ("--output-dir", overrides.output_directory.is_some()),
        ("--vat-type", overrides.vat_type.is_some()),
        ("--log-level", overrides.log_level.is_some()),
        ("--log-format", overrides.log_format.is_some()),
    ]
    .into_iter()
    .filter_map(|(flag, set)| set.then_some(flag))
    .collect()
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys
        .iter()
        .find(|env_key| env::var(env_key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
