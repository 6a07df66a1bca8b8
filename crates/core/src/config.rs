use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rates::MAX_REFERENCE_VALUE;

pub const DEFAULT_CONFIG_FILE: &str = "renoquote.toml";
pub const NESTED_CONFIG_FILE: &str = "config/renoquote.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub reference: ReferenceConfig,
    pub pricing: PricingConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceConfig {
    /// `None` selects the tables compiled into the binary.
    pub data_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricingConfig {
    pub margin_rate: Decimal,
    pub contingency_rate: Decimal,
    pub permit_fee: Decimal,
    pub vat_type: String,
    pub logic_version: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub reference_data_path: Option<PathBuf>,
    pub output_directory: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub vat_type: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            margin_rate: Decimal::new(20, 2),
            contingency_rate: Decimal::new(15, 2),
            permit_fee: Decimal::new(250, 0),
            vat_type: "reduced".to_string(),
            logic_version: "2.0".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reference: ReferenceConfig::default(),
            pricing: PricingConfig::default(),
            output: OutputConfig { directory: PathBuf::from("output") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(reference) = patch.reference {
            if let Some(data_path) = reference.data_path {
                self.reference.data_path = Some(data_path);
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(margin_rate) = pricing.margin_rate {
                self.pricing.margin_rate = margin_rate;
            }
            if let Some(contingency_rate) = pricing.contingency_rate {
                self.pricing.contingency_rate = contingency_rate;
            }
            if let Some(permit_fee) = pricing.permit_fee {
                self.pricing.permit_fee = permit_fee;
            }
            if let Some(vat_type) = pricing.vat_type {
                self.pricing.vat_type = vat_type;
            }
            if let Some(logic_version) = pricing.logic_version {
                self.pricing.logic_version = logic_version;
            }
        }

        if let Some(output) = patch.output {
            if let Some(directory) = output.directory {
                self.output.directory = directory;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RENOQUOTE_REFERENCE_DATA_PATH") {
            self.reference.data_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("RENOQUOTE_PRICING_MARGIN_RATE") {
            self.pricing.margin_rate = parse_decimal("RENOQUOTE_PRICING_MARGIN_RATE", &value)?;
        }
        if let Some(value) = read_env("RENOQUOTE_PRICING_CONTINGENCY_RATE") {
            self.pricing.contingency_rate =
                parse_decimal("RENOQUOTE_PRICING_CONTINGENCY_RATE", &value)?;
        }
        if let Some(value) = read_env("RENOQUOTE_PRICING_PERMIT_FEE") {
            self.pricing.permit_fee = parse_decimal("RENOQUOTE_PRICING_PERMIT_FEE", &value)?;
        }
        if let Some(value) = read_env("RENOQUOTE_PRICING_VAT_TYPE") {
            self.pricing.vat_type = value;
        }
        if let Some(value) = read_env("RENOQUOTE_PRICING_LOGIC_VERSION") {
            self.pricing.logic_version = value;
        }

        if let Some(value) = read_env("RENOQUOTE_OUTPUT_DIRECTORY") {
            self.output.directory = PathBuf::from(value);
        }

        let log_level =
            read_env("RENOQUOTE_LOGGING_LEVEL").or_else(|| read_env("RENOQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RENOQUOTE_LOGGING_FORMAT").or_else(|| read_env("RENOQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_path) = overrides.reference_data_path {
            self.reference.data_path = Some(data_path);
        }
        if let Some(directory) = overrides.output_directory {
            self.output.directory = directory;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(vat_type) = overrides.vat_type {
            self.pricing.vat_type = vat_type;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_output(&self.output)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `AppConfig::load` would read for these options, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_rate(name: &str, rate: Decimal) -> Result<(), ConfigError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigError::Validation(format!("{name} must be in range 0..=1, got {rate}")));
    }
    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    validate_rate("pricing.margin_rate", pricing.margin_rate)?;
    validate_rate("pricing.contingency_rate", pricing.contingency_rate)?;

    if pricing.permit_fee < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.permit_fee must not be negative".to_string(),
        ));
    }
    if pricing.permit_fee > MAX_REFERENCE_VALUE {
        return Err(ConfigError::Validation(format!(
            "pricing.permit_fee must not exceed {MAX_REFERENCE_VALUE}"
        )));
    }
    if pricing.vat_type.trim().is_empty() {
        return Err(ConfigError::Validation("pricing.vat_type must not be empty".to_string()));
    }
    if pricing.logic_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pricing.logic_version must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation("output.directory must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    reference: Option<ReferencePatch>,
    pricing: Option<PricingPatch>,
    output: Option<OutputPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ReferencePatch {
    data_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    margin_rate: Option<Decimal>,
    contingency_rate: Option<Decimal>,
    permit_fee: Option<Decimal>,
    vat_type: Option<String>,
    logic_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputPatch {
    directory: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
