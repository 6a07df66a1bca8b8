pub mod config;
pub mod doctor;
pub mod feedback;
pub mod generate;

use renoquote_core::config::{AppConfig, LoadOptions};
use renoquote_core::errors::ApplicationError;
use renoquote_core::rates::RateTables;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_REFERENCE_DATA: u8 = 3;
pub const EXIT_INPUT: u8 = 4;
pub const EXIT_OUTPUT: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success_with_details(
        command: &str,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            details,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Raw command output, e.g. a quote document printed to stdout.
    pub fn raw(output: String) -> Self {
        Self { exit_code: 0, output }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let (error_class, exit_code) = classify(&error);
        let detail = error.to_string();
        let interface = error.into_interface(Uuid::new_v4().to_string());

        warn!(
            event_name = "cli.command.failed",
            command,
            error_class,
            correlation_id = %interface.correlation_id(),
            error = %detail,
            "command failed"
        );

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: format!("{} {detail}", interface.user_message()),
            correlation_id: Some(interface.correlation_id().to_string()),
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn classify(error: &ApplicationError) -> (&'static str, u8) {
    match error {
        ApplicationError::Configuration(_) => ("config_validation", EXIT_CONFIG),
        ApplicationError::ReferenceData(_) => ("reference_data", EXIT_REFERENCE_DATA),
        ApplicationError::Domain(_) | ApplicationError::Input(_) => ("invalid_input", EXIT_INPUT),
        ApplicationError::Persistence(_) => ("output_write", EXIT_OUTPUT),
    }
}

pub(crate) fn load_config(options: LoadOptions) -> Result<AppConfig, ApplicationError> {
    Ok(AppConfig::load(options)?)
}

pub(crate) fn load_tables(config: &AppConfig) -> Result<RateTables, ApplicationError> {
    Ok(RateTables::load_or_builtin(config.reference.data_path.as_deref())?)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
