pub mod catalog;
pub mod config;
pub mod doctor;
pub mod generate;
pub mod send;

use quoteform_core::config::{AppConfig, ConfigError, LoadOptions};
use quoteform_core::cpq::{Catalog, CatalogError, QuotationBuilder};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_DISPATCH: u8 = 3;
pub const EXIT_REQUEST: u8 = 4;

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
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, None)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
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
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn config_failure(command: &str, error: &ConfigError) -> Self {
        Self::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    }

    pub fn catalog_failure(command: &str, error: &CatalogError) -> Self {
        Self::failure(command, "catalog", error.to_string(), EXIT_CONFIG)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads configuration and the configured catalog, or the command failure to
/// report instead.
pub(crate) fn load_builder(
    command: &str,
    options: &LoadOptions,
) -> Result<(AppConfig, QuotationBuilder), CommandResult> {
    let config = AppConfig::load(options.clone())
        .map_err(|error| CommandResult::config_failure(command, &error))?;
    let catalog =
        Catalog::load(config.quotation.schema, config.quotation.catalog_path.as_deref())
            .map_err(|error| CommandResult::catalog_failure(command, &error))?;
    let builder = QuotationBuilder::new(catalog).with_rounding(config.quotation.rounding);
    Ok((config, builder))
}
