use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use quoteform_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use super::CommandResult;

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("config", &error),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let email = &config.email;
    let quotation = &config.quotation;
    let catalog_path = quotation
        .catalog_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<builtin>".to_string());
    let private_key = email.private_key.as_ref().map(redact_secret);

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: String, env_keys: &[&str]| {
        lines.push(render_line(key, &value, source(key, env_keys)));
    };

    push("email.service_id", or_unset(&email.service_id), &["QUOTEFORM_EMAIL_SERVICE_ID"]);
    push("email.template_id", or_unset(&email.template_id), &["QUOTEFORM_EMAIL_TEMPLATE_ID"]);
    push("email.public_key", redact_secret(&email.public_key), &["QUOTEFORM_EMAIL_PUBLIC_KEY"]);
    push(
        "email.private_key",
        private_key.unwrap_or_else(|| "<unset>".to_string()),
        &["QUOTEFORM_EMAIL_PRIVATE_KEY"],
    );
    push("email.endpoint", email.endpoint.clone(), &["QUOTEFORM_EMAIL_ENDPOINT"]);
    push("quotation.schema", format!("{:?}", quotation.schema), &["QUOTEFORM_QUOTATION_SCHEMA"]);
    push(
        "quotation.currency_symbol",
        quotation.currency_symbol.clone(),
        &["QUOTEFORM_QUOTATION_CURRENCY_SYMBOL"],
    );
    push(
        "quotation.rounding",
        format!("{:?}", quotation.rounding),
        &["QUOTEFORM_QUOTATION_ROUNDING"],
    );
    push("quotation.catalog_path", catalog_path, &["QUOTEFORM_QUOTATION_CATALOG_PATH"]);
    push(
        "logging.level",
        config.logging.level.clone(),
        &["QUOTEFORM_LOGGING_LEVEL", "QUOTEFORM_LOG_LEVEL"],
    );
    push(
        "logging.format",
        format!("{:?}", config.logging.format),
        &["QUOTEFORM_LOGGING_FORMAT", "QUOTEFORM_LOG_FORMAT"],
    );

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    ["quoteform.toml", "config/quoteform.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
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
    // Blank variables are ignored by the loader, so they are not a source either.
    let env_key = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
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

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

/// Keeps a short prefix so operators can tell keys apart without exposing them.
fn redact_secret(secret: &SecretString) -> String {
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<unset>".to_string();
    }

    match trimmed.get(..4) {
        Some(prefix) if trimmed.len() > 8 => format!("{prefix}***"),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn redaction_never_prints_whole_key() {
        assert_eq!(redact_secret(&SecretString::from("pk_live_123456789")), "pk_l***");
        assert_eq!(redact_secret(&SecretString::from("short")), "<redacted>");
        assert_eq!(redact_secret(&SecretString::from("  ")), "<unset>");
    }

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: Value = "[email]\nservice_id = \"svc\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "email.service_id"));
        assert!(!contains_path(&doc, "email.template_id"));
        assert!(!contains_path(&doc, "quotation.schema"));
    }
}
