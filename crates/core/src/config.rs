use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpq::catalog::CatalogKind;
use crate::cpq::pricing::TotalRounding;
use crate::dispatch::DEFAULT_CURRENCY_SYMBOL;

pub const DEFAULT_EMAIL_ENDPOINT: &str = "https://api.emailjs.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub email: EmailConfig,
    pub quotation: QuotationConfig,
    pub logging: LoggingConfig,
}

/// Credentials for the hosted email provider. Only `send` needs them.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: SecretString,
    pub private_key: Option<SecretString>,
    pub endpoint: String,
}

#[derive(Clone, Debug)]
pub struct QuotationConfig {
    pub schema: CatalogKind,
    pub currency_symbol: String,
    pub rounding: TotalRounding,
    pub catalog_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
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

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub schema: Option<CatalogKind>,
    pub currency_symbol: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub email_service_id: Option<String>,
    pub email_template_id: Option<String>,
    pub email_public_key: Option<String>,
    pub email_endpoint: Option<String>,
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

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            email: EmailConfig {
                service_id: String::new(),
                template_id: String::new(),
                public_key: String::new().into(),
                private_key: None,
                endpoint: DEFAULT_EMAIL_ENDPOINT.to_string(),
            },
            quotation: QuotationConfig {
                schema: CatalogKind::Categorized,
                currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
                rounding: TotalRounding::WholeSum,
                catalog_path: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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

impl EmailConfig {
    /// Fails when any credential needed for a send is missing.
    pub fn require_complete(&self) -> Result<(), ConfigError> {
        let missing = [
            ("email.service_id", self.service_id.trim().is_empty()),
            ("email.template_id", self.template_id.trim().is_empty()),
            ("email.public_key", self.public_key.expose_secret().trim().is_empty()), // ubs:ignore
        ]
        .into_iter()
        .filter_map(|(key, missing)| missing.then_some(key))
        .collect::<Vec<_>>();

        if missing.is_empty() {
            return Ok(());
        }
        Err(ConfigError::Validation(format!(
            "{} required to send email. Find them in the EmailJS dashboard (Email Services, Email Templates, Account > API keys)",
            missing.join(", ")
        )))
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("quoteform.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(email) = patch.email {
            if let Some(service_id) = email.service_id {
                self.email.service_id = service_id;
            }
            if let Some(template_id) = email.template_id {
                self.email.template_id = template_id;
            }
            if let Some(public_key_value) = email.public_key {
                self.email.public_key = secret_value(public_key_value); // ubs:ignore
            }
            if let Some(private_key_value) = email.private_key {
                self.email.private_key = Some(secret_value(private_key_value)); // ubs:ignore
            }
            if let Some(endpoint) = email.endpoint {
                self.email.endpoint = endpoint;
            }
        }

        if let Some(quotation) = patch.quotation {
            if let Some(schema) = quotation.schema {
                self.quotation.schema = schema;
            }
            if let Some(currency_symbol) = quotation.currency_symbol {
                self.quotation.currency_symbol = currency_symbol;
            }
            if let Some(rounding) = quotation.rounding {
                self.quotation.rounding = rounding;
            }
            if let Some(catalog_path) = quotation.catalog_path {
                self.quotation.catalog_path = Some(catalog_path);
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
        if let Some(value) = read_env("QUOTEFORM_EMAIL_SERVICE_ID") {
            self.email.service_id = value;
        }
        if let Some(value) = read_env("QUOTEFORM_EMAIL_TEMPLATE_ID") {
            self.email.template_id = value;
        }
        if let Some(value) = read_env("QUOTEFORM_EMAIL_PUBLIC_KEY") {
            self.email.public_key = secret_value(value); // ubs:ignore
        }
        if let Some(value) = read_env("QUOTEFORM_EMAIL_PRIVATE_KEY") {
            self.email.private_key = Some(secret_value(value)); // ubs:ignore
        }
        if let Some(value) = read_env("QUOTEFORM_EMAIL_ENDPOINT") {
            self.email.endpoint = value;
        }

        if let Some(value) = read_env("QUOTEFORM_QUOTATION_SCHEMA") {
            self.quotation.schema = parse_with("QUOTEFORM_QUOTATION_SCHEMA", &value)?;
        }
        if let Some(value) = read_env("QUOTEFORM_QUOTATION_CURRENCY_SYMBOL") {
            self.quotation.currency_symbol = value;
        }
        if let Some(value) = read_env("QUOTEFORM_QUOTATION_ROUNDING") {
            self.quotation.rounding = parse_with("QUOTEFORM_QUOTATION_ROUNDING", &value)?;
        }
        if let Some(value) = read_env("QUOTEFORM_QUOTATION_CATALOG_PATH") {
            self.quotation.catalog_path = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("QUOTEFORM_LOGGING_LEVEL").or_else(|| read_env("QUOTEFORM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUOTEFORM_LOGGING_FORMAT").or_else(|| read_env("QUOTEFORM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(schema) = overrides.schema {
            self.quotation.schema = schema;
        }
        if let Some(currency_symbol) = overrides.currency_symbol {
            self.quotation.currency_symbol = currency_symbol;
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.quotation.catalog_path = Some(catalog_path);
        }
        if let Some(service_id) = overrides.email_service_id {
            self.email.service_id = service_id;
        }
        if let Some(template_id) = overrides.email_template_id {
            self.email.template_id = template_id;
        }
        if let Some(public_key) = overrides.email_public_key {
            self.email.public_key = secret_value(public_key); // ubs:ignore
        }
        if let Some(endpoint) = overrides.email_endpoint {
            self.email.endpoint = endpoint;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_email(&self.email)?;
        validate_quotation(&self.quotation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quoteform.toml"), PathBuf::from("config/quoteform.toml")]
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

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    let endpoint = email.endpoint.trim();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "email.endpoint must start with http:// or https://".to_string(),
        ));
    }

    let has_private = email
        .private_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().trim().is_empty()); // ubs:ignore
    if has_private && email.public_key.expose_secret().trim().is_empty() { // ubs:ignore
        return Err(ConfigError::Validation(
            "email.private_key is set but email.public_key is missing".to_string(),
        ));
    }

    Ok(())
}

fn validate_quotation(quotation: &QuotationConfig) -> Result<(), ConfigError> {
    if quotation.currency_symbol.trim().is_empty() {
        return Err(ConfigError::Validation(
            "quotation.currency_symbol must not be empty".to_string(),
        ));
    }

    if let Some(path) = &quotation.catalog_path {
        if !path.exists() {
            return Err(ConfigError::Validation(format!(
                "quotation.catalog_path `{}` does not exist",
                path.display()
            )));
        }
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

fn parse_with<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    value.parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    email: Option<EmailPatch>,
    quotation: Option<QuotationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    service_id: Option<String>,
    template_id: Option<String>,
    public_key: Option<String>,
    private_key: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotationPatch {
    schema: Option<CatalogKind>,
    currency_symbol: Option<String>,
    rounding: Option<TotalRounding>,
    catalog_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
// ubs:ignore
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::cpq::catalog::CatalogKind;
    use crate::cpq::pricing::TotalRounding;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const EMAIL_VARS: &[&str] = &[
        "QUOTEFORM_EMAIL_SERVICE_ID",
        "QUOTEFORM_EMAIL_TEMPLATE_ID",
        "QUOTEFORM_EMAIL_PUBLIC_KEY",
        "QUOTEFORM_EMAIL_PRIVATE_KEY",
        "QUOTEFORM_EMAIL_ENDPOINT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_need_no_file_or_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(EMAIL_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.quotation.schema == CatalogKind::Categorized, "default schema")?;
        ensure(config.quotation.currency_symbol == "£", "default currency is pounds")?;
        ensure(config.quotation.rounding == TotalRounding::WholeSum, "default rounding")?;
        ensure(config.email.require_complete().is_err(), "credentials are not set by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_EMAILJS_PUBLIC_KEY", "pk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("quoteform.toml");
            fs::write(
                &path,
                r#"
[email]
service_id = "service_test"
template_id = "template_test"
public_key = "${TEST_EMAILJS_PUBLIC_KEY}" # ubs:ignore

[quotation]
schema = "variations"
rounding = "per_line"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.email.public_key.expose_secret() == "pk-from-env",
                "public key should be loaded from environment",
            )?;
            ensure(config.email.require_complete().is_ok(), "all credentials present")?;
            ensure(config.quotation.schema == CatalogKind::Variations, "schema from file")?;
            ensure(config.quotation.rounding == TotalRounding::PerLine, "rounding from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_EMAILJS_PUBLIC_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEFORM_EMAIL_SERVICE_ID", "service_from_env");
        env::set_var("QUOTEFORM_QUOTATION_CURRENCY_SYMBOL", "€");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("quoteform.toml");
            fs::write(
                &path,
                r#"
[email]
service_id = "service_from_file"
template_id = "template_from_file"

[quotation]
currency_symbol = "$"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    email_template_id: Some("template_from_override".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.email.service_id == "service_from_env", "env should win over file")?;
            ensure(
                config.email.template_id == "template_from_override",
                "override should win over file",
            )?;
            ensure(config.quotation.currency_symbol == "€", "env currency should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["QUOTEFORM_EMAIL_SERVICE_ID", "QUOTEFORM_QUOTATION_CURRENCY_SYMBOL"]);
        result
    }

    #[test]
    fn invalid_endpoint_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEFORM_EMAIL_ENDPOINT", "api.emailjs.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("email.endpoint")
            );
            ensure(has_message, "validation failure should mention email.endpoint")
        })();

        clear_vars(&["QUOTEFORM_EMAIL_ENDPOINT"]);
        result
    }

    #[test]
    fn invalid_schema_env_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEFORM_QUOTATION_SCHEMA", "matrix");
        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "QUOTEFORM_QUOTATION_SCHEMA", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid schema to fail".to_string()),
        };

        clear_vars(&["QUOTEFORM_QUOTATION_SCHEMA"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEFORM_EMAIL_PUBLIC_KEY", "pk-secret-value");
        env::set_var("QUOTEFORM_EMAIL_PRIVATE_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("pk-secret-value"), "debug output should not contain key")?;
            ensure(!debug.contains("sk-secret-value"), "debug output should not contain key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["QUOTEFORM_EMAIL_PUBLIC_KEY", "QUOTEFORM_EMAIL_PRIVATE_KEY"]);
        result
    }
}
