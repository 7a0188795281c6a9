//! EmailJS delivery for generated quotations.
//!
//! One [`EmailJsDispatcher::send`] call is one POST to the EmailJS REST API.
//! There is no retry and no timeout beyond the HTTP client's defaults.

use async_trait::async_trait;
use quoteform_core::config::EmailConfig;
use quoteform_core::dispatch::{EmailDispatcher, TemplateParams};
use quoteform_core::errors::DispatchError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error};

pub const SEND_PATH: &str = "/api/v1.0/email/send";

#[derive(Clone, Debug)]
pub struct EmailJsDispatcher {
    client: Client,
    endpoint: String,
    service_id: String,
    template_id: String,
    public_key: SecretString,
    private_key: Option<SecretString>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a TemplateParams,
}

impl EmailJsDispatcher {
    pub fn new(config: &EmailConfig) -> Result<Self, DispatchError> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &EmailConfig) -> Result<Self, DispatchError> {
        config
            .require_complete()
            .map_err(|error| DispatchError::NotConfigured(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            service_id: config.service_id.clone(),
            template_id: config.template_id.clone(),
            public_key: config.public_key.clone(),
            private_key: config.private_key.clone(),
        })
    }

    pub fn send_url(&self) -> String {
        format!("{}{SEND_PATH}", self.endpoint)
    }
}

#[async_trait]
impl EmailDispatcher for EmailJsDispatcher {
    async fn send(&self, params: &TemplateParams) -> Result<(), DispatchError> {
        let body = SendRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: self.public_key.expose_secret(), // ubs:ignore
            access_token: self.private_key.as_ref().map(|key| key.expose_secret()), // ubs:ignore
            template_params: params,
        };

        let url = self.send_url();
        debug!(
            event_name = "email.emailjs.request",
            service_id = %self.service_id,
            template_id = %self.template_id,
            params = params.len(),
            "posting quotation to emailjs"
        );

        let response = self.client.post(&url).json(&body).send().await.map_err(|error| {
            error!(error = %error, "emailjs request failed");
            DispatchError::Transport(error.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        error!(status = %status, message = %message, "emailjs rejected the quotation email");
        Err(DispatchError::Rejected {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}
