use std::path::Path;

use quoteform_core::config::{AppConfig, LoadOptions};
use quoteform_email::EmailJsDispatcher;
use tracing::info;

use super::generate::prepare;
use super::{CommandResult, EXIT_CONFIG, EXIT_DISPATCH};

pub fn run(options: &LoadOptions, request_path: &Path) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("send", &error),
    };
    if let Err(error) = config.email.require_complete() {
        return CommandResult::config_failure("send", &error);
    }
    let dispatcher = match EmailJsDispatcher::new(&config.email) {
        Ok(dispatcher) => dispatcher,
        Err(error) => {
            return CommandResult::failure("send", "dispatch", error.to_string(), EXIT_CONFIG);
        }
    };

    let mut session = match prepare("send", options, request_path) {
        Ok(session) => session,
        Err(failure) => return failure,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "send",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    info!(event_name = "cli.send.started", endpoint = %dispatcher.send_url(), "sending quotation");
    match runtime.block_on(session.send(&dispatcher)) {
        Ok(notice) => CommandResult::success("send", notice.message),
        Err(error) => {
            CommandResult::failure("send", "dispatch", error.notice().message, EXIT_DISPATCH)
        }
    }
}
