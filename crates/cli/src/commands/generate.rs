use std::path::Path;

use quoteform_core::config::LoadOptions;
use quoteform_core::cpq::format_money;
use quoteform_core::dispatch::TemplateParams;
use quoteform_core::domain::quote::Quotation;
use quoteform_core::flows::QuoteSession;
use serde_json::{json, Value};

use super::{load_builder, CommandResult, EXIT_REQUEST};
use crate::request::QuotationRequest;

pub fn run(options: &LoadOptions, request_path: &Path) -> CommandResult {
    let session = match prepare("generate", options, request_path) {
        Ok(session) => session,
        Err(failure) => return failure,
    };
    let Some(quotation) = session.quotation() else {
        return CommandResult::failure(
            "generate",
            "request",
            "no quotation was produced",
            EXIT_REQUEST,
        );
    };

    let currency_symbol = session.currency_symbol();
    let message = format!(
        "quotation generated: {} line(s), total {currency_symbol}{}",
        quotation.lines.len(),
        quotation.formatted_total()
    );
    let kind = session.builder().catalog().kind();
    let params = TemplateParams::from_quotation(quotation, kind, currency_symbol);
    CommandResult::success_with("generate", message, Some(quotation_view(quotation, &params)))
}

/// Loads config, catalog, and request, then generates a quotation in a fresh
/// session.
pub(crate) fn prepare(
    command: &str,
    options: &LoadOptions,
    request_path: &Path,
) -> Result<QuoteSession, CommandResult> {
    let (config, builder) = load_builder(command, options)?;
    let request = QuotationRequest::from_file(request_path).map_err(|error| {
        CommandResult::failure(command, "request", error.to_string(), EXIT_REQUEST)
    })?;

    request.into_session(builder, &config.quotation.currency_symbol).map_err(|error| {
        CommandResult::failure(
            command,
            "request",
            format!("{} ({error})", error.notice().message),
            EXIT_REQUEST,
        )
    })
}

fn quotation_view(quotation: &Quotation, params: &TemplateParams) -> Value {
    let lines: Vec<Value> = quotation
        .lines
        .iter()
        .map(|line| {
            json!({
                "name": line.name,
                "category": line.category,
                "variation": line.variation,
                "quantity": line.quantity,
                "unit_price": format_money(line.unit_price),
                "line_total": format_money(line.line_total),
            })
        })
        .collect();

    json!({
        "customer_name": quotation.customer_name,
        "customer_email": quotation.customer_email,
        "lines": lines,
        "total_price": quotation.formatted_total(),
        "notes": quotation.notes,
        "generated_at": quotation.generated_at.to_rfc3339(),
        "template_params": params,
    })
}
