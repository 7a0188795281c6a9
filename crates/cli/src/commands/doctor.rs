use quoteform_core::config::{AppConfig, LoadOptions};
use quoteform_core::cpq::Catalog;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_email_credentials(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog", "email_credentials"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    // Missing credentials only block `send`, so they do not fail the report.
    let all_pass = checks.iter().all(|check| {
        check.status == CheckStatus::Pass
            || (check.name == "email_credentials" && check.status == CheckStatus::Skipped)
    });
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    let quotation = &config.quotation;
    match Catalog::load(quotation.schema, quotation.catalog_path.as_deref()) {
        Ok(catalog) => {
            let source = quotation
                .catalog_path
                .as_ref()
                .map(|path| format!("`{}`", path.display()))
                .unwrap_or_else(|| "builtin".to_string());
            DoctorCheck {
                name: "catalog",
                status: CheckStatus::Pass,
                details: format!("{:?} catalog loaded from {source}", catalog.kind()),
            }
        }
        Err(error) => {
            DoctorCheck { name: "catalog", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_email_credentials(config: &AppConfig) -> DoctorCheck {
    match config.email.require_complete() {
        Ok(()) => DoctorCheck {
            name: "email_credentials",
            status: CheckStatus::Pass,
            details: format!("credentials present for `{}`", config.email.endpoint),
        },
        Err(error) => DoctorCheck {
            name: "email_credentials",
            status: CheckStatus::Skipped,
            details: format!("send is unavailable: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
