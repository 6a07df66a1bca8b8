use std::sync::Arc;

use renoquote_core::config::{AppConfig, LoadOptions};
use renoquote_core::pricing::{QuoteEngine, QuoteGenerator};
use renoquote_core::rates::RateTables;
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_REFERENCE_DATA};

const PROBE_TRANSCRIPT: &str =
    "A 4m² bathroom. Remove the old tiles. Budget-conscious. Located in Marseille.";

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

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let (report, exit_code) = build_report(options);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> (DoctorReport, u8) {
    let mut checks = Vec::new();
    let mut exit_code = 0;

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });

            match RateTables::load_or_builtin(config.reference.data_path.as_deref()) {
                Ok(tables) => {
                    checks.push(reference_data_check(&tables, &config));
                    checks.push(probe_quote_check(tables, &config));
                }
                Err(error) => {
                    exit_code = EXIT_REFERENCE_DATA;
                    checks.push(DoctorCheck {
                        name: "reference_data",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(skipped("probe_quote", "reference data did not load"));
                }
            }
        }
        Err(error) => {
            exit_code = EXIT_CONFIG;
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("reference_data", "configuration did not load"));
            checks.push(skipped("probe_quote", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    (DoctorReport { overall_status, summary, checks }, exit_code)
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: format!("skipped because {reason}"),
    }
}

fn reference_data_check(tables: &RateTables, config: &AppConfig) -> DoctorCheck {
    if !tables.vat().contains(&config.pricing.vat_type) {
        return DoctorCheck {
            name: "reference_data",
            status: CheckStatus::Fail,
            details: format!(
                "vat type `{}` is not defined in `{}`; the standard rate would apply",
                config.pricing.vat_type,
                tables.origin()
            ),
        };
    }

    DoctorCheck {
        name: "reference_data",
        status: CheckStatus::Pass,
        details: format!(
            "loaded `{}` ({} materials, {} labor tasks, {} keyword tasks)",
            tables.origin(),
            tables.materials().len(),
            tables.labor().len(),
            tables.parser().known_tasks().count()
        ),
    }
}

fn probe_quote_check(tables: RateTables, config: &AppConfig) -> DoctorCheck {
    let engine = QuoteEngine::new(Arc::new(tables), config.pricing.clone());
    let quote = engine.generate(PROBE_TRANSCRIPT);

    if quote.quote_details.is_empty() {
        return DoctorCheck {
            name: "probe_quote",
            status: CheckStatus::Fail,
            details: "probe transcript matched no tasks".to_string(),
        };
    }

    DoctorCheck {
        name: "probe_quote",
        status: CheckStatus::Pass,
        details: format!(
            "probe quote priced {} task(s), final total {}",
            quote.quote_details.len(),
            quote.cost_summary.final_total_price
        ),
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
