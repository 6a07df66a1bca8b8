use std::fs;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use renoquote_core::{
    apply_feedback, FeedbackInput, PricingConfig, QualityTier, QuoteEngine, QuoteGenerator,
    RateTables, ReferenceDataError,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

fn builtin_engine() -> QuoteEngine {
    QuoteEngine::new(
        Arc::new(RateTables::builtin().expect("builtin reference data is valid")),
        PricingConfig::default(),
    )
}

#[test]
fn reference_budget_scenario_breaks_down_to_1034() {
    let quote = builtin_engine().generate(
        "A 4m² bathroom. Remove the old tiles. Budget-conscious. Located in Marseille.",
    );

    assert_eq!(quote.quote_details.len(), 1);
    let line = &quote.quote_details[0];
    assert_eq!(line.group, "Demolition");
    assert_eq!(line.task_name, "Remove Tiles");
    assert_eq!(line.labor.cost, Decimal::new(450, 0));

    let summary = &quote.cost_summary;
    assert_eq!(summary.subtotal, Decimal::new(500, 0));
    assert_eq!(summary.margin_amount, Decimal::new(100, 0));
    assert_eq!(summary.contingency_amount, Decimal::new(90, 0));
    assert_eq!(summary.permit_fee, Decimal::new(250, 0));
    assert_eq!(summary.total_before_vat, Decimal::new(940, 0));
    assert_eq!(summary.vat_amount, Decimal::new(94, 0));
    assert_eq!(summary.final_total_price, Decimal::new(1034, 0));
    assert!(quote.metadata.error_flags.is_empty());
}

#[test]
fn multi_task_transcript_lists_tasks_in_id_order() {
    let quote = builtin_engine().generate(
        "Luxury 6 m2 bathroom in Lyon. Please repaint the walls, install a new vanity, \
         lay new tiles and replace the toilet. Located in Lyon.",
    );

    let ids: Vec<String> = quote
        .quote_details
        .iter()
        .map(|line| format!("{}.{}", line.group, line.task_name))
        .collect();
    assert_eq!(
        ids,
        vec![
            "Finishing.Repaint Walls",
            "Installation.Install Vanity",
            "Installation.Lay Floor Tiles",
            "Plumbing.Install Toilet",
        ]
    );
    assert_eq!(quote.client_request_summary.requested_quality, QualityTier::Premium);
    assert_eq!(quote.client_request_summary.parsed_city, "Lyon");
    assert_eq!(quote.client_request_summary.parsed_area_sqm, Decimal::new(6, 0));
}

#[test]
fn budget_keyword_wins_over_premium() {
    let quote = builtin_engine()
        .generate("Premium look but budget-conscious please, 5m², remove the tiles.");

    assert_eq!(quote.client_request_summary.requested_quality, QualityTier::Budget);
}

#[test]
fn unknown_city_prices_labor_at_base_rate() {
    let quote = builtin_engine()
        .generate("A 4m² bathroom. Remove the old tiles. Located in Bordeaux.");

    assert_eq!(quote.client_request_summary.parsed_city, "Bordeaux");
    assert_eq!(quote.quote_details[0].labor.cost, Decimal::new(450, 0));
}

#[test]
fn empty_transcript_is_quoted_with_warnings() {
    let quote = builtin_engine().generate("");

    assert!(quote.quote_details.is_empty());
    assert_eq!(quote.cost_summary.final_total_price, Decimal::ZERO);
    assert_eq!(quote.metadata.confidence_score, 0.5);
    assert!(quote.metadata.error_flags.iter().any(|flag| flag.contains("area")));
    assert!(quote.metadata.error_flags.iter().any(|flag| flag.contains("no tasks")));
}

#[test]
fn oversized_area_is_quoted_at_default_area() {
    let engine = builtin_engine();

    let quote = engine.generate("A 9999999999999999999999999999m² hall. Remove the old tiles.");
    assert_eq!(quote.client_request_summary.parsed_area_sqm, Decimal::new(4, 0));
    assert_eq!(quote.metadata.error_flags, vec!["stated area is out of range, using default"]);
    assert_eq!(quote.metadata.confidence_score, 0.75);
    assert_eq!(quote.quote_details.len(), 1);

    let largest = engine.generate(
        "A 1000000 m² warehouse. Remove the old tiles, lay new tiles and repaint the walls. \
         Luxury finish. Located in Paris.",
    );
    assert_eq!(largest.client_request_summary.parsed_area_sqm, Decimal::new(1_000_000, 0));
    assert!(largest.metadata.error_flags.is_empty());
    assert!(largest.cost_summary.final_total_price > Decimal::ZERO);
}

#[test]
fn regenerating_at_same_instant_is_identical() {
    let engine = builtin_engine();
    let at = Utc.with_ymd_and_hms(2026, 3, 2, 17, 45, 12).single().expect("valid timestamp");
    let transcript = "8m² bathroom, redo the plumbing and paint the walls. Located in Paris.";

    let first = engine.generate_at(transcript, at);
    let second = engine.generate_at(transcript, at);

    assert_eq!(first, second);
    assert_eq!(first.project_id.0, "PROJ-20260302-174512");
}

#[test]
fn quote_json_uses_numeric_money_and_string_labels() {
    let quote = builtin_engine().generate(
        "A 4m² bathroom. Remove the old tiles. Premium quality. Located in Paris.",
    );
    let json: Value = serde_json::to_value(&quote).expect("quote serializes");

    assert_eq!(json["client_request_summary"]["requested_quality"], "premium");
    assert_eq!(json["cost_summary"]["margin_applied"], "20%");
    assert_eq!(json["cost_summary"]["vat_rate_type"], "reduced");
    let total = json["cost_summary"]["final_total_price"].as_f64().expect("numeric total");
    assert!((total - 1204.78).abs() < 1e-9);
    assert!(json["metadata"]["feedback_applied"].is_null());
}

#[test]
fn saved_quote_round_trips_through_feedback() {
    let quote = builtin_engine().generate("5m²: replace the toilet. Located in Marseille.");
    let raw = serde_json::to_string_pretty(&quote).expect("quote serializes");
    let restored = serde_json::from_str(&raw).expect("quote deserializes");

    let corrected = apply_feedback(
        &restored,
        FeedbackInput { notes: "client supplies toilet".to_string(), corrected_total: Decimal::new(500, 0) },
    )
    .expect("feedback applies");

    let record = corrected.metadata.feedback_applied.expect("feedback recorded");
    assert_eq!(record.original_price, quote.cost_summary.final_total_price);
    assert_eq!(corrected.cost_summary.final_total_price, Decimal::new(500, 0));
}

#[test]
fn custom_reference_file_drives_pricing() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("reference.json");
    fs::write(
        &path,
        r#"{
  "vat_rates": { "reduced": 0.0 },
  "hourly_rates": { "medium": 50.0 },
  "city_multipliers": { "Nice": 2.0 },
  "labor": { "finishing.oil_deck": { "base_time": 2.0, "time_per_sqm": 0.5 } },
  "task_rules": [ { "task": "finishing.oil_deck", "patterns": ["oil.*deck"] } ]
}"#,
    )
    .expect("write fixture");

    let tables = RateTables::load(&path).expect("custom tables load");
    let engine = QuoteEngine::new(
        Arc::new(tables),
        PricingConfig {
            margin_rate: Decimal::ZERO,
            contingency_rate: Decimal::ZERO,
            permit_fee: Decimal::ZERO,
            ..PricingConfig::default()
        },
    );

    let quote = engine.generate("Please oil the deck, 4 sqm. Located in Nice.");
    // (2 + 0.5 * 4) h * 50 * 2.0
    assert_eq!(quote.cost_summary.final_total_price, Decimal::new(400, 0));
}

#[test]
fn malformed_reference_file_fails_at_load() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("reference.toml");
    fs::write(&path, "[vat_rates]\nreduced = 1.5\n").expect("write fixture");

    let error = RateTables::load(&path).expect_err("out-of-range rate must fail");
    assert!(matches!(error, ReferenceDataError::Validation { .. }));

    let missing = RateTables::load(&dir.path().join("absent.toml")).expect_err("missing file");
    assert!(matches!(missing, ReferenceDataError::ReadFile { .. }));
}
