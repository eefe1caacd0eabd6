//! WebAssembly module for the Ant Defoliation Monitor
//!
//! Provides client-side computation for:
//! - Defoliation threshold from canopy cover values
//! - Point classification
//! - Defoliation percentage of a stand
//! - Recommendation buckets
//! - Offline data validation

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::DefoliationThreshold;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("ant defoliation monitor wasm ready"));
}

/// Canopy cover below which a point is defoliated, from a JSON array of values
#[wasm_bindgen]
pub fn defoliation_threshold(values_json: &str, quantile: f64) -> Result<f64, JsValue> {
    validate_quantile(quantile).map_err(JsValue::from_str)?;
    let values: Vec<f64> = serde_json::from_str(values_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid values JSON: {}", e)))?;
    if let Some(bad) = values.iter().find(|v| validate_canopy_cover(**v).is_err()) {
        return Err(JsValue::from_str(&format!("Invalid canopy cover: {}", bad)));
    }
    shared::quantile(&values, quantile).ok_or_else(|| JsValue::from_str("No canopy cover values"))
}

/// "Desfolha" or "Saudavel" for a point against a threshold
#[wasm_bindgen]
pub fn canopy_status(canopy_cover: f64, threshold: f64) -> String {
    let threshold = DefoliationThreshold {
        quantile: shared::DEFAULT_QUANTILE,
        canopy_cover: threshold,
    };
    threshold.status_of(canopy_cover).to_string()
}

/// Defoliated share of a stand, rounded to one decimal; `None` without area
#[wasm_bindgen]
pub fn defoliation_percentage(defoliated_points: u32, total_area_ha: f64) -> Option<f64> {
    let total = shared::measured_area(total_area_ha);
    let defoliated = shared::defoliated_area_ha(defoliated_points as u64, total);
    shared::defoliation_percentage(defoliated, total).and_then(|p| p.to_f64())
}

/// Recommendation label for a monthly average and the change since the previous date
#[wasm_bindgen]
pub fn recommendation_bucket(monthly_average: f64, percentage_delta: Option<f64>) -> Option<String> {
    let average = Decimal::from_f64(monthly_average).map(shared::report_round);
    let delta = percentage_delta
        .and_then(Decimal::from_f64)
        .map(shared::report_round);
    assign_bucket(average, delta).map(|bucket| bucket.label().to_string())
}

/// Field guidance for a recommendation label
#[wasm_bindgen]
pub fn recommendation_guidance(label: &str) -> Option<String> {
    RecommendationBucket::ALL
        .iter()
        .find(|bucket| bucket.label() == label)
        .map(|bucket| bucket.guidance().to_string())
}

/// Month label such as "mar/2024"; `locale` is "pt-BR" or "en"
#[wasm_bindgen]
pub fn month_label(year: i32, month: u32, locale: &str) -> String {
    let locale = match locale {
        "en" | "en-US" => MonthLocale::English,
        _ => MonthLocale::PtBr,
    };
    YearMonth { year, month }.label(locale)
}

/// Normalize a company, farm or stand name the way the server does
#[wasm_bindgen]
pub fn normalize_name(raw: &str) -> String {
    normalize_identifier(raw)
}

/// Validate a canopy cover reading
#[wasm_bindgen]
pub fn is_valid_canopy_cover(value: f64) -> bool {
    validate_canopy_cover(value).is_ok()
}
