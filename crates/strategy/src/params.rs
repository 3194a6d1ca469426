//! Helpers for merging caller parameters over a variant's defaults and
//! extracting typed values from the merged map.

use serde_json::{Map, Value};

use common::{Error, Result};

/// Merge caller overrides over a variant's default-parameter object.
/// Overrides win key-by-key; keys the variant does not know are kept
/// (and ignored by the typed extractors).
pub(crate) fn merge_params(defaults: &Value, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.as_object().cloned().unwrap_or_default();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

pub(crate) fn param_f64(params: &Map<String, Value>, key: &str) -> Result<f64> {
    params
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::InvalidParameters(format!("'{key}' must be a number")))
}

pub(crate) fn param_period(params: &Map<String, Value>, key: &str) -> Result<usize> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .filter(|&v| v >= 1)
        .map(|v| v as usize)
        .ok_or_else(|| Error::InvalidParameters(format!("'{key}' must be an integer >= 1")))
}

pub(crate) fn param_str(params: &Map<String, Value>, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidParameters(format!("'{key}' must be a string")))
}

pub(crate) fn param_bool(params: &Map<String, Value>, key: &str) -> Result<bool> {
    params
        .get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| Error::InvalidParameters(format!("'{key}' must be a boolean")))
}

/// The `symbol`/`quantity` pair every variant carries.
pub(crate) fn trade_params(params: &Map<String, Value>) -> Result<(String, i64)> {
    let symbol = param_str(params, "symbol")?;
    let quantity = params
        .get("quantity")
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::InvalidParameters("'quantity' must be an integer".into()))?;
    if quantity < 1 {
        return Err(Error::InvalidParameters(format!(
            "'quantity' must be >= 1, got {quantity}"
        )));
    }
    Ok((symbol, quantity))
}

/// Round to two decimals for reporting (indicator values in signal
/// metadata and state snapshots).
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_win_over_defaults() {
        let defaults = json!({ "symbol": "SPY", "quantity": 100, "fast_period": 20 });
        let overrides = json!({ "fast_period": 5 });
        let merged = merge_params(&defaults, overrides.as_object().unwrap());
        assert_eq!(param_period(&merged, "fast_period").unwrap(), 5);
        assert_eq!(param_str(&merged, "symbol").unwrap(), "SPY");
    }

    #[test]
    fn wrong_types_are_invalid_parameters() {
        let merged = merge_params(&json!({ "fast_period": "twenty" }), &Map::new());
        assert!(param_period(&merged, "fast_period").is_err());
    }

    #[test]
    fn quantity_must_be_positive() {
        let merged = merge_params(&json!({ "symbol": "SPY", "quantity": 0 }), &Map::new());
        assert!(trade_params(&merged).is_err());
    }
}
