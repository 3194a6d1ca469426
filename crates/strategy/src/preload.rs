use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use common::{Error, Result};

/// Strategies to load at startup, declared in a TOML file.
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "ma_cross"
/// id = "spy-ma-20-50"
///
/// [strategy.params]
/// symbol = "SPY"
/// fast_period = 20
/// slow_period = 50
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadFile {
    #[serde(rename = "strategy", default)]
    pub strategies: Vec<PreloadEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreloadEntry {
    /// Strategy type identifier, e.g. "ma_cross" or "rsi".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Instance id; auto-generated when omitted.
    pub id: Option<String>,
    /// Parameter overrides merged over the type's defaults.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl PreloadFile {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read strategy config at '{path}': {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse strategy config at '{path}': {e}"))
        })
    }
}

impl PreloadEntry {
    /// Parameters as the JSON map the registry constructors take.
    pub fn json_params(&self) -> Map<String, Value> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), toml_to_json(v)))
            .collect()
    }
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_entries_with_params() {
        let raw = r#"
            [[strategy]]
            type = "ma_cross"
            id = "spy-ma"

            [strategy.params]
            fast_period = 5
            slow_period = 10
            ma_type = "ema"

            [[strategy]]
            type = "buy_hold"
        "#;
        let file: PreloadFile = toml::from_str(raw).unwrap();
        assert_eq!(file.strategies.len(), 2);

        let ma = &file.strategies[0];
        assert_eq!(ma.strategy_type, "ma_cross");
        assert_eq!(ma.id.as_deref(), Some("spy-ma"));
        let params = ma.json_params();
        assert_eq!(params["fast_period"], 5);
        assert_eq!(params["ma_type"], "ema");

        assert!(file.strategies[1].id.is_none());
        assert!(file.strategies[1].params.is_empty());
    }

    #[test]
    fn empty_file_has_no_strategies() {
        let file: PreloadFile = toml::from_str("").unwrap();
        assert!(file.strategies.is_empty());
    }
}
