use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use common::{Error, Result};

use crate::{buy_hold, ma_crossover, rsi_revert, Strategy};

/// Constructor signature shared by every registered strategy type.
/// Takes the instance id and the caller's parameter overrides; validation
/// failures surface as `Error::InvalidParameters` and prevent creation.
pub type Constructor = fn(&str, &Map<String, Value>) -> Result<Box<dyn Strategy>>;

/// One registered strategy type.
pub struct RegistryEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub defaults: Value,
    pub constructor: Constructor,
}

/// Description of a registered strategy type, for listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
    pub default_params: Value,
}

/// Maps strategy-type names to constructors.
///
/// Registration is compiled in: `builtin()` registers every shipped
/// variant at startup, and the registry is shared read-only afterwards.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in strategy types.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(RegistryEntry {
            name: buy_hold::NAME,
            description: buy_hold::DESCRIPTION,
            defaults: buy_hold::defaults(),
            constructor: |id, params| Ok(Box::new(buy_hold::BuyAndHold::new(id, params)?)),
        });
        registry.register(RegistryEntry {
            name: ma_crossover::NAME,
            description: ma_crossover::DESCRIPTION,
            defaults: ma_crossover::defaults(),
            constructor: |id, params| Ok(Box::new(ma_crossover::MaCrossover::new(id, params)?)),
        });
        registry.register(RegistryEntry {
            name: rsi_revert::NAME,
            description: rsi_revert::DESCRIPTION,
            defaults: rsi_revert::defaults(),
            constructor: |id, params| Ok(Box::new(rsi_revert::RsiReversion::new(id, params)?)),
        });
        registry
    }

    /// Register a strategy type. Re-registering a name overwrites the
    /// previous entry — last registration wins — with a warning.
    pub fn register(&mut self, entry: RegistryEntry) {
        if self.entries.contains_key(entry.name) {
            warn!(name = entry.name, "strategy type already registered — overwriting");
        } else {
            info!(name = entry.name, "Registered strategy type");
        }
        self.entries.insert(entry.name.to_string(), entry);
    }

    /// Construct and initialize an instance of a registered strategy type.
    pub fn create(
        &self,
        name: &str,
        strategy_id: &str,
        params: &Map<String, Value>,
    ) -> Result<Box<dyn Strategy>> {
        let entry = self.entries.get(name).ok_or_else(|| Error::UnknownStrategy {
            name: name.to_string(),
            available: self.names(),
        })?;
        (entry.constructor)(strategy_id, params)
    }

    /// Sorted names of all registered strategy types.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every registered type with defaults and description.
    pub fn list(&self) -> Vec<StrategyInfo> {
        let mut infos: Vec<StrategyInfo> = self
            .entries
            .values()
            .map(|e| StrategyInfo {
                name: e.name.to_string(),
                description: e.description.to_string(),
                default_params: e.defaults.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn info(&self, name: &str) -> Result<StrategyInfo> {
        let entry = self.entries.get(name).ok_or_else(|| Error::UnknownStrategy {
            name: name.to_string(),
            available: self.names(),
        })?;
        Ok(StrategyInfo {
            name: entry.name.to_string(),
            description: entry.description.to_string(),
            default_params: entry.defaults.clone(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_registers_all_three_variants() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.names(), vec!["buy_hold", "ma_cross", "rsi"]);
    }

    #[test]
    fn create_unknown_strategy_lists_available_names() {
        let registry = StrategyRegistry::builtin();
        let err = registry
            .create("nonexistent", "s1", &Map::new())
            .err()
            .expect("unknown strategy must fail");
        match err {
            Error::UnknownStrategy { name, available } => {
                assert_eq!(name, "nonexistent");
                assert_eq!(available, vec!["buy_hold", "ma_cross", "rsi"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn create_propagates_invalid_parameters() {
        let registry = StrategyRegistry::builtin();
        let params = json!({ "fast_period": 50, "slow_period": 20 });
        let err = registry
            .create("ma_cross", "s1", params.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[test]
    fn created_instance_reports_its_type_and_id() {
        let registry = StrategyRegistry::builtin();
        let instance = registry.create("buy_hold", "my-id", &Map::new()).unwrap();
        assert_eq!(instance.strategy_type(), "buy_hold");
        assert_eq!(instance.strategy_id(), "my-id");
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let mut registry = StrategyRegistry::builtin();
        let before = registry.len();
        registry.register(RegistryEntry {
            name: "buy_hold",
            description: "replacement entry",
            defaults: json!({}),
            constructor: |id, params| Ok(Box::new(crate::buy_hold::BuyAndHold::new(id, params)?)),
        });
        assert_eq!(registry.len(), before, "overwrite must not grow the registry");
        assert_eq!(registry.info("buy_hold").unwrap().description, "replacement entry");
    }

    #[test]
    fn list_exposes_defaults() {
        let registry = StrategyRegistry::builtin();
        let infos = registry.list();
        let rsi = infos.iter().find(|i| i.name == "rsi").unwrap();
        assert_eq!(rsi.default_params["rsi_period"], 14);
    }
}
