use crate::FillMode;

/// All configuration loaded from environment variables at startup.
/// Every setting has a sensible default; invalid values cause an
/// immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the control API.
    pub api_port: u16,

    /// Optional JSONL file of recorded bars replayed onto the market
    /// channel at startup.
    pub replay_file: Option<String>,

    /// Optional TOML file declaring strategies to load at startup.
    pub strategy_config_path: Option<String>,

    // Initial execution-simulator settings (hot-updatable at runtime)
    pub slippage_pct: f64,
    pub commission: f64,
    pub fill_mode: FillMode,
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let fill_mode = match optional_env("FILL_MODE") {
            Some(raw) => raw
                .parse()
                .unwrap_or_else(|e| panic!("ERROR: FILL_MODE: {e}")),
            None => FillMode::default(),
        };

        Config {
            api_port: optional_env("API_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8084),
            replay_file: optional_env("REPLAY_FILE"),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH"),
            slippage_pct: optional_env("SLIPPAGE_PCT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.05),
            commission: optional_env("COMMISSION")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1.0),
            fill_mode,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
