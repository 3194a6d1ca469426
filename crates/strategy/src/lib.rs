pub mod buy_hold;
pub mod ma_crossover;
pub mod preload;
pub mod registry;
pub mod rsi_revert;
pub mod window;

mod params;

pub use registry::{StrategyInfo, StrategyRegistry};
pub use window::IndicatorWindow;

use common::{Bar, Signal};

/// All strategy implementations must satisfy this trait.
///
/// An instance is owned by exactly one engine task; bars reach
/// `process_bar` strictly in arrival order, so implementations are free
/// to keep plain mutable state.
pub trait Strategy: Send + std::fmt::Debug {
    /// Registry name of this strategy's type (e.g. "ma_cross").
    fn strategy_type(&self) -> &'static str;

    /// Unique id of this running instance.
    fn strategy_id(&self) -> &str;

    /// The symbol this instance watches (e.g. "SPY").
    fn symbol(&self) -> &str;

    /// Feed one bar: the close price enters the instance's rolling window,
    /// then the variant logic runs. Returns at most one signal per call.
    fn process_bar(&mut self, bar: &Bar) -> Option<Signal>;

    /// Called once before the first bar. Observability only — must not
    /// mutate state that affects future signals.
    fn on_start(&self) {}

    /// Called once after the last bar. Observability only.
    fn on_stop(&self) {}

    /// Read-only state snapshot (indicator values, position side) for
    /// status reporting.
    fn snapshot(&self) -> serde_json::Value;
}
