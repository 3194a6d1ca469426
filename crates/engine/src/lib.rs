pub mod lifecycle;
pub mod replay;

mod runner;

pub use lifecycle::{
    Engine, EngineHandle, EngineStatus, LoadRequest, LoadedStrategy, StrategyStatus,
};
pub use replay::BarReplay;
