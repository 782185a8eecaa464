pub mod candle;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod gate;
pub mod order;
pub mod run;
pub mod traits;

pub use candle::Candle;
pub use config::{AppConfig, ExchangeConfig, LiveSafetyConfig};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, DataError};
pub use gate::{evaluate, next_failure_state, BlockReason, FailureTransition, GateContext, GateDecision};
pub use order::{OrderKind, OrderRequest, OrderSide, TradeSide};
pub use run::{RunMode, RunRecord, RunStatus};
pub use traits::{CandleFeed, OrderGateway, RunStore};
