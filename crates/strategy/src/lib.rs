pub mod config;
pub mod indicators;
pub mod signal;

pub use config::StrategyConfig;
pub use signal::{
    composite_signal, composite_signal_from_closes, LONG_MA_PERIOD, RSI_PERIOD, SHORT_MA_PERIOD,
    WARMUP_PERIOD,
};
