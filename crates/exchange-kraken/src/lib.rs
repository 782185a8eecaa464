pub mod client;
pub mod error;
pub mod normalizer;
pub mod paper;
pub mod types;

pub use client::KrakenClient;
pub use error::ExchangeError;
pub use normalizer::{normalize, NormalizedOrder, OrderStatus};
pub use paper::PaperGateway;
pub use types::{AddOrderResult, OrderDescription, RawOrderResponse};
