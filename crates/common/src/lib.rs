pub mod config;
pub mod error;
pub mod exchange;
pub mod registry;
pub mod sink;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use exchange::{MarketData, MAX_FETCH_LIMIT};
pub use registry::{AddOutcome, SymbolRegistry};
pub use sink::{ChartRenderer, Sink};
pub use types::*;
