pub mod bybit;
pub mod poller;

pub use bybit::BybitClient;
pub use poller::{CycleReport, Poller};
