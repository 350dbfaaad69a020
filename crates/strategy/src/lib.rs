pub mod config;
pub mod evaluator;
pub mod indicators;

pub use config::{AmplitudeGate, NotifyConfig, Trigger, WatchConfig, WebhookBot};
pub use evaluator::{evaluate, MarketSnapshot};
