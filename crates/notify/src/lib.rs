pub mod chart;
pub mod dispatcher;
pub mod webhook;

pub use chart::CandleChart;
pub use dispatcher::{Delivery, Dispatcher};
pub use webhook::{tv_instrument, WebhookPayload, WebhookSink};
