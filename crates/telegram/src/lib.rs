pub mod commands;
pub mod sink;

pub use commands::{start_bot, verify_token, BotDeps, Command};
pub use sink::{TelegramChartSink, TelegramSink};
