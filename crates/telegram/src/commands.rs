use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

use common::{AddOutcome, Error, Result, SymbolRegistry};

type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

const SET_SYMBOLS_USAGE: &str = "No symbols provided. Usage: /set_symbols BTC/USDT ETH/USDT";

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub registry: SymbolRegistry,
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "SignalBot commands:")]
pub enum Command {
    #[command(description = "Track symbols, e.g. /set_symbols BTC/USDT ETH/USDT")]
    SetSymbols(String),
    #[command(description = "Stop tracking all symbols")]
    ResetSymbols,
    #[command(description = "List tracked symbols")]
    Symbols,
    #[command(description = "Show this help")]
    Help,
}

/// Check the token with `getMe` before anything else starts.
pub async fn verify_token(bot: &Bot) -> Result<String> {
    let me = bot
        .get_me()
        .await
        .map_err(|e| Error::Config(format!("Telegram token rejected: {e}")))?;
    Ok(me.username().to_string())
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::SetSymbols(args)].endpoint(handle_set_symbols))
        .branch(case![Command::ResetSymbols].endpoint(handle_reset_symbols))
        .branch(case![Command::Symbols].endpoint(handle_symbols))
        .branch(case![Command::Help].endpoint(handle_help));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = deps.allowed_user_ids.contains(&uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_set_symbols(
    bot: Bot,
    msg: Message,
    args: String,
    deps: Arc<BotDeps>,
) -> HandlerResult {
    let reply = set_symbols_reply(&deps.registry, &args).await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_reset_symbols(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    deps.registry.clear().await;
    bot.send_message(msg.chat.id, "Symbols have been reset.").await?;
    Ok(())
}

async fn handle_symbols(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let tracked = deps.registry.snapshot().await;
    let text = if tracked.is_empty() {
        "No symbols are being tracked.".to_string()
    } else {
        format!("Tracking: {}", tracked.join(", "))
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

/// Split `/set_symbols` arguments on whitespace and commas.
pub fn parse_symbol_args(args: &str) -> Result<Vec<String>> {
    let symbols: Vec<String> = args
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if symbols.is_empty() {
        return Err(Error::InvalidCommand(SET_SYMBOLS_USAGE.to_string()));
    }
    Ok(symbols)
}

/// Apply `/set_symbols` to the registry and build the reply text.
pub async fn set_symbols_reply(registry: &SymbolRegistry, args: &str) -> String {
    let symbols = match parse_symbol_args(args) {
        Ok(symbols) => symbols,
        Err(Error::InvalidCommand(text)) => return text,
        Err(e) => return e.to_string(),
    };
    let outcome = registry.add(&symbols).await;
    let tracked = registry.snapshot().await;
    format_add_reply(&outcome, &tracked)
}

pub fn format_add_reply(outcome: &AddOutcome, tracked: &[String]) -> String {
    let mut lines = Vec::new();
    if !outcome.added.is_empty() {
        lines.push(format!("Symbols updated: {}", tracked.join(", ")));
    }
    if !outcome.rejected.is_empty() {
        lines.push(format!(
            "Invalid symbols (not available): {}",
            outcome.rejected.join(", ")
        ));
    }
    if lines.is_empty() {
        return "All provided symbols are already in the list.".to_string();
    }
    lines.join("\n")
}
