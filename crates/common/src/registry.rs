use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

/// Result of `SymbolRegistry::add`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// Newly tracked symbols, normalised, in input order.
    pub added: Vec<String>,
    /// Normalised inputs that are not in the allow-list.
    pub rejected: Vec<String>,
}

/// Ordered, duplicate-free set of symbols the poll loop watches.
///
/// Cloneable handle shared by the poller and the Telegram command handlers.
/// Every operation takes the lock once and never awaits while holding it.
#[derive(Clone)]
pub struct SymbolRegistry {
    allowed: Arc<Vec<String>>,
    tracked: Arc<RwLock<Vec<String>>>,
}

impl SymbolRegistry {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog: Vec<String> = Vec::new();
        for symbol in allowed {
            let symbol = normalize(symbol.as_ref());
            if !symbol.is_empty() && !catalog.contains(&symbol) {
                catalog.push(symbol);
            }
        }
        Self {
            allowed: Arc::new(catalog),
            tracked: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Track every allow-listed symbol in `symbols` that is not tracked yet.
    /// Already-tracked symbols are silently skipped; unknown ones are rejected.
    pub async fn add<I, S>(&self, symbols: I) -> AddOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = AddOutcome::default();
        let mut tracked = self.tracked.write().await;

        for raw in symbols {
            let symbol = normalize(raw.as_ref());
            if symbol.is_empty() {
                continue;
            }
            if !self.allowed.contains(&symbol) {
                if !outcome.rejected.contains(&symbol) {
                    outcome.rejected.push(symbol);
                }
                continue;
            }
            if !tracked.contains(&symbol) {
                tracked.push(symbol.clone());
                outcome.added.push(symbol);
            }
        }

        if !outcome.added.is_empty() {
            info!(added = ?outcome.added, total = tracked.len(), "Tracked symbols updated");
        }
        outcome
    }

    pub async fn clear(&self) {
        let mut tracked = self.tracked.write().await;
        info!(removed = tracked.len(), "Tracked symbols cleared");
        tracked.clear();
    }

    /// Copy of the tracked set, so callers can iterate without holding the lock.
    pub async fn snapshot(&self) -> Vec<String> {
        self.tracked.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.tracked.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tracked.read().await.is_empty()
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
