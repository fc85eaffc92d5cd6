pub mod discord;

use async_trait::async_trait;
use tracing::info;

use crate::bonds::{Bond, ImprovedBond};
use crate::error::Result;

pub use discord::DiscordWebhookNotifier;

/// Delivery channel for reportable bonds and operator alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new(&self, bond: &Bond) -> Result<()>;

    async fn notify_improved(&self, improved: &ImprovedBond) -> Result<()>;

    async fn alert(&self, message: &str) -> Result<()>;
}

/// Used when publishing is switched off; everything goes to the log only
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_new(&self, bond: &Bond) -> Result<()> {
        info!(ticker = %bond.ticker, bond = %bond, "New bond");
        Ok(())
    }

    async fn notify_improved(&self, improved: &ImprovedBond) -> Result<()> {
        info!(
            ticker = %improved.bond.ticker,
            prev_net_yield = %improved.prev_net_yield,
            net_yield = ?improved.bond.net_yield,
            "Bond yield improved"
        );
        Ok(())
    }

    async fn alert(&self, message: &str) -> Result<()> {
        info!(alert = message, "Alert (publishing disabled)");
        Ok(())
    }
}
