use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::Notifier;
use crate::bonds::{Bond, ImprovedBond};
use crate::constants::BOND_DETAILS_URL;
use crate::error::{PipelineError, Result};

const NEW_BOND_COLOR: u32 = 0x0040ff;
const IMPROVED_BOND_COLOR: u32 = 0x00ff00;

#[derive(Debug, Serialize)]
struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

fn field(name: &'static str, value: impl ToString) -> EmbedField {
    EmbedField {
        name,
        value: value.to_string(),
        inline: true,
    }
}

/// Posts bond embeds to a Discord channel webhook
#[derive(Debug, Clone)]
pub struct DiscordWebhookNotifier {
    http_client: Client,
    webhook_url: String,
}

impl DiscordWebhookNotifier {
    pub fn new(webhook_url: &str, request_timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build webhook HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            webhook_url: webhook_url.to_string(),
        })
    }

    async fn post(&self, message: &WebhookMessage) -> Result<()> {
        self.http_client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| PipelineError::Notification(e.to_string()))?;
        Ok(())
    }
}

/// Link, maturity and issuer shared by both embed kinds
fn bond_embed(title: String, color: u32, mut fields: Vec<EmbedField>, bond: &Bond) -> Embed {
    fields.push(field(
        "Data wykupu",
        bond.maturity_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
    ));
    fields.push(field("Emitent", bond.issuer.as_deref().unwrap_or("-")));
    Embed {
        title,
        description: format!("[Szczegóły {0}]({1}/{0})", bond.ticker, BOND_DETAILS_URL),
        color,
        fields,
    }
}

fn yield_text(bond: &Bond) -> String {
    bond.net_yield.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string())
}

fn new_bond_embed(bond: &Bond) -> Embed {
    bond_embed(
        format!("New bond {}", bond.ticker),
        NEW_BOND_COLOR,
        vec![
            field("YTM Netto", format!("{}%", yield_text(bond))),
            field("Cena", bond.price),
        ],
        bond,
    )
}

fn improved_bond_embed(improved: &ImprovedBond) -> Embed {
    let bond = &improved.bond;
    bond_embed(
        format!("{} YTM {}% -> {}%", bond.ticker, improved.prev_net_yield, yield_text(bond)),
        IMPROVED_BOND_COLOR,
        vec![field("Cena", format!("{} -> {}", improved.prev_price, bond.price))],
        bond,
    )
}

#[async_trait]
impl Notifier for DiscordWebhookNotifier {
    #[instrument(skip_all, fields(ticker = %bond.ticker))]
    async fn notify_new(&self, bond: &Bond) -> Result<()> {
        self.post(&WebhookMessage {
            content: None,
            embeds: vec![new_bond_embed(bond)],
        })
        .await?;
        debug!("New bond notification delivered");
        Ok(())
    }

    #[instrument(skip_all, fields(ticker = %improved.bond.ticker))]
    async fn notify_improved(&self, improved: &ImprovedBond) -> Result<()> {
        self.post(&WebhookMessage {
            content: None,
            embeds: vec![improved_bond_embed(improved)],
        })
        .await?;
        debug!("Improved bond notification delivered");
        Ok(())
    }

    async fn alert(&self, message: &str) -> Result<()> {
        self.post(&WebhookMessage {
            content: Some(message.to_string()),
            embeds: Vec::new(),
        })
        .await
    }
}
