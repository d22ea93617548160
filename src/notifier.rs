//! Back-in-stock alert delivery
//!
//! Sends alerts through the Telegram Bot API (`POST /bot<token>/sendMessage`)
//! to every configured chat. Delivery is best effort: failures are logged and
//! never reach the poll loop. Without a token or chat id the notifier is
//! inactive and silently skips sends.

use crate::error::{Result, StockError};
use crate::stock::ProductRecord;
use async_trait::async_trait;
use serde_json::json;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram `sendMessage` text limit (characters).
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;
/// Longest product id shown in an alert
const ID_LIMIT: usize = 256;

/// A confirmed availability change for one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub id: String,
    pub name: String,
    pub quantity: Option<u64>,
    /// `None` if the product had never been seen
    pub previous: Option<bool>,
    pub current: bool,
}

impl TransitionRecord {
    pub fn from_product(product: &ProductRecord, previous: Option<bool>) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            quantity: product.quantity,
            previous,
            current: product.in_stock,
        }
    }
}

/// Render an alert as Telegram HTML, truncating the name so the whole text
/// fits in one message
pub fn format_alert(transition: &TransitionRecord) -> String {
    let quantity = transition
        .quantity
        .map(|q| q.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let id = escape_html_truncated(&transition.id, ID_LIMIT);
    let render = |name: &str| {
        format!(
            "<b>{}</b> just came <b>IN STOCK</b>!\nInventory: {}\nID: <code>{}</code>",
            name, quantity, id
        )
    };

    let overhead = render("").chars().count();
    let budget = TELEGRAM_MESSAGE_LIMIT.saturating_sub(overhead);
    render(&escape_html_truncated(&transition.name, budget))
}

/// Escape the characters Telegram's HTML parse mode reserves
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match escape_char(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Escape `text`, cutting it with an ellipsis once the escaped form would
/// exceed `budget` characters. Entities are never split.
fn escape_html_truncated(text: &str, budget: usize) -> String {
    let escaped = escape_html(text);
    if escaped.chars().count() <= budget {
        return escaped;
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let len = escape_char(c).map_or(1, |entity| entity.len());
        // Keep room for the ellipsis
        if used + len + 1 > budget {
            break;
        }
        match escape_char(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
        used += len;
    }
    out.push('…');
    out
}

fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        _ => None,
    }
}

/// Outbound alert channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message. Must not fail the caller.
    async fn send(&self, text: &str);
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: Option<String>,
    chat_ids: Vec<String>,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_ids: Vec<String>) -> Self {
        Self::with_api_base(bot_token, chat_ids, TELEGRAM_API_BASE)
    }

    /// Point the notifier at a different Bot API host (used by tests)
    pub fn with_api_base(
        bot_token: Option<String>,
        chat_ids: Vec<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let bot_token = bot_token.filter(|t| !t.trim().is_empty());
        let chat_ids: Vec<String> = chat_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if bot_token.is_none() {
            log::warn!("TELEGRAM_BOT_TOKEN not set; notifications disabled.");
        }
        if chat_ids.is_empty() {
            log::warn!("TELEGRAM_CHAT_ID not set; notifications disabled.");
        }

        Self {
            client: reqwest::Client::new(),
            bot_token,
            chat_ids,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && !self.chat_ids.is_empty()
    }

    pub fn chat_ids(&self) -> &[String] {
        &self.chat_ids
    }

    /// Send one message to one chat
    pub async fn deliver(&self, chat_id: &str, text: &str) -> Result<()> {
        let Some(token) = &self.bot_token else {
            return Err(StockError::Notify("bot token not configured".to_string()));
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        // The request URL carries the bot token; keep it out of errors and logs
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StockError::Network(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StockError::Notify(format!(
                "sendMessage to {} returned {} - {}",
                chat_id, status, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) {
        if !self.is_enabled() {
            log::debug!("Notifier inactive; skipping send: {}", text);
            return;
        }

        for chat_id in &self.chat_ids {
            match self.deliver(chat_id, text).await {
                Ok(()) => log::info!("Sent Telegram alert to {}", chat_id),
                Err(e) => log::error!("Error sending Telegram message: {}", e),
            }
        }
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
