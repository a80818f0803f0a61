//! Outbound client for the platform's message-send endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::{BotError, BotResult};

/// Hard platform limit on generic-template carousels.
pub const MAX_CAROUSEL_CARDS: usize = 10;

// --- Payloads ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReply {
    pub content_type: &'static str,
    pub title: String,
    /// Opaque string the platform echoes back verbatim on selection.
    pub payload: String,
}

impl QuickReply {
    pub fn new(title: impl Into<String>, action: &impl Serialize) -> Self {
        Self {
            content_type: "text",
            title: title.into(),
            payload: serde_json::to_string(action).expect("payload serialization cannot fail"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericTemplate {
    pub template_type: &'static str,
    pub elements: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateAttachment {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: GenericTemplate,
}

/// The message body posted as `{recipient: {id}, message: <this>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessagePayload {
    Text {
        text: String,
    },
    QuickReplies {
        text: String,
        quick_replies: Vec<QuickReply>,
    },
    Template {
        attachment: TemplateAttachment,
    },
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn quick_replies(text: impl Into<String>, quick_replies: Vec<QuickReply>) -> Self {
        Self::QuickReplies {
            text: text.into(),
            quick_replies,
        }
    }

    /// Carousel of profile cards, truncated to the platform's card cap.
    pub fn carousel(mut cards: Vec<Card>) -> Self {
        cards.truncate(MAX_CAROUSEL_CARDS);
        Self::Template {
            attachment: TemplateAttachment {
                kind: "template",
                payload: GenericTemplate {
                    template_type: "generic",
                    elements: cards,
                },
            },
        }
    }
}

// --- Client ---

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, recipient_id: &str, message: MessagePayload) -> BotResult<()>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: &'a MessagePayload,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

/// Authenticated client for the platform's Graph-style send endpoint.
pub struct GraphClient {
    http: reqwest::Client,
    send_url: String,
}

impl GraphClient {
    pub fn new(graph_api_url: &str, page_access_token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            send_url: format!("{graph_api_url}/me/messages?access_token={page_access_token}"),
        }
    }
}

#[async_trait]
impl Messenger for GraphClient {
    async fn send(&self, recipient_id: &str, message: MessagePayload) -> BotResult<()> {
        let response = self
            .http
            .post(&self.send_url)
            .json(&SendRequest {
                recipient: Recipient { id: recipient_id },
                message: &message,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::PlatformSend(format!("HTTP {status}: {body}")));
        }

        tracing::debug!(recipient = %recipient_id, "message sent");
        Ok(())
    }
}

// --- Test double ---
