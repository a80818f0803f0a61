//! Conversation engine: decides, for each inbound event, what to persist and
//! what to send next.

mod commands;
mod couples;
mod matches;
mod setup;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::BotResult;
use crate::messenger::{MessagePayload, Messenger};
use crate::models::{Gender, Preference};
use crate::scheduler::Scheduler;
use crate::store::Store;

// --- Inbound platform events ---

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    pub sender: Sender,
    #[serde(default)]
    pub message: Option<InboundMessage>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub quick_reply: Option<QuickReplyEcho>,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
}

/// Echo of a tapped quick reply; the payload is whatever we attached to it.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickReplyEcho {
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: AttachmentPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub payload: String,
}

/// Tagged payload carried by quick replies and postback buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionPayload {
    RateCouple {
        person1_id: String,
        person2_id: String,
        rating: bool,
    },
    ViewMoreCouples,
    ShowMatches,
    SelectGender {
        gender: Gender,
    },
    SelectPreference {
        preference: Preference,
    },
}

// --- Pacing ---

/// Delays between a primary message and its scheduled follow-up send.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub gender_prompt: Duration,
    pub rating_prompt: Duration,
    pub rate_followup: Duration,
    pub first_couple: Duration,
    pub matches_followup: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            gender_prompt: Duration::from_millis(1000),
            rating_prompt: Duration::from_millis(1500),
            rate_followup: Duration::from_millis(1000),
            first_couple: Duration::from_millis(2000),
            matches_followup: Duration::from_millis(2000),
        }
    }
}

impl Pacing {
    /// No delays between sends.
    pub fn immediate() -> Self {
        Self {
            gender_prompt: Duration::ZERO,
            rating_prompt: Duration::ZERO,
            rate_followup: Duration::ZERO,
            first_couple: Duration::ZERO,
            matches_followup: Duration::ZERO,
        }
    }
}

const APOLOGY: &str = "Sorry, something went wrong. Please try again! \u{1F605}";

// --- Engine ---

#[derive(Clone)]
pub struct Engine {
    store: Store,
    messenger: Arc<dyn Messenger>,
    scheduler: Scheduler,
    pacing: Pacing,
}

impl Engine {
    pub fn new(
        store: Store,
        messenger: Arc<dyn Messenger>,
        scheduler: Scheduler,
        pacing: Pacing,
    ) -> Self {
        Self {
            store,
            messenger,
            scheduler,
            pacing,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Queues an inbound event; the webhook acknowledges without waiting.
    pub fn spawn_dispatch(&self, event: MessagingEvent) {
        let engine = self.clone();
        self.scheduler
            .spawn(async move { engine.dispatch(event).await });
    }

    /// Handles one inbound event. Every failure is classified for the logs,
    /// then collapsed into one generic apology to the subscriber.
    pub async fn dispatch(&self, event: MessagingEvent) {
        let subscriber = event.sender.id.clone();
        if let Err(err) = self.handle_event(&subscriber, event).await {
            tracing::error!(
                subscriber = %subscriber,
                kind = err.kind(),
                error = %err,
                "event handling failed"
            );
            self.apologize(&subscriber).await;
        }
    }

    async fn handle_event(&self, subscriber: &str, event: MessagingEvent) -> BotResult<()> {
        if let Some(message) = event.message {
            // A tapped quick reply arrives as a message but carries the same
            // opaque payload a postback button would.
            if let Some(quick_reply) = &message.quick_reply {
                let action: ActionPayload = serde_json::from_str(&quick_reply.payload)?;
                return self.handle_action(subscriber, action).await;
            }
            return self.handle_message(subscriber, &message).await;
        }

        if let Some(postback) = event.postback {
            let action: ActionPayload = serde_json::from_str(&postback.payload)?;
            return self.handle_action(subscriber, action).await;
        }

        tracing::debug!(subscriber = %subscriber, "event carries no message or postback");
        Ok(())
    }

    async fn handle_message(&self, subscriber: &str, message: &InboundMessage) -> BotResult<()> {
        match self.store.get_user(subscriber)? {
            Some(user) if user.setup_completed => {
                commands::dispatch(self, subscriber, message.text.as_deref()).await
            }
            _ => setup::advance(self, subscriber, message).await,
        }
    }

    async fn handle_action(&self, subscriber: &str, action: ActionPayload) -> BotResult<()> {
        match action {
            ActionPayload::RateCouple {
                person1_id,
                person2_id,
                rating,
            } => couples::rate(self, subscriber, &person1_id, &person2_id, rating).await,
            ActionPayload::ViewMoreCouples => couples::show_random(self, subscriber).await,
            ActionPayload::ShowMatches => matches::show(self, subscriber).await,
            ActionPayload::SelectGender { gender } => {
                if self.setup_pending(subscriber)? {
                    setup::select_gender(self, subscriber, gender).await
                } else {
                    // Setup is terminal once a profile exists.
                    commands::fallback(self, subscriber).await
                }
            }
            ActionPayload::SelectPreference { preference } => {
                if self.setup_pending(subscriber)? {
                    setup::select_preference(self, subscriber, preference).await
                } else {
                    commands::fallback(self, subscriber).await
                }
            }
        }
    }

    fn setup_pending(&self, subscriber: &str) -> BotResult<bool> {
        Ok(self
            .store
            .get_user(subscriber)?
            .map_or(true, |user| !user.setup_completed))
    }

    async fn apologize(&self, subscriber: &str) {
        if let Err(err) = self
            .messenger
            .send(subscriber, MessagePayload::text(APOLOGY))
            .await
        {
            // Logged only; there is no further fallback channel.
            tracing::warn!(
                subscriber = %subscriber,
                kind = err.kind(),
                error = %err,
                "apology send failed"
            );
        }
    }

    /// Sends `message` after `delay`. Failures are logged, never re-raised;
    /// the primary send this follows is already acknowledged.
    pub(crate) fn schedule_send(&self, recipient: &str, delay: Duration, message: MessagePayload) {
        let messenger = Arc::clone(&self.messenger);
        let recipient = recipient.to_owned();
        self.scheduler.schedule(delay, async move {
            if let Err(err) = messenger.send(&recipient, message).await {
                tracing::warn!(
                    subscriber = %recipient,
                    kind = err.kind(),
                    error = %err,
                    "follow-up send failed"
                );
            }
        });
    }

    /// Presents a random couple after `delay`.
    pub(crate) fn schedule_couple(&self, recipient: &str, delay: Duration) {
        let engine = self.clone();
        let recipient = recipient.to_owned();
        self.scheduler.schedule(delay, async move {
            if let Err(err) = couples::show_random(&engine, &recipient).await {
                tracing::error!(
                    subscriber = %recipient,
                    kind = err.kind(),
                    error = %err,
                    "scheduled couple presentation failed"
                );
                engine.apologize(&recipient).await;
            }
        });
    }
}
