//! Main-command dispatch for subscribers with a completed profile.

use crate::errors::BotResult;
use crate::messenger::MessagePayload;

use super::{couples, matches, Engine};

const HELP: &str = "\u{1F3E0} Duet Dating App Help\n\n\u{1F4DD} Commands:\n\u{2022} 'View Couples' - Rate random couples\n\u{2022} 'My Matches' - See people you match with\n\u{2022} 'Help' - Show this menu\n\n\u{1F4A1} How it works:\n1. Rate couples as cute or not\n2. When others vote you'd be cute with someone, they become your match!\n3. The more votes, the higher they rank in your matches!";
const COMMAND_LIST: &str = "Commands:\n\u{2022} 'View Couples' - Rate couples\n\u{2022} 'My Matches' - See your matches\n\u{2022} 'Help' - Show this menu";

/// First match wins, on the lower-cased message text.
pub(super) async fn dispatch(engine: &Engine, subscriber: &str, text: Option<&str>) -> BotResult<()> {
    let text = text.unwrap_or_default().to_lowercase();

    if text.contains("view couples") || text.contains("couples") {
        couples::show_random(engine, subscriber).await
    } else if text.contains("my matches") || text.contains("matches") {
        matches::show(engine, subscriber).await
    } else if text.contains("help") {
        engine
            .messenger
            .send(subscriber, MessagePayload::text(HELP))
            .await
    } else {
        fallback(engine, subscriber).await
    }
}

pub(super) async fn fallback(engine: &Engine, subscriber: &str) -> BotResult<()> {
    engine
        .messenger
        .send(subscriber, MessagePayload::text(COMMAND_LIST))
        .await
}
