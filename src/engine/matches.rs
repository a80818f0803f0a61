//! Top-matches leaderboard presentation.

use crate::errors::BotResult;
use crate::messenger::{Card, MessagePayload, QuickReply};
use crate::models::MatchEntry;

use super::{ActionPayload, Engine};

const NO_MATCHES: &str = "No matches yet! Keep rating couples to find your perfect match! \u{1F495}\n\nType 'View Couples' to start rating!";

pub(super) async fn show(engine: &Engine, subscriber: &str) -> BotResult<()> {
    let matches = engine.store.top_matches(subscriber)?;

    if matches.is_empty() {
        return engine
            .messenger
            .send(subscriber, MessagePayload::text(NO_MATCHES))
            .await;
    }

    engine
        .messenger
        .send(
            subscriber,
            MessagePayload::text(format!(
                "\u{1F525} Your top matches ({}):",
                matches.len()
            )),
        )
        .await?;

    engine
        .messenger
        .send(
            subscriber,
            MessagePayload::carousel(matches.iter().map(match_card).collect()),
        )
        .await?;

    engine.schedule_send(
        subscriber,
        engine.pacing.matches_followup,
        MessagePayload::quick_replies(
            "Want to rate more couples to find more matches?",
            vec![QuickReply::new("Yes! \u{1F495}", &ActionPayload::ViewMoreCouples)],
        ),
    );
    Ok(())
}

fn match_card(entry: &MatchEntry) -> Card {
    Card {
        title: format!("{} {} votes", entry.gender.emoji(), entry.match_score),
        subtitle: entry.summary.clone(),
        image_url: entry.photo_url.clone(),
    }
}
