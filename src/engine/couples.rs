//! Random-couple presentation and the cuteness vote.

use crate::errors::BotResult;
use crate::messenger::{Card, MessagePayload, QuickReply};
use crate::models::User;

use super::{ActionPayload, Engine};

const NOT_ENOUGH_PROFILES: &str =
    "Not enough profiles yet! Invite more friends to join Duet! \u{1F495}";

/// Two-step presentation: the couple carousel now, the yes/no rating prompt
/// after the pacing delay. The second send never rolls back the first.
pub(super) async fn show_random(engine: &Engine, subscriber: &str) -> BotResult<()> {
    let Some((person1, person2)) = engine.store.pick_random_pair()? else {
        return engine
            .messenger
            .send(subscriber, MessagePayload::text(NOT_ENOUGH_PROFILES))
            .await;
    };

    engine
        .messenger
        .send(
            subscriber,
            MessagePayload::carousel(vec![profile_card(&person1), profile_card(&person2)]),
        )
        .await?;

    engine.schedule_send(
        subscriber,
        engine.pacing.rating_prompt,
        rating_prompt(&person1, &person2),
    );
    Ok(())
}

pub(super) async fn rate(
    engine: &Engine,
    subscriber: &str,
    person1_id: &str,
    person2_id: &str,
    rating: bool,
) -> BotResult<()> {
    engine
        .store
        .upsert_rating(subscriber, person1_id, person2_id, rating)?;

    let ack = if rating {
        "Thanks for the vote! \u{2764}\u{FE0F}"
    } else {
        "Thanks for your honesty! \u{1F60A}"
    };
    engine
        .messenger
        .send(subscriber, MessagePayload::text(ack))
        .await?;

    engine.schedule_send(
        subscriber,
        engine.pacing.rate_followup,
        MessagePayload::quick_replies(
            "Want to see another couple?",
            vec![
                QuickReply::new("Yes! \u{1F440}", &ActionPayload::ViewMoreCouples),
                QuickReply::new("Show My Matches", &ActionPayload::ShowMatches),
            ],
        ),
    );
    Ok(())
}

fn profile_card(user: &User) -> Card {
    Card {
        title: format!("{} Profile", user.gender.emoji()),
        subtitle: user.summary.clone(),
        image_url: user.photo_url.clone(),
    }
}

fn rating_prompt(person1: &User, person2: &User) -> MessagePayload {
    let vote = |rating: bool| ActionPayload::RateCouple {
        person1_id: person1.messenger_id.clone(),
        person2_id: person2.messenger_id.clone(),
        rating,
    };

    MessagePayload::quick_replies(
        "Do you think this is a cute couple? \u{1F495}",
        vec![
            QuickReply::new("\u{2764}\u{FE0F} Yes!", &vote(true)),
            QuickReply::new("\u{274C} No", &vote(false)),
        ],
    )
}
