//! Linear profile-setup flow: gender, preference, photo, summary.

use crate::errors::BotResult;
use crate::messenger::{MessagePayload, QuickReply};
use crate::models::{Gender, PartialProfile, Preference, SetupStep};

use super::{ActionPayload, Engine, InboundMessage};

const WELCOME: &str = "Welcome to Duet! \u{1F495} Let's set up your profile so you can start rating cute couples and find your matches!";
const PHOTO_PROMPT: &str = "Great! Now please upload your profile photo \u{1F4F8}";
const PHOTO_REPROMPT: &str = "Please upload an image for your profile photo \u{1F4F8}";
const SUMMARY_PROMPT: &str =
    "Perfect! \u{1F4F1} Now write a short summary about yourself (1-2 sentences):";
const SUMMARY_REPROMPT: &str = "Please write a short text summary about yourself:";
const COMPLETE: &str = "\u{1F389} Profile complete! Welcome to Duet!\n\nCommands you can use:\n\u{2022} Type 'View Couples' to rate couples\n\u{2022} Type 'My Matches' to see your matches";
const PROFILE_ERROR: &str = "Sorry, there was an error creating your profile. Please try again!";

/// Advances the setup state machine for a plain (non-payload) message.
pub(super) async fn advance(
    engine: &Engine,
    subscriber: &str,
    message: &InboundMessage,
) -> BotResult<()> {
    let (step, profile) = engine.store.conversation_state(subscriber)?;
    match step {
        // COMPLETED without a completed profile row means the profile insert
        // never landed; start over.
        SetupStep::Start | SetupStep::Completed => start(engine, subscriber).await,
        SetupStep::AwaitingGender => engine.messenger.send(subscriber, gender_prompt()).await,
        SetupStep::AwaitingPreference => {
            engine.messenger.send(subscriber, preference_prompt()).await
        }
        SetupStep::AwaitingPhoto => handle_photo(engine, subscriber, message, profile).await,
        SetupStep::AwaitingSummary => handle_summary(engine, subscriber, message, profile).await,
    }
}

/// Welcome + transition to AWAITING_GENDER; the gender prompt follows after
/// the pacing delay.
async fn start(engine: &Engine, subscriber: &str) -> BotResult<()> {
    engine
        .messenger
        .send(subscriber, MessagePayload::text(WELCOME))
        .await?;
    engine.store.set_conversation_state(
        subscriber,
        SetupStep::AwaitingGender,
        &PartialProfile::default(),
    )?;
    engine.schedule_send(subscriber, engine.pacing.gender_prompt, gender_prompt());
    Ok(())
}

/// Re-sends the prompt for whatever step the subscriber is in. Used when a
/// selection payload arrives in a step it does not belong to.
async fn reprompt(engine: &Engine, subscriber: &str, step: SetupStep) -> BotResult<()> {
    match step {
        SetupStep::Start | SetupStep::Completed => start(engine, subscriber).await,
        SetupStep::AwaitingGender => engine.messenger.send(subscriber, gender_prompt()).await,
        SetupStep::AwaitingPreference => {
            engine.messenger.send(subscriber, preference_prompt()).await
        }
        SetupStep::AwaitingPhoto => {
            engine
                .messenger
                .send(subscriber, MessagePayload::text(PHOTO_REPROMPT))
                .await
        }
        SetupStep::AwaitingSummary => {
            engine
                .messenger
                .send(subscriber, MessagePayload::text(SUMMARY_REPROMPT))
                .await
        }
    }
}

pub(super) async fn select_gender(
    engine: &Engine,
    subscriber: &str,
    gender: Gender,
) -> BotResult<()> {
    let (step, _) = engine.store.conversation_state(subscriber)?;
    if step != SetupStep::AwaitingGender {
        return reprompt(engine, subscriber, step).await;
    }

    let profile = PartialProfile {
        gender: Some(gender),
        ..Default::default()
    };
    engine
        .store
        .set_conversation_state(subscriber, SetupStep::AwaitingPreference, &profile)?;
    engine.messenger.send(subscriber, preference_prompt()).await
}

pub(super) async fn select_preference(
    engine: &Engine,
    subscriber: &str,
    preference: Preference,
) -> BotResult<()> {
    let (step, mut profile) = engine.store.conversation_state(subscriber)?;
    if step != SetupStep::AwaitingPreference {
        return reprompt(engine, subscriber, step).await;
    }

    profile.preference = Some(preference);
    engine
        .store
        .set_conversation_state(subscriber, SetupStep::AwaitingPhoto, &profile)?;
    engine
        .messenger
        .send(subscriber, MessagePayload::text(PHOTO_PROMPT))
        .await
}

async fn handle_photo(
    engine: &Engine,
    subscriber: &str,
    message: &InboundMessage,
    mut profile: PartialProfile,
) -> BotResult<()> {
    let photo_url = message
        .attachments
        .iter()
        .find(|attachment| attachment.kind == "image")
        .and_then(|attachment| attachment.payload.url.clone());

    let Some(photo_url) = photo_url else {
        return engine
            .messenger
            .send(subscriber, MessagePayload::text(PHOTO_REPROMPT))
            .await;
    };

    profile.photo_url = Some(photo_url);
    engine
        .store
        .set_conversation_state(subscriber, SetupStep::AwaitingSummary, &profile)?;
    engine
        .messenger
        .send(subscriber, MessagePayload::text(SUMMARY_PROMPT))
        .await
}

async fn handle_summary(
    engine: &Engine,
    subscriber: &str,
    message: &InboundMessage,
    mut profile: PartialProfile,
) -> BotResult<()> {
    let summary = message
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());

    let Some(summary) = summary else {
        return engine
            .messenger
            .send(subscriber, MessagePayload::text(SUMMARY_REPROMPT))
            .await;
    };

    profile.summary = Some(summary.to_owned());
    let Some(new_user) = profile.complete(subscriber) else {
        // Scratch lost a field along the way; the subscriber stays on this
        // step and can retry.
        tracing::warn!(subscriber = %subscriber, "scratch profile incomplete at summary step");
        return engine
            .messenger
            .send(subscriber, MessagePayload::text(PROFILE_ERROR))
            .await;
    };

    engine.store.create_user(new_user)?;
    engine.store.set_conversation_state(
        subscriber,
        SetupStep::Completed,
        &PartialProfile::default(),
    )?;

    engine
        .messenger
        .send(subscriber, MessagePayload::text(COMPLETE))
        .await?;
    engine.schedule_couple(subscriber, engine.pacing.first_couple);
    Ok(())
}

fn gender_prompt() -> MessagePayload {
    MessagePayload::quick_replies(
        "First, what's your gender?",
        vec![
            QuickReply::new(
                "Man",
                &ActionPayload::SelectGender {
                    gender: Gender::Man,
                },
            ),
            QuickReply::new(
                "Woman",
                &ActionPayload::SelectGender {
                    gender: Gender::Woman,
                },
            ),
        ],
    )
}

fn preference_prompt() -> MessagePayload {
    MessagePayload::quick_replies(
        "What are you looking for?",
        vec![
            QuickReply::new(
                "Looking for a Man",
                &ActionPayload::SelectPreference {
                    preference: Preference::LookingForMan,
                },
            ),
            QuickReply::new(
                "Looking for a Woman",
                &ActionPayload::SelectPreference {
                    preference: Preference::LookingForWoman,
                },
            ),
        ],
    )
}
