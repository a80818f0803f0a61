use chrono::NaiveDateTime;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};

use crate::schema::{conversation_states, ratings, users};

// --- Profile enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Man => "Man",
            Self::Woman => "Woman",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Man => "\u{1F468}",
            Self::Woman => "\u{1F469}",
        }
    }
}

/// Who the user wants to be matched with. The wire strings are the exact
/// quick-reply labels the platform echoes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum Preference {
    #[serde(rename = "Looking for a Man")]
    LookingForMan,
    #[serde(rename = "Looking for a Woman")]
    LookingForWoman,
}

impl Preference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LookingForMan => "Looking for a Man",
            Self::LookingForWoman => "Looking for a Woman",
        }
    }
}

/// Where a subscriber currently is in the profile-setup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum SetupStep {
    Start,
    AwaitingGender,
    AwaitingPreference,
    AwaitingPhoto,
    AwaitingSummary,
    Completed,
}

impl SetupStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::AwaitingGender => "AWAITING_GENDER",
            Self::AwaitingPreference => "AWAITING_PREFERENCE",
            Self::AwaitingPhoto => "AWAITING_PHOTO",
            Self::AwaitingSummary => "AWAITING_SUMMARY",
            Self::Completed => "COMPLETED",
        }
    }
}

macro_rules! text_enum_sql {
    ($ty:ty, { $($s:literal => $variant:expr),+ $(,)? }) => {
        impl ToSql<Text, Sqlite> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.as_str().to_owned());
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Sqlite> for $ty {
            fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
                match s.as_str() {
                    $($s => Ok($variant),)+
                    other => Err(format!(
                        concat!("unrecognized ", stringify!($ty), " value: {}"),
                        other
                    )
                    .into()),
                }
            }
        }
    };
}

text_enum_sql!(Gender, { "Man" => Gender::Man, "Woman" => Gender::Woman });
text_enum_sql!(Preference, {
    "Looking for a Man" => Preference::LookingForMan,
    "Looking for a Woman" => Preference::LookingForWoman,
});
text_enum_sql!(SetupStep, {
    "START" => SetupStep::Start,
    "AWAITING_GENDER" => SetupStep::AwaitingGender,
    "AWAITING_PREFERENCE" => SetupStep::AwaitingPreference,
    "AWAITING_PHOTO" => SetupStep::AwaitingPhoto,
    "AWAITING_SUMMARY" => SetupStep::AwaitingSummary,
    "COMPLETED" => SetupStep::Completed,
});

// --- User ---

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub messenger_id: String,
    pub gender: Gender,
    pub preference: Preference,
    pub photo_url: String,
    pub summary: String,
    pub setup_completed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub messenger_id: String,
    pub gender: Gender,
    pub preference: Preference,
    pub photo_url: String,
    pub summary: String,
    pub setup_completed: bool,
}

// --- Conversation state ---

/// Typed scratch data accumulated across setup steps. Serialized into the
/// `temp_data` text column; a field is present once its step has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference: Option<Preference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl PartialProfile {
    /// Consumes the scratch into an insertable completed profile, or None if
    /// any step's field is still missing.
    pub fn complete(self, messenger_id: &str) -> Option<NewUser> {
        Some(NewUser {
            messenger_id: messenger_id.to_owned(),
            gender: self.gender?,
            preference: self.preference?,
            photo_url: self.photo_url?,
            summary: self.summary?,
            setup_completed: true,
        })
    }
}

#[derive(Debug, Queryable)]
#[diesel(table_name = conversation_states)]
pub struct ConversationStateRow {
    pub messenger_id: String,
    pub current_step: SetupStep,
    pub temp_data: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversation_states)]
pub struct NewConversationState<'a> {
    pub messenger_id: &'a str,
    pub current_step: SetupStep,
    pub temp_data: String,
}

// --- Rating ---

#[derive(Debug, Insertable)]
#[diesel(table_name = ratings)]
pub struct NewRating<'a> {
    pub rater_id: &'a str,
    pub person1_id: &'a str,
    pub person2_id: &'a str,
    pub rating: bool,
}

/// One row of the top-matches leaderboard: the other user plus how many
/// positive couple votes link them to the querying user.
#[derive(Debug, QueryableByName)]
pub struct MatchEntry {
    #[diesel(sql_type = Text)]
    pub messenger_id: String,
    #[diesel(sql_type = Text)]
    pub gender: Gender,
    #[diesel(sql_type = Text)]
    pub preference: Preference,
    #[diesel(sql_type = Text)]
    pub photo_url: String,
    #[diesel(sql_type = Text)]
    pub summary: String,
    #[diesel(sql_type = BigInt)]
    pub match_score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_wire_strings_roundtrip() {
        let json = serde_json::to_string(&Preference::LookingForWoman).unwrap();
        assert_eq!(json, "\"Looking for a Woman\"");
        let back: Preference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Preference::LookingForWoman);
    }

    #[test]
    fn partial_profile_completes_only_when_full() {
        let mut scratch = PartialProfile {
            gender: Some(Gender::Man),
            preference: Some(Preference::LookingForWoman),
            photo_url: Some("https://cdn.example/photo.jpg".into()),
            summary: None,
        };
        assert!(scratch.clone().complete("sub-1").is_none());

        scratch.summary = Some("Love hiking".into());
        let user = scratch.complete("sub-1").unwrap();
        assert_eq!(user.messenger_id, "sub-1");
        assert_eq!(user.gender, Gender::Man);
        assert!(user.setup_completed);
    }

    #[test]
    fn scratch_serialization_skips_missing_fields() {
        let scratch = PartialProfile {
            gender: Some(Gender::Woman),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&scratch).unwrap(), "{\"gender\":\"Woman\"}");

        let parsed: PartialProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, PartialProfile::default());
    }
}
