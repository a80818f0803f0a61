use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;

use crate::errors::{BotError, BotResult};
use crate::models::{
    ConversationStateRow, MatchEntry, NewConversationState, NewRating, NewUser, PartialProfile,
    SetupStep, User,
};
use crate::schema::{conversation_states, ratings, users};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

diesel::define_sql_function! { fn random() -> diesel::sql_types::BigInt; }

const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    messenger_id TEXT UNIQUE NOT NULL,
    gender TEXT NOT NULL CHECK(gender IN ('Man', 'Woman')),
    preference TEXT NOT NULL CHECK(preference IN ('Looking for a Man', 'Looking for a Woman')),
    photo_url TEXT NOT NULL,
    summary TEXT NOT NULL,
    setup_completed BOOLEAN NOT NULL DEFAULT 0,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS conversation_states (
    messenger_id TEXT PRIMARY KEY,
    current_step TEXT NOT NULL DEFAULT 'START',
    temp_data TEXT NOT NULL DEFAULT '{}',
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rater_id TEXT NOT NULL,
    person1_id TEXT NOT NULL,
    person2_id TEXT NOT NULL,
    rating BOOLEAN NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(rater_id, person1_id, person2_id)
);
"#;

const TOP_MATCHES_SQL: &str = "\
SELECT u.messenger_id, u.gender, u.preference, u.photo_url, u.summary, \
       COUNT(r.rating) AS match_score \
FROM users u \
JOIN ratings r ON ((r.person1_id = u.messenger_id AND r.person2_id = ?) \
                OR (r.person2_id = u.messenger_id AND r.person1_id = ?)) \
WHERE u.messenger_id != ? AND r.rating = 1 \
GROUP BY u.messenger_id \
ORDER BY match_score DESC \
LIMIT 10";

/// Durable storage for profiles, per-subscriber conversation state, and
/// couple ratings.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

impl Store {
    /// Opens the database and creates the tables when missing. A single
    /// pooled connection: SQLite serializes writers anyway, and it keeps
    /// `:memory:` databases on one connection.
    pub fn open(database_url: &str) -> BotResult<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder().max_size(1).build(manager)?;

        let store = Self { pool };
        store.conn()?.batch_execute(SCHEMA_DDL)?;
        tracing::info!(database = %database_url, "store opened");
        Ok(store)
    }

    fn conn(&self) -> BotResult<PooledConnection<ConnectionManager<SqliteConnection>>> {
        Ok(self.pool.get()?)
    }

    pub fn get_user(&self, messenger_id: &str) -> BotResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::messenger_id.eq(messenger_id))
            .first::<User>(&mut conn)
            .optional()?)
    }

    /// Inserts a completed profile. Each subscriber gets exactly one row.
    pub fn create_user(&self, new_user: NewUser) -> BotResult<User> {
        let mut conn = self.conn()?;
        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result::<User>(&mut conn)
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => BotError::ProfileExists(new_user.messenger_id.clone()),
                other => BotError::Storage(other),
            })?;

        tracing::info!(subscriber = %user.messenger_id, "profile created");
        Ok(user)
    }

    /// Returns the persisted step and scratch profile, or the synthesized
    /// `(START, empty)` default when the subscriber has no row yet.
    pub fn conversation_state(&self, messenger_id: &str) -> BotResult<(SetupStep, PartialProfile)> {
        let mut conn = self.conn()?;
        let row = conversation_states::table
            .find(messenger_id)
            .first::<ConversationStateRow>(&mut conn)
            .optional()?;

        match row {
            Some(row) => {
                let profile: PartialProfile = serde_json::from_str(&row.temp_data)?;
                Ok((row.current_step, profile))
            }
            None => Ok((SetupStep::Start, PartialProfile::default())),
        }
    }

    /// Whole-row replace keyed by subscriber id.
    pub fn set_conversation_state(
        &self,
        messenger_id: &str,
        step: SetupStep,
        profile: &PartialProfile,
    ) -> BotResult<()> {
        let mut conn = self.conn()?;
        let state = NewConversationState {
            messenger_id,
            current_step: step,
            temp_data: serde_json::to_string(profile)?,
        };
        diesel::replace_into(conversation_states::table)
            .values(&state)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Uniformly samples two distinct completed profiles, or None when fewer
    /// than two exist.
    pub fn pick_random_pair(&self) -> BotResult<Option<(User, User)>> {
        let mut conn = self.conn()?;
        let rows = users::table
            .filter(users::setup_completed.eq(true))
            .order(random())
            .limit(2)
            .load::<User>(&mut conn)?;

        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(first), Some(second)) => Ok(Some((first, second))),
            _ => Ok(None),
        }
    }

    /// Insert-or-replace keyed by (rater, person1, person2). The pair is
    /// canonicalized by id order, so (A,B) and (B,A) are one relation.
    pub fn upsert_rating(
        &self,
        rater_id: &str,
        person1_id: &str,
        person2_id: &str,
        rating: bool,
    ) -> BotResult<()> {
        let (person1_id, person2_id) = canonical_pair(person1_id, person2_id);
        let mut conn = self.conn()?;
        diesel::replace_into(ratings::table)
            .values(&NewRating {
                rater_id,
                person1_id,
                person2_id,
                rating,
            })
            .execute(&mut conn)?;
        Ok(())
    }

    /// Other users linked to `messenger_id` through positive couple votes
    /// (cast by anyone), ranked by vote count, at most 10.
    pub fn top_matches(&self, messenger_id: &str) -> BotResult<Vec<MatchEntry>> {
        let mut conn = self.conn()?;
        Ok(diesel::sql_query(TOP_MATCHES_SQL)
            .bind::<Text, _>(messenger_id)
            .bind::<Text, _>(messenger_id)
            .bind::<Text, _>(messenger_id)
            .load::<MatchEntry>(&mut conn)?)
    }
}

fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
