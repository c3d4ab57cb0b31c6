use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's sleep goals from onboarding. The latest row per user is the
/// active one; older rows are kept but never read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SleepProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bedtime_goal: String,
    pub wakeup_goal: String,
    pub sleep_challenges: Vec<SleepChallenge>,
    pub created_at: DateTime<Utc>,
}

/// Fixed vocabulary of self-reported sleep obstacles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "sleep_challenge", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SleepChallenge {
    Phone,
    Stress,
    Caffeine,
    Irregular,
    Noise,
    Naps,
}

impl sqlx::postgres::PgHasArrayType for SleepChallenge {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_sleep_challenge")
    }
}

impl SleepChallenge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Stress => "stress",
            Self::Caffeine => "caffeine",
            Self::Irregular => "irregular",
            Self::Noise => "noise",
            Self::Naps => "naps",
        }
    }
}
