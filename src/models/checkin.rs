use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One night's sleep record. Bedtime and wakeup are wall-clock "HH:MM"
/// strings; `sleep_hours` is derived at write time and handles the
/// midnight crossing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Checkin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub checkin_date: NaiveDate,
    pub bedtime: String,
    pub wakeup_time: String,
    pub sleep_quality: i32,
    pub mood: i32,
    pub phone_before_bed: bool,
    pub notes: Option<String>,
    pub sleep_hours: f64,
    pub created_at: DateTime<Utc>,
}
