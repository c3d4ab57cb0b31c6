use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted weekly report row. `report_text` holds the canonical
/// `StructuredReport` JSON; `schema_version` tags that payload format
/// at the storage layer. Rows are append-only — the freshest one per
/// user is the trusted report.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeeklyReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_text: String,
    pub stats: serde_json::Value,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub schema_version: i32,
    pub created_at: DateTime<Utc>,
}

/// The report payload consumers depend on. Field names are part of the
/// wire contract — do not rename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StructuredReport {
    pub sleep_score: i32,
    pub sleep_score_label: String,
    pub key_wins: Vec<String>,
    pub pattern_insights: Vec<String>,
    pub focus_recommendation: String,
    pub coach_note: String,
}

impl Default for StructuredReport {
    fn default() -> Self {
        Self {
            sleep_score: 0,
            sleep_score_label: String::new(),
            key_wins: Vec::new(),
            pattern_insights: Vec::new(),
            focus_recommendation: String::new(),
            coach_note: String::new(),
        }
    }
}

/// Trailing-7-day aggregate. Averages are NULL when the window is
/// empty, so every non-count field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeeklyStats {
    pub total_checkins: i64,
    pub avg_quality: Option<f64>,
    pub avg_mood: Option<f64>,
    pub avg_sleep_hours: Option<f64>,
    pub earliest_bedtime: Option<String>,
    pub latest_bedtime: Option<String>,
    pub earliest_wakeup: Option<String>,
    pub latest_wakeup: Option<String>,
    pub phone_nights: i64,
    pub avg_quality_phone: Option<f64>,
    pub avg_quality_no_phone: Option<f64>,
}

/// The prior week's aggregate, kept minimal — it only feeds trend
/// comparison.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrevWeekStats {
    pub total_checkins: i64,
    pub avg_quality: Option<f64>,
    pub avg_mood: Option<f64>,
    pub avg_sleep_hours: Option<f64>,
}
