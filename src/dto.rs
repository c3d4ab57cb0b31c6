//! Request/response DTOs for the API surface.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Request bodies use camelCase field names; stored rows serialize
//!   with their snake_case column names
//! - Validation is expressed via `validator` derives, with a custom
//!   check for 24-hour HH:MM times

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::checkin::Checkin;
use crate::models::profile::SleepChallenge;
use crate::models::report::StructuredReport;
use crate::services::scoring::{Mission, TrendPoint};

pub fn validate_hhmm(time: &str) -> Result<(), ValidationError> {
    if crate::services::scoring::time_to_minutes(time).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("must be a 24-hour HH:MM time"))
    }
}

// ============================================================================
// Users
// ============================================================================

/// POST /api/users
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(range(min = 13, max = 120, message = "Age must be between 13 and 120"))]
    pub age: Option<i32>,
}

// ============================================================================
// Sleep profiles
// ============================================================================

/// POST /api/sleep-profiles
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub user_id: Uuid,

    #[validate(custom = "validate_hhmm")]
    pub bedtime_goal: String,

    #[validate(custom = "validate_hhmm")]
    pub wakeup_goal: String,

    #[serde(default)]
    pub sleep_challenges: Vec<SleepChallenge>,
}

// ============================================================================
// Check-ins
// ============================================================================

/// POST /api/checkins
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckinRequest {
    pub user_id: Uuid,
    pub checkin_date: NaiveDate,

    #[validate(custom = "validate_hhmm")]
    pub bedtime: String,

    #[validate(custom = "validate_hhmm")]
    pub wakeup_time: String,

    #[validate(range(min = 1, max = 5, message = "Quality must be between 1 and 5"))]
    pub sleep_quality: i32,

    #[validate(range(min = 1, max = 5, message = "Mood must be between 1 and 5"))]
    pub mood: i32,

    #[validate(length(max = 500, message = "Notes must be 500 characters or less"))]
    pub notes: Option<String>,

    #[serde(default)]
    pub phone_before_bed: bool,
}

/// GET /api/checkins/:user_id
#[derive(Debug, Deserialize)]
pub struct ListCheckinsQuery {
    pub limit: Option<i64>,
}

/// The stored row plus the best-effort coaching note. Feedback is empty
/// when generation is unavailable — never an error.
#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    #[serde(flatten)]
    pub checkin: Checkin,
    #[serde(rename = "dailyFeedback")]
    pub daily_feedback: String,
}

// ============================================================================
// Dashboard
// ============================================================================

/// GET /api/dashboard/:user_id — the scoring-engine view model.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub sleep_score: i32,
    pub weekly_score: i32,
    pub streak: u32,
    pub streak_message: String,
    pub sleep_debt: f64,
    pub missions: Vec<Mission>,
    pub trend: Vec<TrendPoint>,
}

// ============================================================================
// Reports
// ============================================================================

/// GET /api/reports/:user_id/weekly
#[derive(Debug, Deserialize)]
pub struct WeeklyReportQuery {
    #[serde(default)]
    pub regenerate: bool,
}

/// GET /api/reports/:user_id/by-date
#[derive(Debug, Deserialize)]
pub struct ReportByDateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportResponse {
    pub report: StructuredReport,
    pub stats: serde_json::Value,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_partial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

// ============================================================================
// Feedback
// ============================================================================

/// POST /api/feedback
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub user_id: Uuid,

    #[validate(length(min = 1, max = 1000, message = "Message must be 1-1000 characters"))]
    pub message: String,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── CreateCheckinRequest ─────────────────────────────────────────

    #[test]
    fn test_checkin_request_deserializes_camel_case() {
        let json = r#"{
            "userId": "7f1a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8",
            "checkinDate": "2026-02-10",
            "bedtime": "23:00",
            "wakeupTime": "07:00",
            "sleepQuality": 4,
            "mood": 3,
            "phoneBeforeBed": true
        }"#;
        let req: CreateCheckinRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.bedtime, "23:00");
        assert!(req.phone_before_bed);
        assert!(req.notes.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_checkin_request_phone_defaults_false() {
        let json = r#"{
            "userId": "7f1a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8",
            "checkinDate": "2026-02-10",
            "bedtime": "23:00",
            "wakeupTime": "07:00",
            "sleepQuality": 4,
            "mood": 3
        }"#;
        let req: CreateCheckinRequest = serde_json::from_str(json).unwrap();
        assert!(!req.phone_before_bed);
    }

    #[test]
    fn test_checkin_request_rejects_out_of_range_rating() {
        let json = r#"{
            "userId": "7f1a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8",
            "checkinDate": "2026-02-10",
            "bedtime": "23:00",
            "wakeupTime": "07:00",
            "sleepQuality": 6,
            "mood": 3
        }"#;
        let req: CreateCheckinRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_checkin_request_rejects_bad_time() {
        let json = r#"{
            "userId": "7f1a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8",
            "checkinDate": "2026-02-10",
            "bedtime": "25:00",
            "wakeupTime": "07:00",
            "sleepQuality": 4,
            "mood": 3
        }"#;
        let req: CreateCheckinRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_checkin_request_rejects_long_notes() {
        let json = format!(
            r#"{{
                "userId": "7f1a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8",
                "checkinDate": "2026-02-10",
                "bedtime": "23:00",
                "wakeupTime": "07:00",
                "sleepQuality": 4,
                "mood": 3,
                "notes": "{}"
            }}"#,
            "x".repeat(501)
        );
        let req: CreateCheckinRequest = serde_json::from_str(&json).unwrap();
        assert!(req.validate().is_err());
    }

    // ── CreateProfileRequest ─────────────────────────────────────────

    #[test]
    fn test_profile_request_parses_challenges() {
        let json = r#"{
            "userId": "7f1a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8",
            "bedtimeGoal": "23:00",
            "wakeupGoal": "07:00",
            "sleepChallenges": ["phone", "caffeine"]
        }"#;
        let req: CreateProfileRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.sleep_challenges,
            vec![SleepChallenge::Phone, SleepChallenge::Caffeine]
        );
    }

    #[test]
    fn test_profile_request_rejects_unknown_challenge() {
        let json = r#"{
            "userId": "7f1a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8",
            "bedtimeGoal": "23:00",
            "wakeupGoal": "07:00",
            "sleepChallenges": ["doomscrolling"]
        }"#;
        assert!(serde_json::from_str::<CreateProfileRequest>(json).is_err());
    }

    // ── WeeklyReportResponse ─────────────────────────────────────────

    #[test]
    fn test_report_response_serializes_camel_case() {
        let resp = WeeklyReportResponse {
            report: StructuredReport::default(),
            stats: serde_json::json!({ "total_checkins": 3 }),
            week_start: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            week_end: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            generated_at: Utc::now(),
            is_partial: Some(true),
            cached: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("weekStart").is_some());
        assert!(json.get("weekEnd").is_some());
        assert!(json.get("generatedAt").is_some());
        assert_eq!(json["isPartial"], true);
        assert!(json.get("cached").is_none(), "unset cached flag must be omitted");
        assert!(json["report"].get("sleep_score").is_some());
    }
}
