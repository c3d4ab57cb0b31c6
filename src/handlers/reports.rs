use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::{ReportByDateQuery, WeeklyReportQuery, WeeklyReportResponse};
use crate::error::{AppError, AppResult};
use crate::models::report::{PrevWeekStats, WeeklyReport};
use crate::models::user::User;
use crate::services::ai;
use crate::services::report::{
    compute_stats_from_checkins, decode_stored_report, report_is_fresh,
};
use crate::AppState;

/// Version tag written alongside every persisted report payload.
const REPORT_SCHEMA_VERSION: i32 = 1;

/// Generate (or serve the cached) weekly report.
///
/// The pipeline: resolve user and profile, aggregate the trailing week
/// (falling back to the most recent check-ins when the calendar window
/// is empty), serve a fresh cached report unless regeneration was
/// requested, otherwise gather previous-week stats, run the generator
/// (or its deterministic fallback), persist, and return.
pub async fn get_weekly_report(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<WeeklyReportQuery>,
) -> AppResult<Json<WeeklyReportResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let profile = crate::handlers::profiles::latest_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No sleep profile found. Complete onboarding first.".into())
        })?;

    let now = Utc::now();
    let today = now.date_naive();
    let week_start = today - Duration::days(7);

    let stats = crate::handlers::checkins::weekly_summary(&state.db, user_id, week_start).await?;

    if stats.total_checkins == 0 {
        let total = total_checkin_count(&state.db, user_id).await?;
        if total == 0 {
            return Err(AppError::NotFound(
                "No check-ins found. Log your first sleep entry to get a report.".into(),
            ));
        }
    }

    if !query.regenerate {
        if let Some(existing) = latest_report(&state.db, user_id).await? {
            if report_is_fresh(existing.created_at, now, state.config.report_cache_ttl_hours) {
                return Ok(Json(WeeklyReportResponse {
                    report: decode_stored_report(&existing.report_text),
                    stats: existing.stats,
                    week_start: existing.week_start,
                    week_end: existing.week_end,
                    generated_at: existing.created_at,
                    is_partial: None,
                    cached: Some(true),
                }));
            }
        }
    }

    let mut checkins = checkins_in_window(&state.db, user_id, week_start).await?;
    let prev = previous_week_summary(&state.db, user_id, today).await?;

    let mut final_stats = stats;
    if final_stats.total_checkins == 0 {
        // Nothing in the calendar window: report over the most recent
        // check-ins instead, recomputing the aggregate by hand.
        checkins = crate::handlers::checkins::recent_checkins(&state.db, user_id, 7).await?;
        if !checkins.is_empty() {
            final_stats = compute_stats_from_checkins(&checkins);
        }
    }

    let is_partial = final_stats.total_checkins < state.config.partial_report_threshold;

    let report = ai::generate_weekly_report(
        &state.text_generator,
        &user.name,
        &final_stats,
        &profile,
        prev.as_ref(),
        &checkins,
    )
    .await;

    let report_text =
        serde_json::to_string(&report).map_err(|e| AppError::Internal(e.into()))?;
    let stats_snapshot =
        serde_json::to_value(&final_stats).map_err(|e| AppError::Internal(e.into()))?;

    sqlx::query(
        r#"
        INSERT INTO weekly_reports
            (id, user_id, report_text, stats, week_start, week_end, schema_version)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&report_text)
    .bind(&stats_snapshot)
    .bind(week_start)
    .bind(today)
    .bind(REPORT_SCHEMA_VERSION)
    .execute(&state.db)
    .await?;

    Ok(Json(WeeklyReportResponse {
        report,
        stats: stats_snapshot,
        week_start,
        week_end: today,
        generated_at: now,
        is_partial: Some(is_partial),
        cached: Some(false),
    }))
}

/// Fetch the saved report whose week covers a given date.
pub async fn get_report_by_date(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ReportByDateQuery>,
) -> AppResult<Json<WeeklyReportResponse>> {
    let date = query
        .date
        .ok_or_else(|| AppError::Validation("Date query parameter is required".into()))?;

    let saved = sqlx::query_as::<_, WeeklyReport>(
        r#"
        SELECT * FROM weekly_reports
        WHERE user_id = $1 AND $2 BETWEEN week_start AND week_end
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("No report found for this date".into()))?;

    Ok(Json(WeeklyReportResponse {
        report: decode_stored_report(&saved.report_text),
        stats: saved.stats,
        week_start: saved.week_start,
        week_end: saved.week_end,
        generated_at: saved.created_at,
        is_partial: None,
        cached: None,
    }))
}

async fn total_checkin_count(db: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sleep_checkins WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
}

/// Newest saved report; freshest wins when concurrent regenerations
/// have both persisted.
async fn latest_report(db: &PgPool, user_id: Uuid) -> Result<Option<WeeklyReport>, sqlx::Error> {
    sqlx::query_as::<_, WeeklyReport>(
        r#"
        SELECT * FROM weekly_reports
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}

async fn checkins_in_window(
    db: &PgPool,
    user_id: Uuid,
    window_start: NaiveDate,
) -> Result<Vec<crate::models::checkin::Checkin>, sqlx::Error> {
    sqlx::query_as::<_, crate::models::checkin::Checkin>(
        r#"
        SELECT * FROM sleep_checkins
        WHERE user_id = $1 AND checkin_date >= $2
        ORDER BY checkin_date DESC
        "#,
    )
    .bind(user_id)
    .bind(window_start)
    .fetch_all(db)
    .await
}

/// Aggregate for the week before the current window. `None` when that
/// week has no check-ins, so trend labels degrade to "no data".
async fn previous_week_summary(
    db: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Option<PrevWeekStats>, sqlx::Error> {
    let row = sqlx::query_as::<_, PrevWeekStats>(
        r#"
        SELECT
            COUNT(*) AS total_checkins,
            ROUND(AVG(sleep_quality)::numeric, 1)::float8 AS avg_quality,
            ROUND(AVG(mood)::numeric, 1)::float8 AS avg_mood,
            ROUND(AVG(sleep_hours)::numeric, 1)::float8 AS avg_sleep_hours
        FROM sleep_checkins
        WHERE user_id = $1 AND checkin_date >= $2 AND checkin_date < $3
        "#,
    )
    .bind(user_id)
    .bind(today - Duration::days(14))
    .bind(today - Duration::days(7))
    .fetch_one(db)
    .await?;

    Ok((row.total_checkins > 0).then_some(row))
}
