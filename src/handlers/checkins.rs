use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{CheckinResponse, CreateCheckinRequest, ListCheckinsQuery};
use crate::error::{AppError, AppResult};
use crate::models::checkin::Checkin;
use crate::models::report::WeeklyStats;
use crate::services::{ai, scoring};
use crate::AppState;

/// Submit (or resubmit) a night's check-in. One row per user per day —
/// a second submission for the same date overwrites the first.
/// `sleep_hours` is derived here, the single write-time site.
pub async fn submit_checkin(
    State(state): State<AppState>,
    Json(body): Json<CreateCheckinRequest>,
) -> AppResult<(StatusCode, Json<CheckinResponse>)> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let sleep_hours = scoring::hours_of_sleep(&body.bedtime, &body.wakeup_time)
        .ok_or_else(|| AppError::Validation("Times must be in HH:MM format".into()))?;
    let sleep_hours = (sleep_hours * 100.0).round() / 100.0;

    let checkin = sqlx::query_as::<_, Checkin>(
        r#"
        INSERT INTO sleep_checkins
            (id, user_id, checkin_date, bedtime, wakeup_time, sleep_quality, mood,
             phone_before_bed, notes, sleep_hours)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (user_id, checkin_date) DO UPDATE SET
            bedtime = $4, wakeup_time = $5, sleep_quality = $6, mood = $7,
            phone_before_bed = $8, notes = $9, sleep_hours = $10
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(body.user_id)
    .bind(body.checkin_date)
    .bind(&body.bedtime)
    .bind(&body.wakeup_time)
    .bind(body.sleep_quality)
    .bind(body.mood)
    .bind(body.phone_before_bed)
    .bind(&body.notes)
    .bind(sleep_hours)
    .fetch_one(&state.db)
    .await?;

    // Best-effort coaching note: a failure here must never fail the
    // check-in that triggered it.
    let daily_feedback = if state.text_generator.is_configured() {
        match feedback_for_checkin(&state, &checkin).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Daily feedback generation failed (non-critical)");
                String::new()
            }
        }
    } else {
        String::new()
    };

    Ok((
        StatusCode::CREATED,
        Json(CheckinResponse {
            checkin,
            daily_feedback,
        }),
    ))
}

async fn feedback_for_checkin(
    state: &AppState,
    checkin: &Checkin,
) -> Result<String, anyhow::Error> {
    let profile = crate::handlers::profiles::latest_profile(&state.db, checkin.user_id).await?;
    ai::generate_daily_feedback(&state.text_generator, checkin, profile.as_ref()).await
}

pub async fn list_checkins(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListCheckinsQuery>,
) -> AppResult<Json<Vec<Checkin>>> {
    let limit = query.limit.unwrap_or(7);
    let checkins = recent_checkins(&state.db, user_id, limit).await?;
    Ok(Json(checkins))
}

pub async fn get_weekly_summary(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<WeeklyStats>> {
    let window_start = Utc::now().date_naive() - Duration::days(7);
    let stats = weekly_summary(&state.db, user_id, window_start).await?;
    Ok(Json(stats))
}

/// Most recent check-ins, newest first. The descending order is part of
/// the contract — streak and trend computations depend on it.
pub(crate) async fn recent_checkins(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<Checkin>, sqlx::Error> {
    sqlx::query_as::<_, Checkin>(
        r#"
        SELECT * FROM sleep_checkins
        WHERE user_id = $1
        ORDER BY checkin_date DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

/// Aggregate stats over check-ins on or after `window_start`. Returns a
/// single row even for an empty window (count 0, NULL averages).
pub(crate) async fn weekly_summary(
    db: &PgPool,
    user_id: Uuid,
    window_start: chrono::NaiveDate,
) -> Result<WeeklyStats, sqlx::Error> {
    sqlx::query_as::<_, WeeklyStats>(
        r#"
        SELECT
            COUNT(*) AS total_checkins,
            ROUND(AVG(sleep_quality)::numeric, 1)::float8 AS avg_quality,
            ROUND(AVG(mood)::numeric, 1)::float8 AS avg_mood,
            ROUND(AVG(sleep_hours)::numeric, 1)::float8 AS avg_sleep_hours,
            MIN(bedtime) AS earliest_bedtime,
            MAX(bedtime) AS latest_bedtime,
            MIN(wakeup_time) AS earliest_wakeup,
            MAX(wakeup_time) AS latest_wakeup,
            COUNT(*) FILTER (WHERE phone_before_bed) AS phone_nights,
            ROUND((AVG(sleep_quality) FILTER (WHERE phone_before_bed))::numeric, 1)::float8
                AS avg_quality_phone,
            ROUND((AVG(sleep_quality) FILTER (WHERE NOT phone_before_bed))::numeric, 1)::float8
                AS avg_quality_no_phone
        FROM sleep_checkins
        WHERE user_id = $1 AND checkin_date >= $2
        "#,
    )
    .bind(user_id)
    .bind(window_start)
    .fetch_one(db)
    .await
}
