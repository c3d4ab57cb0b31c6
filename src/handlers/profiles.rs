use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::dto::CreateProfileRequest;
use crate::error::{AppError, AppResult};
use crate::models::profile::SleepProfile;
use crate::AppState;

/// Onboarding: record sleep goals and challenges. A new row supersedes
/// any earlier profile — readers always take the latest.
pub async fn create_profile(
    State(state): State<AppState>,
    Json(body): Json<CreateProfileRequest>,
) -> AppResult<(StatusCode, Json<SleepProfile>)> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = sqlx::query_as::<_, SleepProfile>(
        r#"
        INSERT INTO sleep_profiles (id, user_id, bedtime_goal, wakeup_goal, sleep_challenges)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(body.user_id)
    .bind(&body.bedtime_goal)
    .bind(&body.wakeup_goal)
    .bind(&body.sleep_challenges)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<SleepProfile>> {
    let profile = latest_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sleep profile not found".into()))?;

    Ok(Json(profile))
}

/// The active profile for a user, if any (latest wins).
pub(crate) async fn latest_profile(
    db: &PgPool,
    user_id: Uuid,
) -> Result<Option<SleepProfile>, sqlx::Error> {
    sqlx::query_as::<_, SleepProfile>(
        r#"
        SELECT * FROM sleep_profiles
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
}
