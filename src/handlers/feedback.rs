use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::dto::CreateFeedbackRequest;
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(body): Json<CreateFeedbackRequest>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let feedback = sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (id, user_id, message, rating)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(body.user_id)
    .bind(body.message.trim())
    .bind(body.rating)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(feedback)))
}
