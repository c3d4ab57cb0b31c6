use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::dto::DashboardResponse;
use crate::error::AppResult;
use crate::services::scoring;
use crate::AppState;

/// The scoring-engine view model for the home screen: latest-night
/// score, weekly average, streak, sleep debt, tonight's missions, and
/// the 7-day trend. Degrades to neutral values for a user with no
/// data — never an error.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<DashboardResponse>> {
    let checkins = crate::handlers::checkins::recent_checkins(&state.db, user_id, 7).await?;
    let profile = crate::handlers::profiles::latest_profile(&state.db, user_id).await?;
    let profile = profile.as_ref();
    let today = Utc::now().date_naive();

    let streak = scoring::compute_streak(&checkins, today);

    Ok(Json(DashboardResponse {
        sleep_score: checkins
            .first()
            .map(|c| scoring::compute_sleep_score(c, profile))
            .unwrap_or(0),
        weekly_score: scoring::compute_weekly_score(&checkins, profile),
        streak,
        streak_message: scoring::streak_message(streak),
        sleep_debt: scoring::compute_sleep_debt(&checkins, profile),
        missions: scoring::generate_missions(profile),
        trend: scoring::build_trend_data(&checkins, profile),
    }))
}
