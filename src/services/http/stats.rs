use axum::{extract::State, Json};

use super::{dispatch, AppState};
use crate::models::stats::ClubStats;
use crate::services::stats::StatsRequest;
use crate::services::ServiceError;

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<ClubStats>, ServiceError> {
    let stats = dispatch(&state.stats_channel, |response| StatsRequest::GetStats {
        response,
    })
    .await?;

    Ok(Json(stats))
}
