use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use super::{dispatch, json_body, path_params, AppState};
use crate::models::games::{GameDetails, GameListing, GameParticipantView, NewGame};
use crate::models::participants::{NewParticipant, ParticipantUpdate};
use crate::services::games::GameRequest;
use crate::services::ServiceError;

pub async fn list_games(
    State(state): State<AppState>,
) -> Result<Json<Vec<GameListing>>, ServiceError> {
    let games = dispatch(&state.game_channel, |response| GameRequest::ListGames {
        response,
    })
    .await?;

    Ok(Json(games))
}

pub async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<NewGame>, JsonRejection>,
) -> Result<(StatusCode, Json<GameDetails>), ServiceError> {
    let new_game = json_body(payload)?;

    let game = dispatch(&state.game_channel, |response| GameRequest::CreateGame {
        new_game,
        response,
    })
    .await?;

    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn get_game(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<GameDetails>, ServiceError> {
    let id = path_params(path)?;

    let game = dispatch(&state.game_channel, |response| GameRequest::GetGame {
        id,
        response,
    })
    .await?;

    Ok(Json(game))
}

pub async fn delete_game(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ServiceError> {
    let id = path_params(path)?;

    dispatch(&state.game_channel, |response| GameRequest::DeleteGame {
        id,
        response,
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_participant(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<NewParticipant>, JsonRejection>,
) -> Result<(StatusCode, Json<GameDetails>), ServiceError> {
    let game_id = path_params(path)?;
    let participant = json_body(payload)?;

    let game = dispatch(&state.game_channel, |response| {
        GameRequest::AddParticipant {
            game_id,
            participant,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn update_participant(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    payload: Result<Json<ParticipantUpdate>, JsonRejection>,
) -> Result<Json<GameParticipantView>, ServiceError> {
    let (game_id, member_id) = path_params(path)?;
    let update = json_body(payload)?;

    let participant = dispatch(&state.game_channel, |response| {
        GameRequest::UpdateParticipant {
            game_id,
            member_id,
            update,
            response,
        }
    })
    .await?;

    Ok(Json(participant))
}

pub async fn remove_participant(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<StatusCode, ServiceError> {
    let (game_id, member_id) = path_params(path)?;

    dispatch(&state.game_channel, |response| {
        GameRequest::RemoveParticipant {
            game_id,
            member_id,
            response,
        }
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
