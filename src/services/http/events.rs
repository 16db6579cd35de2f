use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use super::{dispatch, json_body, path_params, AppState};
use crate::models::events::{
    NewPersonalEvent, PersonalEventDetails, PersonalEventListing, PersonalEventParticipantView,
};
use crate::models::participants::{NewParticipant, ParticipantUpdate};
use crate::services::events::PersonalEventRequest;
use crate::services::ServiceError;

pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<PersonalEventListing>>, ServiceError> {
    let events = dispatch(&state.event_channel, |response| {
        PersonalEventRequest::ListEvents { response }
    })
    .await?;

    Ok(Json(events))
}

pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<NewPersonalEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<PersonalEventDetails>), ServiceError> {
    let new_event = json_body(payload)?;

    let event = dispatch(&state.event_channel, |response| {
        PersonalEventRequest::CreateEvent {
            new_event,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_event(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<PersonalEventDetails>, ServiceError> {
    let id = path_params(path)?;

    let event = dispatch(&state.event_channel, |response| {
        PersonalEventRequest::GetEvent { id, response }
    })
    .await?;

    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ServiceError> {
    let id = path_params(path)?;

    dispatch(&state.event_channel, |response| {
        PersonalEventRequest::DeleteEvent { id, response }
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_participant(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<NewParticipant>, JsonRejection>,
) -> Result<(StatusCode, Json<PersonalEventDetails>), ServiceError> {
    let event_id = path_params(path)?;
    let participant = json_body(payload)?;

    let event = dispatch(&state.event_channel, |response| {
        PersonalEventRequest::AddParticipant {
            event_id,
            participant,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_participant(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    payload: Result<Json<ParticipantUpdate>, JsonRejection>,
) -> Result<Json<PersonalEventParticipantView>, ServiceError> {
    let (event_id, member_id) = path_params(path)?;
    let update = json_body(payload)?;

    let participant = dispatch(&state.event_channel, |response| {
        PersonalEventRequest::UpdateParticipant {
            event_id,
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
    let (event_id, member_id) = path_params(path)?;

    dispatch(&state.event_channel, |response| {
        PersonalEventRequest::RemoveParticipant {
            event_id,
            member_id,
            response,
        }
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
