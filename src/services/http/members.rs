use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use super::{dispatch, json_body, path_params, query_params, AppState};
use crate::models::members::{Member, MemberActivity, MemberFilter, MemberUpdate, NewMember};
use crate::services::members::MemberRequest;
use crate::services::ServiceError;

pub async fn list_members(
    State(state): State<AppState>,
    query: Result<Query<MemberFilter>, QueryRejection>,
) -> Result<Json<Vec<Member>>, ServiceError> {
    let filter = query_params(query)?;

    let members = dispatch(&state.member_channel, |response| {
        MemberRequest::ListMembers { filter, response }
    })
    .await?;

    Ok(Json(members))
}

pub async fn create_member(
    State(state): State<AppState>,
    payload: Result<Json<NewMember>, JsonRejection>,
) -> Result<(StatusCode, Json<Member>), ServiceError> {
    let new_member = json_body(payload)?;

    let member = dispatch(&state.member_channel, |response| {
        MemberRequest::CreateMember {
            new_member,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_member(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Member>, ServiceError> {
    let id = path_params(path)?;

    let member = dispatch(&state.member_channel, |response| MemberRequest::GetMember {
        id,
        response,
    })
    .await?;

    Ok(Json(member))
}

pub async fn update_member(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<MemberUpdate>, JsonRejection>,
) -> Result<Json<Member>, ServiceError> {
    let id = path_params(path)?;
    let update = json_body(payload)?;

    let member = dispatch(&state.member_channel, |response| {
        MemberRequest::UpdateMember {
            id,
            update,
            response,
        }
    })
    .await?;

    Ok(Json(member))
}

pub async fn set_member_active(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<MemberActivity>, JsonRejection>,
) -> Result<Json<Member>, ServiceError> {
    let id = path_params(path)?;
    let activity = json_body(payload)?;

    let member = dispatch(&state.member_channel, |response| MemberRequest::SetActive {
        id,
        is_active: activity.is_active,
        response,
    })
    .await?;

    Ok(Json(member))
}
