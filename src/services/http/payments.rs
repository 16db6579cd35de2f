use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use super::{dispatch, json_body, path_params, AppState};
use crate::models::payments::{BulkPaymentRequest, BulkPaymentResult, PaymentInfo};
use crate::services::payments::PaymentRequest;
use crate::services::ServiceError;

pub async fn get_payment_info(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<PaymentInfo>, ServiceError> {
    let member_id = path_params(path)?;

    let info = dispatch(&state.payment_channel, |response| {
        PaymentRequest::GetPaymentInfo {
            member_id,
            response,
        }
    })
    .await?;

    Ok(Json(info))
}

pub async fn bulk_update(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<BulkPaymentRequest>, JsonRejection>,
) -> Result<Json<BulkPaymentResult>, ServiceError> {
    let member_id = path_params(path)?;
    let (operation, target) = json_body(payload)?
        .parse()
        .map_err(ServiceError::Validation)?;

    let result = dispatch(&state.payment_channel, |response| {
        PaymentRequest::BulkUpdate {
            member_id,
            operation,
            target,
            response,
        }
    })
    .await?;

    Ok(Json(result))
}
