use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot, watch};
use tower_http::trace::TraceLayer;

use super::events::PersonalEventRequest;
use super::games::GameRequest;
use super::members::MemberRequest;
use super::payments::PaymentRequest;
use super::stats::StatsRequest;
use super::ServiceError;

mod events;
mod games;
mod members;
mod payments;
mod stats;

#[derive(Clone)]
pub struct AppState {
    pub member_channel: mpsc::Sender<MemberRequest>,
    pub game_channel: mpsc::Sender<GameRequest>,
    pub event_channel: mpsc::Sender<PersonalEventRequest>,
    pub payment_channel: mpsc::Sender<PaymentRequest>,
    pub stats_channel: mpsc::Sender<StatsRequest>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ServiceError::Validation(details) => {
                (StatusCode::BAD_REQUEST, "Validation error", details)
            }
            ServiceError::NotFound(details) => (StatusCode::NOT_FOUND, "Not found", details),
            other => {
                log::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": error,
                "details": details
            })),
        )
            .into_response()
    }
}

/// Sends a request to a service and waits for its answer.
async fn dispatch<R, T>(
    channel: &mpsc::Sender<R>,
    request: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication("HTTP".to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication("HTTP".to_string(), e.to_string()))?
}

/// Malformed bodies are reported as validation errors.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

fn path_params<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ServiceError> {
    path.map(|Path(params)| params)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ServiceError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route(
            "/members/{id}",
            get(members::get_member).put(members::update_member),
        )
        .route("/members/{id}/active", patch(members::set_member_active))
        .route(
            "/members/{id}/payments/info",
            get(payments::get_payment_info),
        )
        .route("/members/{id}/payments/bulk", post(payments::bulk_update))
        .route("/games", get(games::list_games).post(games::create_game))
        .route("/games/{id}", get(games::get_game).delete(games::delete_game))
        .route("/games/{id}/participants", post(games::add_participant))
        .route(
            "/games/{id}/participants/{member_id}",
            patch(games::update_participant).delete(games::remove_participant),
        )
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/{id}",
            get(events::get_event).delete(events::delete_event),
        )
        .route("/events/{id}/participants", post(events::add_participant))
        .route(
            "/events/{id}/participants/{member_id}",
            patch(events::update_participant).delete(events::remove_participant),
        )
        .route("/stats", get(stats::get_stats))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    app_state: AppState,
    listen: &str,
    shutdown: watch::Sender<bool>,
) -> Result<(), anyhow::Error> {
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Could not listen for shutdown signal: {}", e);
            }
            log::info!("Shutdown signal received.");
            let _ = shutdown.send(true);
        })
        .await?;

    Ok(())
}
