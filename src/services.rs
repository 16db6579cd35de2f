use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::{mpsc, watch};

use crate::repositories::{
    GameRepository, MemberRepository, PaymentRepository, PersonalEventRepository, StoreError,
};
use crate::settings::Settings;

mod events;
mod games;
mod http;
mod members;
mod payments;
mod stats;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

impl ServiceError {
    /// Constraint violations come from bad input. Anything else the store
    /// reports is ours.
    pub fn from_repository(e: anyhow::Error) -> Self {
        match e.downcast_ref::<StoreError>() {
            Some(StoreError::Conflict(details)) => {
                ServiceError::Validation(format!("Duplicate value: {}", details))
            }
            Some(StoreError::MissingReference(details)) => {
                ServiceError::Validation(format!("Unknown reference: {}", details))
            }
            None => ServiceError::Database(e.to_string()),
        }
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(
    pool: PgPool,
    settings: Settings,
    listen: &str,
) -> Result<(), anyhow::Error> {
    let (member_tx, mut member_rx) = mpsc::channel(512);
    let (game_tx, mut game_rx) = mpsc::channel(512);
    let (event_tx, mut event_rx) = mpsc::channel(512);
    let (payment_tx, mut payment_rx) = mpsc::channel(512);
    let (stats_tx, mut stats_rx) = mpsc::channel(512);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut member_service = members::MemberService::new();
    let mut game_service = games::GameService::new();
    let mut event_service = events::PersonalEventService::new();
    let mut payment_service = payments::PaymentService::new();
    let mut stats_service = stats::StatsService::new();

    log::info!("Starting member service.");
    let member_pool = pool.clone();
    tokio::spawn(async move {
        member_service
            .run(
                members::MemberRequestHandler::new(MemberRepository::new(member_pool)),
                &mut member_rx,
            )
            .await;
    });

    log::info!("Starting game service.");
    let game_pool = pool.clone();
    tokio::spawn(async move {
        game_service
            .run(
                games::GameRequestHandler::new(GameRepository::new(game_pool)),
                &mut game_rx,
            )
            .await;
    });

    log::info!("Starting personal event service.");
    let event_pool = pool.clone();
    tokio::spawn(async move {
        event_service
            .run(
                events::PersonalEventRequestHandler::new(PersonalEventRepository::new(event_pool)),
                &mut event_rx,
            )
            .await;
    });

    log::info!(
        "Starting payment service ({:?} bulk updates).",
        settings.payments.bulk_mode
    );
    let payment_pool = pool.clone();
    let bulk_mode = settings.payments.bulk_mode;
    tokio::spawn(async move {
        let handler =
            payments::PaymentRequestHandler::new(PaymentRepository::new(payment_pool), bulk_mode);

        payment_service.run(handler, &mut payment_rx).await;
    });

    log::info!("Starting stats service.");
    let stats_pool = pool.clone();
    let refresh_interval = Duration::from_secs(settings.stats.refresh_interval_secs.max(1));
    tokio::spawn(async move {
        let handler = stats::StatsRequestHandler::new(stats_pool);
        handler.start_refresh_task(refresh_interval, shutdown_rx);

        stats_service.run(handler, &mut stats_rx).await;
    });

    log::info!("Starting HTTP server.");
    let app_state = http::AppState {
        member_channel: member_tx,
        game_channel: game_tx,
        event_channel: event_tx,
        payment_channel: payment_tx,
        stats_channel: stats_tx,
    };
    http::start_http_server(app_state, listen, shutdown_tx).await?;

    log::info!("Services stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_errors_map_to_database() {
        let error = ServiceError::from_repository(anyhow::anyhow!("connection refused"));

        assert!(matches!(error, ServiceError::Database(message) if message == "connection refused"));
    }

    #[test]
    fn test_row_not_found_is_not_a_validation_error() {
        let error = ServiceError::from_repository(sqlx::Error::RowNotFound.into());

        assert!(matches!(error, ServiceError::Database(_)));
    }

    #[test]
    fn test_constraint_violations_are_validation_errors() {
        let duplicate = ServiceError::from_repository(
            StoreError::Conflict("members_name_key".to_string()).into(),
        );
        let unknown = ServiceError::from_repository(
            StoreError::MissingReference("game_participants_member_id_fkey".to_string()).into(),
        );

        assert!(matches!(duplicate, ServiceError::Validation(m) if m.contains("members_name_key")));
        assert!(matches!(unknown, ServiceError::Validation(m) if m.starts_with("Unknown reference")));
    }

    #[test]
    fn test_plain_sqlx_errors_pass_through_constraint_mapping() {
        let error = crate::repositories::constraint_violation(sqlx::Error::PoolTimedOut);

        assert!(matches!(
            ServiceError::from_repository(error),
            ServiceError::Database(_)
        ));
    }
}
