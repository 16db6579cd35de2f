use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::{oneshot, watch, RwLock};
use tokio::task::JoinHandle;

use super::{RequestHandler, Service, ServiceError};
use crate::balance;
use crate::models::payments::{UnpaidEvent, UnpaidGame};
use crate::models::stats::{ClubCounts, ClubStats};
use crate::repositories::stats::StatsRepository;

pub enum StatsRequest {
    GetStats {
        response: oneshot::Sender<Result<ClubStats, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct StatsRequestHandler {
    repository: StatsRepository,
    stats_cache: Arc<RwLock<ClubStats>>,
}

impl StatsRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        let repository = StatsRepository::new(sql_conn);

        Self {
            repository,
            stats_cache: Arc::new(RwLock::new(ClubStats::default())),
        }
    }

    /// Refreshes the cache every `period` until `shutdown` flips.
    pub fn start_refresh_task(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let handler = self.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = handler.refresh().await {
                            log::error!("Error refreshing club stats: {}", e);
                        }
                    }
                    _ = shutdown.changed() => {
                        log::info!("Stopping stats refresh task.");
                        break;
                    }
                }
            }
        });

        log::info!("Stats refresh task started ({}s interval).", period.as_secs());
        task
    }

    async fn refresh(&self) -> Result<(), anyhow::Error> {
        let counts = self.repository.get_counts().await?;
        let unpaid_games = self.repository.unpaid_games().await?;
        let unpaid_events = self.repository.unpaid_events().await?;

        let stats = compute_stats(counts, &unpaid_games, &unpaid_events, Utc::now());
        log::debug!(
            "Refreshed club stats: {} unpaid participations, {} outstanding.",
            stats.unpaid_participations,
            stats.total_outstanding
        );

        let mut cache = self.stats_cache.write().await;
        *cache = stats;

        Ok(())
    }

    async fn get_stats(&self) -> Result<ClubStats, ServiceError> {
        let cache = self.stats_cache.read().await;
        Ok(cache.clone())
    }
}

fn compute_stats(
    counts: ClubCounts,
    unpaid_games: &[UnpaidGame],
    unpaid_events: &[UnpaidEvent],
    now: DateTime<Utc>,
) -> ClubStats {
    let games_outstanding = unpaid_games.iter().fold(0i64, |sum, g| {
        sum.saturating_add(balance::game_outstanding(g.cost_per_member, g))
    });
    let events_outstanding = unpaid_events.iter().fold(0i64, |sum, e| {
        sum.saturating_add(balance::event_outstanding(e))
    });

    ClubStats {
        members: counts.members,
        active_members: counts.active_members,
        games: counts.games,
        personal_events: counts.personal_events,
        unpaid_participations: (unpaid_games.len() + unpaid_events.len()) as i64,
        total_outstanding: games_outstanding.saturating_add(events_outstanding),
        refreshed_at: Some(now),
    }
}

#[async_trait]
impl RequestHandler<StatsRequest> for StatsRequestHandler {
    async fn handle_request(&self, request: StatsRequest) {
        match request {
            StatsRequest::GetStats { response } => {
                let stats = self.get_stats().await;
                let _ = response.send(stats);
            }
        }
    }
}

pub struct StatsService;

impl StatsService {
    pub fn new() -> Self {
        StatsService {}
    }
}

#[async_trait]
impl Service<StatsRequest, StatsRequestHandler> for StatsService {}
