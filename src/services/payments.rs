use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::balance;
use crate::models::members::Member;
use crate::models::payments::{
    BulkOperation, BulkPaymentResult, BulkTarget, MemberRef, PaymentChange, PaymentInfo,
    UpdateCounts,
};
use crate::repositories::PaymentStore;
use crate::settings::BulkMode;

pub enum PaymentRequest {
    GetPaymentInfo {
        member_id: String,
        response: oneshot::Sender<Result<PaymentInfo, ServiceError>>,
    },
    BulkUpdate {
        member_id: String,
        operation: BulkOperation,
        target: BulkTarget,
        response: oneshot::Sender<Result<BulkPaymentResult, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PaymentRequestHandler<S: PaymentStore> {
    store: S,
    bulk_mode: BulkMode,
}

impl<S: PaymentStore> PaymentRequestHandler<S> {
    pub fn new(store: S, bulk_mode: BulkMode) -> Self {
        PaymentRequestHandler { store, bulk_mode }
    }

    async fn require_member(&self, member_id: &str) -> Result<Member, ServiceError> {
        self.store
            .find_member(member_id)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| ServiceError::NotFound(format!("Member {} not found.", member_id)))
    }

    pub async fn payment_info(&self, member_id: &str) -> Result<PaymentInfo, ServiceError> {
        let member = self.require_member(member_id).await?;

        let mut unpaid_games = self
            .store
            .unpaid_games(member_id)
            .await
            .map_err(ServiceError::from_repository)?;
        let mut unpaid_events = self
            .store
            .unpaid_events(member_id)
            .await
            .map_err(ServiceError::from_repository)?;

        for game in unpaid_games.iter_mut() {
            let outstanding = balance::game_outstanding(game.cost_per_member, &*game);
            game.outstanding_amount = outstanding;
        }
        for event in unpaid_events.iter_mut() {
            let outstanding = balance::event_outstanding(&*event);
            event.outstanding_amount = outstanding;
        }

        let summary = balance::summarize(&unpaid_games, &unpaid_events);

        Ok(PaymentInfo {
            member: MemberRef {
                id: member.id,
                name: member.name,
            },
            unpaid_games,
            unpaid_personal_events: unpaid_events,
            summary,
        })
    }

    pub async fn bulk_update(
        &self,
        member_id: &str,
        operation: BulkOperation,
        target: BulkTarget,
    ) -> Result<BulkPaymentResult, ServiceError> {
        self.require_member(member_id).await?;

        let change = PaymentChange::for_operation(operation, Utc::now());
        let counts = match self.bulk_mode {
            BulkMode::Transactional => self
                .store
                .set_paid_atomically(member_id, change, target)
                .await
                .map_err(ServiceError::from_repository)?,
            BulkMode::BestEffort => self.bulk_update_per_kind(member_id, change, target).await?,
        };

        log::info!(
            "{} for member {}: {} game and {} personal event participations updated.",
            operation,
            member_id,
            counts.games,
            counts.personal_events
        );

        Ok(BulkPaymentResult::new(operation, target, counts))
    }

    /// Each kind is a separate set-based update. Games are not rolled back if
    /// the personal event update fails afterwards.
    async fn bulk_update_per_kind(
        &self,
        member_id: &str,
        change: PaymentChange,
        target: BulkTarget,
    ) -> Result<UpdateCounts, ServiceError> {
        let mut counts = UpdateCounts::default();

        if target.includes_games() {
            counts.games = self
                .store
                .set_games_paid(member_id, change)
                .await
                .map_err(ServiceError::from_repository)?;
        }

        if target.includes_events() {
            counts.personal_events = self
                .store
                .set_events_paid(member_id, change)
                .await
                .map_err(|e| {
                    if counts.games > 0 {
                        log::warn!(
                            "Personal event update failed for member {} after {} game participations were already updated.",
                            member_id,
                            counts.games
                        );
                    }
                    ServiceError::from_repository(e)
                })?;
        }

        Ok(counts)
    }
}

#[async_trait]
impl<S: PaymentStore> RequestHandler<PaymentRequest> for PaymentRequestHandler<S> {
    async fn handle_request(&self, request: PaymentRequest) {
        match request {
            PaymentRequest::GetPaymentInfo {
                member_id,
                response,
            } => {
                let info = self.payment_info(&member_id).await;
                let _ = response.send(info);
            }
            PaymentRequest::BulkUpdate {
                member_id,
                operation,
                target,
                response,
            } => {
                let result = self.bulk_update(&member_id, operation, target).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct PaymentService;

impl PaymentService {
    pub fn new() -> Self {
        PaymentService {}
    }
}

#[async_trait]
impl<S: PaymentStore> Service<PaymentRequest, PaymentRequestHandler<S>> for PaymentService {}
