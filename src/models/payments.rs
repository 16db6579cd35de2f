use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::balance::ParticipationAmounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    MarkAllPaid,
    MarkAllUnpaid,
}

impl BulkOperation {
    /// Value `has_paid` ends up with.
    pub fn target_state(self) -> bool {
        matches!(self, BulkOperation::MarkAllPaid)
    }
}

impl FromStr for BulkOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark_all_paid" => Ok(BulkOperation::MarkAllPaid),
            "mark_all_unpaid" => Ok(BulkOperation::MarkAllUnpaid),
            other => Err(format!(
                "invalid operation '{other}', expected mark_all_paid or mark_all_unpaid"
            )),
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkOperation::MarkAllPaid => write!(f, "mark_all_paid"),
            BulkOperation::MarkAllUnpaid => write!(f, "mark_all_unpaid"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkTarget {
    Games,
    PersonalEvents,
    Both,
}

impl BulkTarget {
    pub fn includes_games(self) -> bool {
        matches!(self, BulkTarget::Games | BulkTarget::Both)
    }

    pub fn includes_events(self) -> bool {
        matches!(self, BulkTarget::PersonalEvents | BulkTarget::Both)
    }
}

impl FromStr for BulkTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "games" => Ok(BulkTarget::Games),
            "personal_events" => Ok(BulkTarget::PersonalEvents),
            "both" => Ok(BulkTarget::Both),
            other => Err(format!(
                "invalid type '{other}', expected games, personal_events or both"
            )),
        }
    }
}

/// Raw bulk request body. Parsed by hand so bad values become 400s with a
/// readable message.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BulkPaymentRequest {
    pub operation: Option<String>,
    #[serde(rename = "type")]
    pub target: Option<String>,
}

impl BulkPaymentRequest {
    pub fn parse(&self) -> Result<(BulkOperation, BulkTarget), String> {
        let operation = self
            .operation
            .as_deref()
            .ok_or_else(|| "operation is required".to_string())?
            .parse()?;
        let target = match self.target.as_deref() {
            Some(target) => target.parse()?,
            None => BulkTarget::Both,
        };

        Ok((operation, target))
    }
}

/// Column values written by a bulk update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentChange {
    pub has_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentChange {
    pub fn for_operation(operation: BulkOperation, now: DateTime<Utc>) -> Self {
        let has_paid = operation.target_state();

        Self {
            has_paid,
            paid_at: has_paid.then_some(now),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateCounts {
    pub games: u64,
    pub personal_events: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkPaymentResult {
    pub operation: BulkOperation,
    #[serde(rename = "type")]
    pub target: BulkTarget,
    pub games_updated: u64,
    pub personal_events_updated: u64,
    pub total_updated: u64,
}

impl BulkPaymentResult {
    pub fn new(operation: BulkOperation, target: BulkTarget, counts: UpdateCounts) -> Self {
        Self {
            operation,
            target,
            games_updated: counts.games,
            personal_events_updated: counts.personal_events,
            total_updated: counts.games + counts.personal_events,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidGame {
    pub participant_id: String,
    pub game_id: String,
    pub title: Option<String>,
    pub date: DateTime<Utc>,
    pub location: String,
    pub cost_per_member: Option<i64>,
    pub pre_paid: Option<i64>,
    pub pre_paid_category: Option<String>,
    pub custom_amount: Option<i64>,
    #[sqlx(skip)]
    pub outstanding_amount: i64,
}

impl ParticipationAmounts for UnpaidGame {
    fn pre_paid(&self) -> Option<i64> {
        self.pre_paid
    }

    fn custom_amount(&self) -> Option<i64> {
        self.custom_amount
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidEvent {
    pub participant_id: String,
    pub personal_event_id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub total_cost: i64,
    pub pre_paid: Option<i64>,
    pub pre_paid_category: Option<String>,
    pub custom_amount: Option<i64>,
    #[sqlx(skip)]
    pub outstanding_amount: i64,
}

impl ParticipationAmounts for UnpaidEvent {
    fn pre_paid(&self) -> Option<i64> {
        self.pre_paid
    }

    fn custom_amount(&self) -> Option<i64> {
        self.custom_amount
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub total_unpaid_games: usize,
    pub total_unpaid_events: usize,
    pub total_unpaid_items: usize,
    pub games_outstanding: i64,
    pub events_outstanding: i64,
    pub total_outstanding: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub member: MemberRef,
    pub unpaid_games: Vec<UnpaidGame>,
    pub unpaid_personal_events: Vec<UnpaidEvent>,
    pub summary: PaymentSummary,
}
