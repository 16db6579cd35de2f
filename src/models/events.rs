use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::participants::NewParticipant;
use crate::balance::{self, ParticipationAmounts};

#[derive(Clone, Debug, Deserialize, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalEvent {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub total_cost: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalEventListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: PersonalEvent,
    pub participant_count: i64,
    pub paid_count: i64,
}

#[derive(Clone, Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalEventParticipant {
    pub id: String,
    pub personal_event_id: String,
    pub member_id: String,
    pub member_name: String,
    pub has_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub pre_paid: Option<i64>,
    pub pre_paid_category: Option<String>,
    pub custom_amount: Option<i64>,
}

impl ParticipationAmounts for PersonalEventParticipant {
    fn pre_paid(&self) -> Option<i64> {
        self.pre_paid
    }

    fn custom_amount(&self) -> Option<i64> {
        self.custom_amount
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalEventParticipantView {
    #[serde(flatten)]
    pub participant: PersonalEventParticipant,
    pub outstanding_amount: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalEventDetails {
    #[serde(flatten)]
    pub event: PersonalEvent,
    pub participants: Vec<PersonalEventParticipantView>,
}

impl PersonalEventDetails {
    pub fn new(event: PersonalEvent, participants: Vec<PersonalEventParticipant>) -> Self {
        let participants = participants
            .into_iter()
            .map(|participant| PersonalEventParticipantView {
                outstanding_amount: balance::event_outstanding(&participant),
                participant,
            })
            .collect();

        Self {
            event,
            participants,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPersonalEvent {
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub total_cost: Option<i64>,
    #[serde(default)]
    pub participants: Vec<NewParticipant>,
}

impl NewPersonalEvent {
    /// Explicit total, or the sum of what every participant owes.
    pub fn resolved_total_cost(&self) -> Result<i64, String> {
        match self.total_cost {
            Some(total_cost) => Ok(total_cost),
            None => self
                .participants
                .iter()
                .try_fold(0i64, |sum, p| sum.checked_add(p.custom_amount_or_zero()))
                .ok_or_else(|| "participant amounts are too large".to_string()),
        }
    }
}
