use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipant {
    pub member_id: String,
    pub pre_paid: Option<i64>,
    pub pre_paid_category: Option<String>,
    pub custom_amount: Option<i64>,
}

impl NewParticipant {
    pub fn pre_paid_or_zero(&self) -> i64 {
        self.pre_paid.unwrap_or(0)
    }

    pub fn custom_amount_or_zero(&self) -> i64 {
        self.custom_amount.unwrap_or(0)
    }

    /// Absent amounts are stored as 0.
    pub fn with_zero_defaults(self) -> Self {
        NewParticipant {
            pre_paid: Some(self.pre_paid_or_zero()),
            custom_amount: Some(self.custom_amount_or_zero()),
            ..self
        }
    }
}

/// Payment columns of a participation row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentState {
    pub has_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantUpdate {
    pub has_paid: Option<bool>,
    pub pre_paid: Option<i64>,
    pub pre_paid_category: Option<String>,
    pub custom_amount: Option<i64>,
}

impl ParticipantUpdate {
    /// `hasPaid: true` keeps an existing `paid_at` or stamps `now`;
    /// `hasPaid: false` clears it. The participant update queries do the same
    /// in SQL.
    pub fn apply_payment(&self, current: PaymentState, now: DateTime<Utc>) -> PaymentState {
        match self.has_paid {
            None => current,
            Some(true) => PaymentState {
                has_paid: true,
                paid_at: current.paid_at.or(Some(now)),
            },
            Some(false) => PaymentState {
                has_paid: false,
                paid_at: None,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.has_paid.is_none()
            && self.pre_paid.is_none()
            && self.pre_paid_category.is_none()
            && self.custom_amount.is_none()
    }
}

/// Returns the first member id that appears twice.
pub fn find_duplicate(participants: &[NewParticipant]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    participants
        .iter()
        .map(|p| p.member_id.as_str())
        .find(|id| !seen.insert(*id))
}
