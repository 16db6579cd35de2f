use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClubStats {
    pub members: i64,
    pub active_members: i64,
    pub games: i64,
    pub personal_events: i64,
    pub unpaid_participations: i64,
    pub total_outstanding: i64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Row counts read straight from the database.
#[derive(Clone, Debug, Default, sqlx::FromRow)]
pub struct ClubCounts {
    pub members: i64,
    pub active_members: i64,
    pub games: i64,
    pub personal_events: i64,
}
