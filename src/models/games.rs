use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::participants::NewParticipant;
use crate::balance::{self, ParticipationAmounts};

#[derive(Clone, Debug, Deserialize, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub title: Option<String>,
    pub date: DateTime<Utc>,
    pub location: String,
    pub yard_cost: i64,
    pub shuttlecock_count: i64,
    pub shuttlecock_price: i64,
    pub other_fees: i64,
    pub total_cost: i64,
    pub cost_per_member: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GameListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub game: Game,
    pub participant_count: i64,
    pub paid_count: i64,
}

#[derive(Clone, Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GameParticipant {
    pub id: String,
    pub game_id: String,
    pub member_id: String,
    pub member_name: String,
    pub has_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub pre_paid: Option<i64>,
    pub pre_paid_category: Option<String>,
    pub custom_amount: Option<i64>,
}

impl ParticipationAmounts for GameParticipant {
    fn pre_paid(&self) -> Option<i64> {
        self.pre_paid
    }

    fn custom_amount(&self) -> Option<i64> {
        self.custom_amount
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameParticipantView {
    #[serde(flatten)]
    pub participant: GameParticipant,
    pub outstanding_amount: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetails {
    #[serde(flatten)]
    pub game: Game,
    pub participants: Vec<GameParticipantView>,
}

impl GameDetails {
    pub fn new(game: Game, participants: Vec<GameParticipant>) -> Self {
        let participants = participants
            .into_iter()
            .map(|participant| GameParticipantView {
                outstanding_amount: balance::game_outstanding(
                    Some(game.cost_per_member),
                    &participant,
                ),
                participant,
            })
            .collect();

        Self { game, participants }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub title: Option<String>,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub yard_cost: i64,
    #[serde(default)]
    pub shuttlecock_count: i64,
    #[serde(default)]
    pub shuttlecock_price: i64,
    #[serde(default)]
    pub other_fees: i64,
    /// Head count the cost is split between. Falls back to the number of
    /// participants.
    pub member_count: Option<i64>,
    #[serde(default)]
    pub participants: Vec<NewParticipant>,
}

/// Cost fields computed once when a game is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameCosts {
    pub total_cost: i64,
    pub cost_per_member: i64,
}

impl NewGame {
    pub fn costs(&self) -> Result<GameCosts, String> {
        if self.location.trim().is_empty() {
            return Err("location is required".to_string());
        }

        if self.yard_cost < 0
            || self.shuttlecock_count < 0
            || self.shuttlecock_price < 0
            || self.other_fees < 0
        {
            return Err("cost fields must not be negative".to_string());
        }

        let total_cost = balance::game_total_cost(
            self.yard_cost,
            self.shuttlecock_count,
            self.shuttlecock_price,
            self.other_fees,
        )
        .ok_or_else(|| "cost fields are too large".to_string())?;
        let member_count = self
            .member_count
            .unwrap_or(self.participants.len() as i64);
        let cost_per_member = balance::split_cost(total_cost, member_count)
            .ok_or_else(|| "at least one member is required to split the cost".to_string())?;

        Ok(GameCosts {
            total_cost,
            cost_per_member,
        })
    }
}
