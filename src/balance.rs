//! Outstanding-balance arithmetic for game and personal event participations.
//!
//! A game participant owes the frozen equal share of the game, minus whatever
//! was pre-paid, plus an optional adjustment. A personal event participant has
//! no equal share: `custom_amount` already is the full amount owed. Missing
//! amounts count as zero. Outstanding amounts saturate at the `i64` bounds
//! instead of failing; the cost helpers report overflow as `None`.

use crate::models::payments::{PaymentSummary, UnpaidEvent, UnpaidGame};

/// Payment fields shared by both participation kinds.
pub trait ParticipationAmounts {
    fn pre_paid(&self) -> Option<i64>;
    fn custom_amount(&self) -> Option<i64>;
}

/// `cost_per_member - pre_paid + custom_amount`
pub fn game_outstanding<P: ParticipationAmounts + ?Sized>(
    cost_per_member: Option<i64>,
    participant: &P,
) -> i64 {
    cost_per_member
        .unwrap_or(0)
        .saturating_sub(participant.pre_paid().unwrap_or(0))
        .saturating_add(participant.custom_amount().unwrap_or(0))
}

/// `custom_amount - pre_paid`
pub fn event_outstanding<P: ParticipationAmounts + ?Sized>(participant: &P) -> i64 {
    participant
        .custom_amount()
        .unwrap_or(0)
        .saturating_sub(participant.pre_paid().unwrap_or(0))
}

pub fn summarize(unpaid_games: &[UnpaidGame], unpaid_events: &[UnpaidEvent]) -> PaymentSummary {
    let games_outstanding = unpaid_games
        .iter()
        .fold(0i64, |sum, g| sum.saturating_add(g.outstanding_amount));
    let events_outstanding = unpaid_events
        .iter()
        .fold(0i64, |sum, e| sum.saturating_add(e.outstanding_amount));

    PaymentSummary {
        total_unpaid_games: unpaid_games.len(),
        total_unpaid_events: unpaid_events.len(),
        total_unpaid_items: unpaid_games.len() + unpaid_events.len(),
        games_outstanding,
        events_outstanding,
        total_outstanding: games_outstanding.saturating_add(events_outstanding),
    }
}

/// `yard_cost + shuttlecock_count * shuttlecock_price + other_fees`, or `None`
/// if the result does not fit in an `i64`.
pub fn game_total_cost(
    yard_cost: i64,
    shuttlecock_count: i64,
    shuttlecock_price: i64,
    other_fees: i64,
) -> Option<i64> {
    shuttlecock_count
        .checked_mul(shuttlecock_price)?
        .checked_add(yard_cost)?
        .checked_add(other_fees)
}

/// Equal share of `total_cost`, rounded half away from zero.
///
/// Returns `None` when there is nobody to split between.
pub fn split_cost(total_cost: i64, member_count: i64) -> Option<i64> {
    if member_count <= 0 {
        return None;
    }

    let share = total_cost / member_count;
    // |remainder| < member_count, so neither side of the comparison overflows.
    let remainder = (total_cost % member_count).abs();
    if remainder >= member_count - remainder {
        Some(share + total_cost.signum())
    } else {
        Some(share)
    }
}
