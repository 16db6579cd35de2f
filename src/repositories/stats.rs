use crate::models::payments::{UnpaidEvent, UnpaidGame};
use crate::models::stats::ClubCounts;

use sqlx::PgPool;

#[derive(Clone)]
pub struct StatsRepository {
    conn: PgPool,
}

impl StatsRepository {
    pub fn new(conn: PgPool) -> Self {
        StatsRepository { conn }
    }

    pub async fn get_counts(&self) -> Result<ClubCounts, anyhow::Error> {
        let counts = sqlx::query_as::<_, ClubCounts>(
            r#"
                SELECT
                    (SELECT COUNT(*) FROM members) AS members,
                    (SELECT COUNT(*) FROM members WHERE is_active) AS active_members,
                    (SELECT COUNT(*) FROM games) AS games,
                    (SELECT COUNT(*) FROM personal_events) AS personal_events
            "#,
        )
        .fetch_one(&self.conn)
        .await?;

        Ok(counts)
    }

    /// Every unpaid game participation in the club.
    pub async fn unpaid_games(&self) -> Result<Vec<UnpaidGame>, anyhow::Error> {
        let games = sqlx::query_as::<_, UnpaidGame>(
            r#"
                SELECT gp.id AS participant_id, g.id AS game_id, g.title, g.date, g.location,
                    g.cost_per_member, gp.pre_paid, gp.pre_paid_category, gp.custom_amount
                FROM game_participants gp
                JOIN games g ON g.id = gp.game_id
                WHERE gp.has_paid = FALSE
            "#,
        )
        .fetch_all(&self.conn)
        .await?;

        Ok(games)
    }

    pub async fn unpaid_events(&self) -> Result<Vec<UnpaidEvent>, anyhow::Error> {
        let events = sqlx::query_as::<_, UnpaidEvent>(
            r#"
                SELECT ep.id AS participant_id, e.id AS personal_event_id, e.name, e.date,
                    e.location, e.total_cost, ep.pre_paid, ep.pre_paid_category, ep.custom_amount
                FROM personal_event_participants ep
                JOIN personal_events e ON e.id = ep.personal_event_id
                WHERE ep.has_paid = FALSE
            "#,
        )
        .fetch_all(&self.conn)
        .await?;

        Ok(events)
    }
}
