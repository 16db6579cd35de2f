use crate::models::members::Member;
use crate::models::payments::{BulkTarget, PaymentChange, UnpaidEvent, UnpaidGame, UpdateCounts};

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

/// Reads and set-based writes the payment service needs from the store.
#[async_trait]
pub trait PaymentStore: Clone + Send + Sync + 'static {
    async fn find_member(&self, member_id: &str) -> Result<Option<Member>, anyhow::Error>;

    /// Unpaid game participations of the member, newest game first.
    async fn unpaid_games(&self, member_id: &str) -> Result<Vec<UnpaidGame>, anyhow::Error>;

    /// Unpaid personal event participations of the member, newest event first.
    async fn unpaid_events(&self, member_id: &str) -> Result<Vec<UnpaidEvent>, anyhow::Error>;

    /// Applies `change` to every game participation of the member whose
    /// `has_paid` differs from it. Returns the number of rows touched.
    async fn set_games_paid(
        &self,
        member_id: &str,
        change: PaymentChange,
    ) -> Result<u64, anyhow::Error>;

    async fn set_events_paid(
        &self,
        member_id: &str,
        change: PaymentChange,
    ) -> Result<u64, anyhow::Error>;

    /// Same as the two updates above, but committed or rolled back together.
    async fn set_paid_atomically(
        &self,
        member_id: &str,
        change: PaymentChange,
        target: BulkTarget,
    ) -> Result<UpdateCounts, anyhow::Error>;
}

#[derive(Clone)]
pub struct PaymentRepository {
    conn: PgPool,
}

impl PaymentRepository {
    pub fn new(conn: PgPool) -> Self {
        PaymentRepository { conn }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn find_member(&self, member_id: &str) -> Result<Option<Member>, anyhow::Error> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT id, name, phone, avatar, is_active, created_at, updated_at FROM members WHERE id = $1",
        )
        .bind(member_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(member)
    }

    async fn unpaid_games(&self, member_id: &str) -> Result<Vec<UnpaidGame>, anyhow::Error> {
        let games = sqlx::query_as::<_, UnpaidGame>(
            r#"
                SELECT gp.id AS participant_id, g.id AS game_id, g.title, g.date, g.location,
                    g.cost_per_member, gp.pre_paid, gp.pre_paid_category, gp.custom_amount
                FROM game_participants gp
                JOIN games g ON g.id = gp.game_id
                WHERE gp.member_id = $1 AND gp.has_paid = FALSE
                ORDER BY g.date DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(games)
    }

    async fn unpaid_events(&self, member_id: &str) -> Result<Vec<UnpaidEvent>, anyhow::Error> {
        let events = sqlx::query_as::<_, UnpaidEvent>(
            r#"
                SELECT ep.id AS participant_id, e.id AS personal_event_id, e.name, e.date,
                    e.location, e.total_cost, ep.pre_paid, ep.pre_paid_category, ep.custom_amount
                FROM personal_event_participants ep
                JOIN personal_events e ON e.id = ep.personal_event_id
                WHERE ep.member_id = $1 AND ep.has_paid = FALSE
                ORDER BY e.date DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(events)
    }

    async fn set_games_paid(
        &self,
        member_id: &str,
        change: PaymentChange,
    ) -> Result<u64, anyhow::Error> {
        Ok(update_games(&self.conn, member_id, change).await?)
    }

    async fn set_events_paid(
        &self,
        member_id: &str,
        change: PaymentChange,
    ) -> Result<u64, anyhow::Error> {
        Ok(update_events(&self.conn, member_id, change).await?)
    }

    async fn set_paid_atomically(
        &self,
        member_id: &str,
        change: PaymentChange,
        target: BulkTarget,
    ) -> Result<UpdateCounts, anyhow::Error> {
        let mut tx = self.conn.begin().await?;
        let mut counts = UpdateCounts::default();

        if target.includes_games() {
            counts.games = update_games(&mut *tx, member_id, change).await?;
        }
        if target.includes_events() {
            counts.personal_events = update_events(&mut *tx, member_id, change).await?;
        }

        tx.commit().await?;

        Ok(counts)
    }
}

async fn update_games<'e, E>(
    executor: E,
    member_id: &str,
    change: PaymentChange,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE game_participants SET has_paid = $2, paid_at = $3 WHERE member_id = $1 AND has_paid <> $2",
    )
    .bind(member_id)
    .bind(change.has_paid)
    .bind(change.paid_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

async fn update_events<'e, E>(
    executor: E,
    member_id: &str,
    change: PaymentChange,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE personal_event_participants SET has_paid = $2, paid_at = $3 WHERE member_id = $1 AND has_paid <> $2",
    )
    .bind(member_id)
    .bind(change.has_paid)
    .bind(change.paid_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
