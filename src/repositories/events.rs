use crate::models::events::{
    NewPersonalEvent, PersonalEvent, PersonalEventListing, PersonalEventParticipant,
};
use crate::models::participants::{NewParticipant, ParticipantUpdate};
use crate::repositories::constraint_violation;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const PARTICIPANT_COLUMNS: &str = r#"
    ep.id, ep.personal_event_id, ep.member_id, m.name AS member_name, ep.has_paid, ep.paid_at,
    ep.pre_paid, ep.pre_paid_category, ep.custom_amount
"#;

/// Personal events and their participant rows, with the same constraint
/// reporting as [`GameStore`](super::GameStore).
#[async_trait]
pub trait PersonalEventStore: Clone + Send + Sync + 'static {
    async fn insert_event(
        &self,
        new_event: &NewPersonalEvent,
        total_cost: i64,
    ) -> Result<PersonalEvent, anyhow::Error>;

    async fn list_events(&self) -> Result<Vec<PersonalEventListing>, anyhow::Error>;

    async fn get_event(&self, event_id: &str) -> Result<Option<PersonalEvent>, anyhow::Error>;

    async fn get_participants(
        &self,
        event_id: &str,
    ) -> Result<Vec<PersonalEventParticipant>, anyhow::Error>;

    async fn delete_event(&self, event_id: &str) -> Result<bool, anyhow::Error>;

    /// Adds one participant without touching the event's `total_cost`.
    async fn add_participant(
        &self,
        event_id: &str,
        participant: &NewParticipant,
    ) -> Result<(), anyhow::Error>;

    async fn remove_participant(
        &self,
        event_id: &str,
        member_id: &str,
    ) -> Result<bool, anyhow::Error>;

    async fn update_participant(
        &self,
        event_id: &str,
        member_id: &str,
        update: &ParticipantUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<PersonalEventParticipant>, anyhow::Error>;
}

#[derive(Clone)]
pub struct PersonalEventRepository {
    conn: PgPool,
}

impl PersonalEventRepository {
    pub fn new(conn: PgPool) -> Self {
        PersonalEventRepository { conn }
    }
}

#[async_trait]
impl PersonalEventStore for PersonalEventRepository {
    async fn insert_event(
        &self,
        new_event: &NewPersonalEvent,
        total_cost: i64,
    ) -> Result<PersonalEvent, anyhow::Error> {
        let event_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let event = sqlx::query_as::<_, PersonalEvent>(
            r#"
                INSERT INTO personal_events (id, name, description, date, location, total_cost)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            "#,
        )
        .bind(&event_id)
        .bind(new_event.name.trim())
        .bind(new_event.description.as_deref())
        .bind(new_event.date)
        .bind(new_event.location.as_deref())
        .bind(total_cost)
        .fetch_one(&mut *tx)
        .await?;

        for participant in &new_event.participants {
            insert_participant(&mut *tx, &event.id, participant).await?;
        }

        tx.commit().await?;

        Ok(event)
    }

    async fn list_events(&self) -> Result<Vec<PersonalEventListing>, anyhow::Error> {
        let events = sqlx::query_as::<_, PersonalEventListing>(
            r#"
                SELECT e.*,
                    COUNT(ep.id) AS participant_count,
                    COUNT(ep.id) FILTER (WHERE ep.has_paid) AS paid_count
                FROM personal_events e
                LEFT JOIN personal_event_participants ep ON ep.personal_event_id = e.id
                GROUP BY e.id
                ORDER BY e.date DESC
            "#,
        )
        .fetch_all(&self.conn)
        .await?;

        Ok(events)
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<PersonalEvent>, anyhow::Error> {
        let event = sqlx::query_as::<_, PersonalEvent>("SELECT * FROM personal_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(event)
    }

    async fn get_participants(
        &self,
        event_id: &str,
    ) -> Result<Vec<PersonalEventParticipant>, anyhow::Error> {
        let participants = sqlx::query_as::<_, PersonalEventParticipant>(&format!(
            r#"
                SELECT {PARTICIPANT_COLUMNS}
                FROM personal_event_participants ep
                JOIN members m ON m.id = ep.member_id
                WHERE ep.personal_event_id = $1
                ORDER BY m.name
            "#
        ))
        .bind(event_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(participants)
    }

    async fn delete_event(&self, event_id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM personal_events WHERE id = $1")
            .bind(event_id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_participant(
        &self,
        event_id: &str,
        participant: &NewParticipant,
    ) -> Result<(), anyhow::Error> {
        insert_participant(&self.conn, event_id, participant).await
    }

    async fn remove_participant(
        &self,
        event_id: &str,
        member_id: &str,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            "DELETE FROM personal_event_participants WHERE personal_event_id = $1 AND member_id = $2",
        )
        .bind(event_id)
        .bind(member_id)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_participant(
        &self,
        event_id: &str,
        member_id: &str,
        update: &ParticipantUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<PersonalEventParticipant>, anyhow::Error> {
        let participant = sqlx::query_as::<_, PersonalEventParticipant>(&format!(
            r#"
                WITH ep AS (
                    UPDATE personal_event_participants SET
                        has_paid = COALESCE($3, has_paid),
                        paid_at = CASE
                            WHEN $3::BOOLEAN IS NULL THEN paid_at
                            WHEN $3 THEN COALESCE(paid_at, $4)
                            ELSE NULL
                        END,
                        pre_paid = COALESCE($5, pre_paid),
                        pre_paid_category = COALESCE($6, pre_paid_category),
                        custom_amount = COALESCE($7, custom_amount)
                    WHERE personal_event_id = $1 AND member_id = $2
                    RETURNING *
                )
                SELECT {PARTICIPANT_COLUMNS}
                FROM ep
                JOIN members m ON m.id = ep.member_id
            "#
        ))
        .bind(event_id)
        .bind(member_id)
        .bind(update.has_paid)
        .bind(now)
        .bind(update.pre_paid)
        .bind(update.pre_paid_category.as_deref())
        .bind(update.custom_amount)
        .fetch_optional(&self.conn)
        .await?;

        Ok(participant)
    }
}

async fn insert_participant<'e, E>(
    executor: E,
    event_id: &str,
    participant: &NewParticipant,
) -> Result<(), anyhow::Error>
where
    E: PgExecutor<'e>,
{
    let participant_id = Uuid::new_v4().hyphenated().to_string();

    sqlx::query(
        r#"
            INSERT INTO personal_event_participants
            (id, personal_event_id, member_id, pre_paid, pre_paid_category, custom_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&participant_id)
    .bind(event_id)
    .bind(&participant.member_id)
    .bind(participant.pre_paid_or_zero())
    .bind(participant.pre_paid_category.as_deref())
    .bind(participant.custom_amount_or_zero())
    .execute(executor)
    .await
    .map_err(constraint_violation)?;

    Ok(())
}
