use crate::models::games::{Game, GameCosts, GameListing, GameParticipant, NewGame};
use crate::models::participants::{NewParticipant, ParticipantUpdate};
use crate::repositories::constraint_violation;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const PARTICIPANT_COLUMNS: &str = r#"
    gp.id, gp.game_id, gp.member_id, m.name AS member_name, gp.has_paid, gp.paid_at,
    gp.pre_paid, gp.pre_paid_category, gp.custom_amount
"#;

/// Games and their participant rows. A participant whose member does not
/// exist is a [`StoreError::MissingReference`](super::StoreError::MissingReference),
/// a member listed twice on one game a
/// [`StoreError::Conflict`](super::StoreError::Conflict).
#[async_trait]
pub trait GameStore: Clone + Send + Sync + 'static {
    /// Inserts the game with its frozen costs and every initial participant,
    /// all or nothing.
    async fn insert_game(
        &self,
        new_game: &NewGame,
        costs: GameCosts,
    ) -> Result<Game, anyhow::Error>;

    /// Newest game first, with participant and paid counts.
    async fn list_games(&self) -> Result<Vec<GameListing>, anyhow::Error>;

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, anyhow::Error>;

    /// Participants ordered by member name.
    async fn get_participants(&self, game_id: &str) -> Result<Vec<GameParticipant>, anyhow::Error>;

    /// Removes the game and its participants. `false` if it did not exist.
    async fn delete_game(&self, game_id: &str) -> Result<bool, anyhow::Error>;

    /// Adds one participant. The game's `cost_per_member` and the other rows
    /// stay as they are.
    async fn add_participant(
        &self,
        game_id: &str,
        participant: &NewParticipant,
    ) -> Result<(), anyhow::Error>;

    async fn remove_participant(
        &self,
        game_id: &str,
        member_id: &str,
    ) -> Result<bool, anyhow::Error>;

    async fn update_participant(
        &self,
        game_id: &str,
        member_id: &str,
        update: &ParticipantUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<GameParticipant>, anyhow::Error>;
}

#[derive(Clone)]
pub struct GameRepository {
    conn: PgPool,
}

impl GameRepository {
    pub fn new(conn: PgPool) -> Self {
        GameRepository { conn }
    }
}

#[async_trait]
impl GameStore for GameRepository {
    async fn insert_game(
        &self,
        new_game: &NewGame,
        costs: GameCosts,
    ) -> Result<Game, anyhow::Error> {
        let game_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let game = sqlx::query_as::<_, Game>(
            r#"
                INSERT INTO games
                (id, title, date, location, yard_cost, shuttlecock_count, shuttlecock_price,
                 other_fees, total_cost, cost_per_member)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            "#,
        )
        .bind(&game_id)
        .bind(new_game.title.as_deref())
        .bind(new_game.date)
        .bind(new_game.location.trim())
        .bind(new_game.yard_cost)
        .bind(new_game.shuttlecock_count)
        .bind(new_game.shuttlecock_price)
        .bind(new_game.other_fees)
        .bind(costs.total_cost)
        .bind(costs.cost_per_member)
        .fetch_one(&mut *tx)
        .await?;

        for participant in &new_game.participants {
            insert_participant(&mut *tx, &game.id, participant).await?;
        }

        tx.commit().await?;

        Ok(game)
    }

    async fn list_games(&self) -> Result<Vec<GameListing>, anyhow::Error> {
        let games = sqlx::query_as::<_, GameListing>(
            r#"
                SELECT g.*,
                    COUNT(gp.id) AS participant_count,
                    COUNT(gp.id) FILTER (WHERE gp.has_paid) AS paid_count
                FROM games g
                LEFT JOIN game_participants gp ON gp.game_id = g.id
                GROUP BY g.id
                ORDER BY g.date DESC
            "#,
        )
        .fetch_all(&self.conn)
        .await?;

        Ok(games)
    }

    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, anyhow::Error> {
        let game = sqlx::query_as::<_, Game>("SELECT * FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(game)
    }

    async fn get_participants(
        &self,
        game_id: &str,
    ) -> Result<Vec<GameParticipant>, anyhow::Error> {
        let participants = sqlx::query_as::<_, GameParticipant>(&format!(
            r#"
                SELECT {PARTICIPANT_COLUMNS}
                FROM game_participants gp
                JOIN members m ON m.id = gp.member_id
                WHERE gp.game_id = $1
                ORDER BY m.name
            "#
        ))
        .bind(game_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(participants)
    }

    /// Participant rows go with the game through `ON DELETE CASCADE`.
    async fn delete_game(&self, game_id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(game_id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_participant(
        &self,
        game_id: &str,
        participant: &NewParticipant,
    ) -> Result<(), anyhow::Error> {
        insert_participant(&self.conn, game_id, participant).await
    }

    async fn remove_participant(
        &self,
        game_id: &str,
        member_id: &str,
    ) -> Result<bool, anyhow::Error> {
        let result =
            sqlx::query("DELETE FROM game_participants WHERE game_id = $1 AND member_id = $2")
                .bind(game_id)
                .bind(member_id)
                .execute(&self.conn)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_participant(
        &self,
        game_id: &str,
        member_id: &str,
        update: &ParticipantUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<GameParticipant>, anyhow::Error> {
        let participant = sqlx::query_as::<_, GameParticipant>(&format!(
            r#"
                WITH gp AS (
                    UPDATE game_participants SET
                        has_paid = COALESCE($3, has_paid),
                        paid_at = CASE
                            WHEN $3::BOOLEAN IS NULL THEN paid_at
                            WHEN $3 THEN COALESCE(paid_at, $4)
                            ELSE NULL
                        END,
                        pre_paid = COALESCE($5, pre_paid),
                        pre_paid_category = COALESCE($6, pre_paid_category),
                        custom_amount = COALESCE($7, custom_amount)
                    WHERE game_id = $1 AND member_id = $2
                    RETURNING *
                )
                SELECT {PARTICIPANT_COLUMNS}
                FROM gp
                JOIN members m ON m.id = gp.member_id
            "#
        ))
        .bind(game_id)
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
    game_id: &str,
    participant: &NewParticipant,
) -> Result<(), anyhow::Error>
where
    E: PgExecutor<'e>,
{
    let participant_id = Uuid::new_v4().hyphenated().to_string();

    sqlx::query(
        r#"
            INSERT INTO game_participants
            (id, game_id, member_id, pre_paid, pre_paid_category, custom_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&participant_id)
    .bind(game_id)
    .bind(&participant.member_id)
    .bind(participant.pre_paid_or_zero())
    .bind(participant.pre_paid_category.as_deref())
    .bind(participant.custom_amount_or_zero())
    .execute(executor)
    .await
    .map_err(constraint_violation)?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    use std::sync::{Arc, Mutex};

    use crate::models::members::Member;
    use crate::models::participants::PaymentState;
    use crate::repositories::StoreError;

    #[derive(Default)]
    pub struct GameState {
        pub members: Vec<Member>,
        pub games: Vec<Game>,
        pub participants: Vec<GameParticipant>,
    }

    /// In-memory stand-in for the game tables. Amounts are stored exactly as
    /// handed in.
    #[derive(Clone, Default)]
    pub struct MemoryGameStore {
        pub state: Arc<Mutex<GameState>>,
    }

    impl MemoryGameStore {
        pub fn with_members(members: Vec<Member>) -> Self {
            Self {
                state: Arc::new(Mutex::new(GameState {
                    members,
                    ..Default::default()
                })),
            }
        }
    }

    fn duplicate_participant() -> anyhow::Error {
        StoreError::Conflict("game_participants_game_id_member_id_key".to_string()).into()
    }

    fn participant_row(
        state: &GameState,
        game_id: &str,
        participant: &NewParticipant,
    ) -> Result<GameParticipant, anyhow::Error> {
        let member = state
            .members
            .iter()
            .find(|m| m.id == participant.member_id)
            .ok_or_else(|| {
                StoreError::MissingReference("game_participants_member_id_fkey".to_string())
            })?;

        if state
            .participants
            .iter()
            .any(|p| p.game_id == game_id && p.member_id == participant.member_id)
        {
            return Err(duplicate_participant());
        }

        Ok(GameParticipant {
            id: Uuid::new_v4().hyphenated().to_string(),
            game_id: game_id.to_string(),
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            has_paid: false,
            paid_at: None,
            pre_paid: participant.pre_paid,
            pre_paid_category: participant.pre_paid_category.clone(),
            custom_amount: participant.custom_amount,
        })
    }

    #[async_trait]
    impl GameStore for MemoryGameStore {
        async fn insert_game(
            &self,
            new_game: &NewGame,
            costs: GameCosts,
        ) -> Result<Game, anyhow::Error> {
            let mut state = self.state.lock().unwrap();
            let game = Game {
                id: Uuid::new_v4().hyphenated().to_string(),
                title: new_game.title.clone(),
                date: new_game.date,
                location: new_game.location.trim().to_string(),
                yard_cost: new_game.yard_cost,
                shuttlecock_count: new_game.shuttlecock_count,
                shuttlecock_price: new_game.shuttlecock_price,
                other_fees: new_game.other_fees,
                total_cost: costs.total_cost,
                cost_per_member: costs.cost_per_member,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };

            let mut rows: Vec<GameParticipant> = Vec::new();
            for participant in &new_game.participants {
                let row = participant_row(&state, &game.id, participant)?;
                if rows.iter().any(|r| r.member_id == row.member_id) {
                    return Err(duplicate_participant());
                }
                rows.push(row);
            }

            state.games.push(game.clone());
            state.participants.extend(rows);
            Ok(game)
        }

        async fn list_games(&self) -> Result<Vec<GameListing>, anyhow::Error> {
            let state = self.state.lock().unwrap();
            let mut games: Vec<GameListing> = state
                .games
                .iter()
                .map(|game| {
                    let rows = state.participants.iter().filter(|p| p.game_id == game.id);
                    GameListing {
                        game: game.clone(),
                        participant_count: rows.clone().count() as i64,
                        paid_count: rows.filter(|p| p.has_paid).count() as i64,
                    }
                })
                .collect();
            games.sort_by(|a, b| b.game.date.cmp(&a.game.date));
            Ok(games)
        }

        async fn get_game(&self, game_id: &str) -> Result<Option<Game>, anyhow::Error> {
            let state = self.state.lock().unwrap();
            Ok(state.games.iter().find(|g| g.id == game_id).cloned())
        }

        async fn get_participants(
            &self,
            game_id: &str,
        ) -> Result<Vec<GameParticipant>, anyhow::Error> {
            let state = self.state.lock().unwrap();
            let mut participants: Vec<GameParticipant> = state
                .participants
                .iter()
                .filter(|p| p.game_id == game_id)
                .cloned()
                .collect();
            participants.sort_by(|a, b| a.member_name.cmp(&b.member_name));
            Ok(participants)
        }

        async fn delete_game(&self, game_id: &str) -> Result<bool, anyhow::Error> {
            let mut state = self.state.lock().unwrap();
            let before = state.games.len();
            state.games.retain(|g| g.id != game_id);
            state.participants.retain(|p| p.game_id != game_id);
            Ok(state.games.len() < before)
        }

        async fn add_participant(
            &self,
            game_id: &str,
            participant: &NewParticipant,
        ) -> Result<(), anyhow::Error> {
            let mut state = self.state.lock().unwrap();
            if !state.games.iter().any(|g| g.id == game_id) {
                return Err(StoreError::MissingReference(
                    "game_participants_game_id_fkey".to_string(),
                )
                .into());
            }

            let row = participant_row(&state, game_id, participant)?;
            state.participants.push(row);
            Ok(())
        }

        async fn remove_participant(
            &self,
            game_id: &str,
            member_id: &str,
        ) -> Result<bool, anyhow::Error> {
            let mut state = self.state.lock().unwrap();
            let before = state.participants.len();
            state
                .participants
                .retain(|p| !(p.game_id == game_id && p.member_id == member_id));
            Ok(state.participants.len() < before)
        }

        async fn update_participant(
            &self,
            game_id: &str,
            member_id: &str,
            update: &ParticipantUpdate,
            now: DateTime<Utc>,
        ) -> Result<Option<GameParticipant>, anyhow::Error> {
            let mut state = self.state.lock().unwrap();
            let Some(row) = state
                .participants
                .iter_mut()
                .find(|p| p.game_id == game_id && p.member_id == member_id)
            else {
                return Ok(None);
            };

            let payment = update.apply_payment(
                PaymentState {
                    has_paid: row.has_paid,
                    paid_at: row.paid_at,
                },
                now,
            );
            row.has_paid = payment.has_paid;
            row.paid_at = payment.paid_at;
            if update.pre_paid.is_some() {
                row.pre_paid = update.pre_paid;
            }
            if let Some(category) = &update.pre_paid_category {
                row.pre_paid_category = Some(category.clone());
            }
            if update.custom_amount.is_some() {
                row.custom_amount = update.custom_amount;
            }
            Ok(Some(row.clone()))
        }
    }
}
