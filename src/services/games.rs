use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::balance;
use crate::models::games::{GameDetails, GameListing, GameParticipantView, NewGame};
use crate::models::participants::{self, NewParticipant, ParticipantUpdate};
use crate::repositories::GameStore;

pub enum GameRequest {
    CreateGame {
        new_game: NewGame,
        response: oneshot::Sender<Result<GameDetails, ServiceError>>,
    },
    ListGames {
        response: oneshot::Sender<Result<Vec<GameListing>, ServiceError>>,
    },
    GetGame {
        id: String,
        response: oneshot::Sender<Result<GameDetails, ServiceError>>,
    },
    DeleteGame {
        id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    AddParticipant {
        game_id: String,
        participant: NewParticipant,
        response: oneshot::Sender<Result<GameDetails, ServiceError>>,
    },
    RemoveParticipant {
        game_id: String,
        member_id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    UpdateParticipant {
        game_id: String,
        member_id: String,
        update: ParticipantUpdate,
        response: oneshot::Sender<Result<GameParticipantView, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct GameRequestHandler<S: GameStore> {
    store: S,
}

impl<S: GameStore> GameRequestHandler<S> {
    pub fn new(store: S) -> Self {
        GameRequestHandler { store }
    }

    pub async fn create_game(&self, mut new_game: NewGame) -> Result<GameDetails, ServiceError> {
        let costs = new_game.costs().map_err(ServiceError::Validation)?;

        if let Some(member_id) = participants::find_duplicate(&new_game.participants) {
            return Err(ServiceError::Validation(format!(
                "Member {} is listed more than once.",
                member_id
            )));
        }

        new_game.participants = new_game
            .participants
            .into_iter()
            .map(NewParticipant::with_zero_defaults)
            .collect();

        let game = self
            .store
            .insert_game(&new_game, costs)
            .await
            .map_err(ServiceError::from_repository)?;

        log::info!(
            "Created game {} at {}: total {} split into {} per member.",
            game.id,
            game.location,
            game.total_cost,
            game.cost_per_member
        );

        self.get_game(&game.id).await
    }

    pub async fn list_games(&self) -> Result<Vec<GameListing>, ServiceError> {
        self.store
            .list_games()
            .await
            .map_err(ServiceError::from_repository)
    }

    pub async fn get_game(&self, id: &str) -> Result<GameDetails, ServiceError> {
        let game = self
            .store
            .get_game(id)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| not_found(id))?;
        let participants = self
            .store
            .get_participants(id)
            .await
            .map_err(ServiceError::from_repository)?;

        Ok(GameDetails::new(game, participants))
    }

    pub async fn delete_game(&self, id: &str) -> Result<(), ServiceError> {
        let deleted = self
            .store
            .delete_game(id)
            .await
            .map_err(ServiceError::from_repository)?;

        if !deleted {
            return Err(not_found(id));
        }

        log::info!("Deleted game {}.", id);
        Ok(())
    }

    pub async fn add_participant(
        &self,
        game_id: &str,
        participant: NewParticipant,
    ) -> Result<GameDetails, ServiceError> {
        let participant = participant.with_zero_defaults();
        let game = self
            .store
            .get_game(game_id)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| not_found(game_id))?;

        self.store
            .add_participant(&game.id, &participant)
            .await
            .map_err(ServiceError::from_repository)?;

        log::info!(
            "Member {} joined game {} at the existing share of {}.",
            participant.member_id,
            game.id,
            game.cost_per_member
        );

        self.get_game(game_id).await
    }

    pub async fn remove_participant(
        &self,
        game_id: &str,
        member_id: &str,
    ) -> Result<(), ServiceError> {
        let removed = self
            .store
            .remove_participant(game_id, member_id)
            .await
            .map_err(ServiceError::from_repository)?;

        if !removed {
            return Err(participant_not_found(game_id, member_id));
        }

        Ok(())
    }

    pub async fn update_participant(
        &self,
        game_id: &str,
        member_id: &str,
        update: ParticipantUpdate,
    ) -> Result<GameParticipantView, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation("Nothing to update.".to_string()));
        }

        let game = self
            .store
            .get_game(game_id)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| not_found(game_id))?;

        let participant = self
            .store
            .update_participant(game_id, member_id, &update, Utc::now())
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| participant_not_found(game_id, member_id))?;

        Ok(GameParticipantView {
            outstanding_amount: balance::game_outstanding(Some(game.cost_per_member), &participant),
            participant,
        })
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Game {} not found.", id))
}

fn participant_not_found(game_id: &str, member_id: &str) -> ServiceError {
    ServiceError::NotFound(format!(
        "Member {} does not participate in game {}.",
        member_id, game_id
    ))
}

#[async_trait]
impl<S: GameStore> RequestHandler<GameRequest> for GameRequestHandler<S> {
    async fn handle_request(&self, request: GameRequest) {
        match request {
            GameRequest::CreateGame { new_game, response } => {
                let game = self.create_game(new_game).await;
                let _ = response.send(game);
            }
            GameRequest::ListGames { response } => {
                let games = self.list_games().await;
                let _ = response.send(games);
            }
            GameRequest::GetGame { id, response } => {
                let game = self.get_game(&id).await;
                let _ = response.send(game);
            }
            GameRequest::DeleteGame { id, response } => {
                let result = self.delete_game(&id).await;
                let _ = response.send(result);
            }
            GameRequest::AddParticipant {
                game_id,
                participant,
                response,
            } => {
                let game = self.add_participant(&game_id, participant).await;
                let _ = response.send(game);
            }
            GameRequest::RemoveParticipant {
                game_id,
                member_id,
                response,
            } => {
                let result = self.remove_participant(&game_id, &member_id).await;
                let _ = response.send(result);
            }
            GameRequest::UpdateParticipant {
                game_id,
                member_id,
                update,
                response,
            } => {
                let participant = self.update_participant(&game_id, &member_id, update).await;
                let _ = response.send(participant);
            }
        }
    }
}

pub struct GameService;

impl GameService {
    pub fn new() -> Self {
        GameService {}
    }
}

#[async_trait]
impl<S: GameStore> Service<GameRequest, GameRequestHandler<S>> for GameService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::games::testing::MemoryGameStore;
    use crate::services::payments::tests::member;

    fn store() -> MemoryGameStore {
        MemoryGameStore::with_members(vec![
            member("m-1", "Linh"),
            member("m-2", "Bao"),
            member("m-3", "Chi"),
        ])
    }

    fn participant(member_id: &str) -> NewParticipant {
        NewParticipant {
            member_id: member_id.to_string(),
            pre_paid: None,
            pre_paid_category: None,
            custom_amount: None,
        }
    }

    /// 710000 in total: yard 400000, 12 shuttlecocks at 25000, 10000 other fees.
    fn new_game(participants: Vec<NewParticipant>, member_count: Option<i64>) -> NewGame {
        NewGame {
            title: Some("Friday session".to_string()),
            date: Utc::now(),
            location: "Court 3".to_string(),
            yard_cost: 400000,
            shuttlecock_count: 12,
            shuttlecock_price: 25000,
            other_fees: 10000,
            member_count,
            participants,
        }
    }

    /// (member, has_paid, pre_paid, custom_amount, outstanding) per row.
    fn rows(details: &GameDetails) -> Vec<(String, bool, Option<i64>, Option<i64>, i64)> {
        details
            .participants
            .iter()
            .map(|view| {
                let p = &view.participant;
                (
                    p.member_id.clone(),
                    p.has_paid,
                    p.pre_paid,
                    p.custom_amount,
                    view.outstanding_amount,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_game_freezes_split() {
        let handler = GameRequestHandler::new(store());

        let details = handler
            .create_game(new_game(vec![participant("m-1"), participant("m-2")], Some(12)))
            .await
            .unwrap();

        assert_eq!(details.game.total_cost, 710000);
        assert_eq!(details.game.cost_per_member, 59167);
        assert_eq!(details.participants.len(), 2);
        assert!(details
            .participants
            .iter()
            .all(|view| view.outstanding_amount == 59167));
    }

    #[tokio::test]
    async fn test_absent_amounts_are_stored_as_zero() {
        let store = store();
        let handler = GameRequestHandler::new(store.clone());

        let details = handler
            .create_game(new_game(vec![participant("m-1")], Some(2)))
            .await
            .unwrap();
        handler
            .add_participant(&details.game.id, participant("m-2"))
            .await
            .unwrap();

        let state = store.state.lock().unwrap();
        assert_eq!(state.participants.len(), 2);
        for row in &state.participants {
            assert_eq!(row.pre_paid, Some(0));
            assert_eq!(row.custom_amount, Some(0));
        }
    }

    #[tokio::test]
    async fn test_add_participant_keeps_existing_share() {
        let handler = GameRequestHandler::new(store());
        let mut first = participant("m-1");
        first.pre_paid = Some(20000);
        let created = handler
            .create_game(new_game(vec![first, participant("m-2")], None))
            .await
            .unwrap();
        assert_eq!(created.game.cost_per_member, 355000);

        let mut joined = participant("m-3");
        joined.custom_amount = Some(5000);
        let details = handler
            .add_participant(&created.game.id, joined)
            .await
            .unwrap();

        assert_eq!(details.game.total_cost, 710000);
        assert_eq!(details.game.cost_per_member, 355000);
        assert_eq!(
            rows(&details),
            vec![
                ("m-2".to_string(), false, Some(0), Some(0), 355000),
                ("m-3".to_string(), false, Some(0), Some(5000), 360000),
                ("m-1".to_string(), false, Some(20000), Some(0), 335000),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_participant_keeps_existing_share() {
        let handler = GameRequestHandler::new(store());
        let created = handler
            .create_game(new_game(
                vec![participant("m-1"), participant("m-2"), participant("m-3")],
                Some(12),
            ))
            .await
            .unwrap();

        handler
            .remove_participant(&created.game.id, "m-3")
            .await
            .unwrap();
        let details = handler.get_game(&created.game.id).await.unwrap();

        assert_eq!(details.game.total_cost, 710000);
        assert_eq!(details.game.cost_per_member, 59167);
        assert_eq!(
            rows(&details),
            vec![
                ("m-2".to_string(), false, Some(0), Some(0), 59167),
                ("m-1".to_string(), false, Some(0), Some(0), 59167),
            ]
        );

        let again = handler.remove_participant(&created.game.id, "m-3").await;
        assert!(matches!(again, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_member_is_rejected() {
        let store = store();
        let handler = GameRequestHandler::new(store.clone());

        let listed_twice = handler
            .create_game(new_game(vec![participant("m-1"), participant("m-1")], None))
            .await;
        assert!(matches!(listed_twice, Err(ServiceError::Validation(_))));
        assert!(store.state.lock().unwrap().games.is_empty());

        let created = handler
            .create_game(new_game(vec![participant("m-1")], Some(4)))
            .await
            .unwrap();
        let joined_twice = handler
            .add_participant(&created.game.id, participant("m-1"))
            .await;
        assert!(matches!(joined_twice, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_member_is_rejected() {
        let store = store();
        let handler = GameRequestHandler::new(store.clone());

        let result = handler
            .create_game(new_game(vec![participant("m-1"), participant("ghost")], None))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        {
            let state = store.state.lock().unwrap();
            assert!(state.games.is_empty());
            assert!(state.participants.is_empty());
        }

        let created = handler
            .create_game(new_game(vec![participant("m-1")], Some(4)))
            .await
            .unwrap();
        let joined = handler
            .add_participant(&created.game.id, participant("ghost"))
            .await;
        assert!(matches!(joined, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_participant_to_unknown_game() {
        let handler = GameRequestHandler::new(store());

        let result = handler.add_participant("no-such-game", participant("m-1")).await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_has_paid_stamps_and_clears_paid_at() {
        let handler = GameRequestHandler::new(store());
        let created = handler
            .create_game(new_game(vec![participant("m-1")], Some(12)))
            .await
            .unwrap();
        let mark = |has_paid| ParticipantUpdate {
            has_paid: Some(has_paid),
            ..Default::default()
        };

        let paid = handler
            .update_participant(&created.game.id, "m-1", mark(true))
            .await
            .unwrap();
        assert!(paid.participant.has_paid);
        let paid_at = paid.participant.paid_at.expect("paid_at stamped");

        let paid_again = handler
            .update_participant(&created.game.id, "m-1", mark(true))
            .await
            .unwrap();
        assert_eq!(paid_again.participant.paid_at, Some(paid_at));

        let unpaid = handler
            .update_participant(&created.game.id, "m-1", mark(false))
            .await
            .unwrap();
        assert!(!unpaid.participant.has_paid);
        assert_eq!(unpaid.participant.paid_at, None);
        assert_eq!(unpaid.outstanding_amount, 59167);
    }

    #[tokio::test]
    async fn test_update_participant_amounts() {
        let handler = GameRequestHandler::new(store());
        let created = handler
            .create_game(new_game(vec![participant("m-1")], Some(12)))
            .await
            .unwrap();

        let view = handler
            .update_participant(
                &created.game.id,
                "m-1",
                ParticipantUpdate {
                    pre_paid: Some(20000),
                    custom_amount: Some(60000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(view.outstanding_amount, 99167);
        assert!(!view.participant.has_paid);

        let empty = handler
            .update_participant(&created.game.id, "m-1", ParticipantUpdate::default())
            .await;
        assert!(matches!(empty, Err(ServiceError::Validation(_))));

        let missing = handler
            .update_participant(&created.game.id, "m-2", mark_paid())
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    fn mark_paid() -> ParticipantUpdate {
        ParticipantUpdate {
            has_paid: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_overflowing_costs_are_rejected() {
        let store = store();
        let handler = GameRequestHandler::new(store.clone());
        let mut game = new_game(vec![participant("m-1")], Some(2));
        game.shuttlecock_count = 4_000_000_000_000_000_000;
        game.shuttlecock_price = 3;

        let result = handler.create_game(game).await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(store.state.lock().unwrap().games.is_empty());
    }

    #[tokio::test]
    async fn test_delete_game_drops_participants() {
        let store = store();
        let handler = GameRequestHandler::new(store.clone());
        let created = handler
            .create_game(new_game(vec![participant("m-1"), participant("m-2")], None))
            .await
            .unwrap();

        handler.delete_game(&created.game.id).await.unwrap();

        assert!(store.state.lock().unwrap().participants.is_empty());
        assert!(matches!(
            handler.get_game(&created.game.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            handler.delete_game(&created.game.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_games_counts_paid_participants() {
        let handler = GameRequestHandler::new(store());
        let created = handler
            .create_game(new_game(vec![participant("m-1"), participant("m-2")], None))
            .await
            .unwrap();
        handler
            .update_participant(&created.game.id, "m-2", mark_paid())
            .await
            .unwrap();

        let games = handler.list_games().await.unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].participant_count, 2);
        assert_eq!(games[0].paid_count, 1);
    }
}
