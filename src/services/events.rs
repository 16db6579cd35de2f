use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::balance;
use crate::models::events::{
    NewPersonalEvent, PersonalEventDetails, PersonalEventListing, PersonalEventParticipantView,
};
use crate::models::participants::{self, NewParticipant, ParticipantUpdate};
use crate::repositories::PersonalEventStore;

pub enum PersonalEventRequest {
    CreateEvent {
        new_event: NewPersonalEvent,
        response: oneshot::Sender<Result<PersonalEventDetails, ServiceError>>,
    },
    ListEvents {
        response: oneshot::Sender<Result<Vec<PersonalEventListing>, ServiceError>>,
    },
    GetEvent {
        id: String,
        response: oneshot::Sender<Result<PersonalEventDetails, ServiceError>>,
    },
    DeleteEvent {
        id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    AddParticipant {
        event_id: String,
        participant: NewParticipant,
        response: oneshot::Sender<Result<PersonalEventDetails, ServiceError>>,
    },
    RemoveParticipant {
        event_id: String,
        member_id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    UpdateParticipant {
        event_id: String,
        member_id: String,
        update: ParticipantUpdate,
        response: oneshot::Sender<Result<PersonalEventParticipantView, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PersonalEventRequestHandler<S: PersonalEventStore> {
    store: S,
}

impl<S: PersonalEventStore> PersonalEventRequestHandler<S> {
    pub fn new(store: S) -> Self {
        PersonalEventRequestHandler { store }
    }

    pub async fn create_event(
        &self,
        mut new_event: NewPersonalEvent,
    ) -> Result<PersonalEventDetails, ServiceError> {
        if new_event.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }

        if let Some(member_id) = participants::find_duplicate(&new_event.participants) {
            return Err(ServiceError::Validation(format!(
                "Member {} is listed more than once.",
                member_id
            )));
        }

        let total_cost = new_event
            .resolved_total_cost()
            .map_err(ServiceError::Validation)?;
        new_event.participants = new_event
            .participants
            .into_iter()
            .map(NewParticipant::with_zero_defaults)
            .collect();

        let event = self
            .store
            .insert_event(&new_event, total_cost)
            .await
            .map_err(ServiceError::from_repository)?;

        log::info!(
            "Created personal event {} ({}) with total cost {}.",
            event.id,
            event.name,
            event.total_cost
        );

        self.get_event(&event.id).await
    }

    pub async fn list_events(&self) -> Result<Vec<PersonalEventListing>, ServiceError> {
        self.store
            .list_events()
            .await
            .map_err(ServiceError::from_repository)
    }

    pub async fn get_event(&self, id: &str) -> Result<PersonalEventDetails, ServiceError> {
        let event = self
            .store
            .get_event(id)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| not_found(id))?;
        let participants = self
            .store
            .get_participants(id)
            .await
            .map_err(ServiceError::from_repository)?;

        Ok(PersonalEventDetails::new(event, participants))
    }

    pub async fn delete_event(&self, id: &str) -> Result<(), ServiceError> {
        let deleted = self
            .store
            .delete_event(id)
            .await
            .map_err(ServiceError::from_repository)?;

        if !deleted {
            return Err(not_found(id));
        }

        log::info!("Deleted personal event {}.", id);
        Ok(())
    }

    pub async fn add_participant(
        &self,
        event_id: &str,
        participant: NewParticipant,
    ) -> Result<PersonalEventDetails, ServiceError> {
        let participant = participant.with_zero_defaults();
        self.store
            .get_event(event_id)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| not_found(event_id))?;

        self.store
            .add_participant(event_id, &participant)
            .await
            .map_err(ServiceError::from_repository)?;

        self.get_event(event_id).await
    }

    pub async fn remove_participant(
        &self,
        event_id: &str,
        member_id: &str,
    ) -> Result<(), ServiceError> {
        let removed = self
            .store
            .remove_participant(event_id, member_id)
            .await
            .map_err(ServiceError::from_repository)?;

        if !removed {
            return Err(participant_not_found(event_id, member_id));
        }

        Ok(())
    }

    pub async fn update_participant(
        &self,
        event_id: &str,
        member_id: &str,
        update: ParticipantUpdate,
    ) -> Result<PersonalEventParticipantView, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation("Nothing to update.".to_string()));
        }

        let participant = self
            .store
            .update_participant(event_id, member_id, &update, Utc::now())
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| participant_not_found(event_id, member_id))?;

        Ok(PersonalEventParticipantView {
            outstanding_amount: balance::event_outstanding(&participant),
            participant,
        })
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Personal event {} not found.", id))
}

fn participant_not_found(event_id: &str, member_id: &str) -> ServiceError {
    ServiceError::NotFound(format!(
        "Member {} does not participate in personal event {}.",
        member_id, event_id
    ))
}

#[async_trait]
impl<S: PersonalEventStore> RequestHandler<PersonalEventRequest>
    for PersonalEventRequestHandler<S>
{
    async fn handle_request(&self, request: PersonalEventRequest) {
        match request {
            PersonalEventRequest::CreateEvent {
                new_event,
                response,
            } => {
                let event = self.create_event(new_event).await;
                let _ = response.send(event);
            }
            PersonalEventRequest::ListEvents { response } => {
                let events = self.list_events().await;
                let _ = response.send(events);
            }
            PersonalEventRequest::GetEvent { id, response } => {
                let event = self.get_event(&id).await;
                let _ = response.send(event);
            }
            PersonalEventRequest::DeleteEvent { id, response } => {
                let result = self.delete_event(&id).await;
                let _ = response.send(result);
            }
            PersonalEventRequest::AddParticipant {
                event_id,
                participant,
                response,
            } => {
                let event = self.add_participant(&event_id, participant).await;
                let _ = response.send(event);
            }
            PersonalEventRequest::RemoveParticipant {
                event_id,
                member_id,
                response,
            } => {
                let result = self.remove_participant(&event_id, &member_id).await;
                let _ = response.send(result);
            }
            PersonalEventRequest::UpdateParticipant {
                event_id,
                member_id,
                update,
                response,
            } => {
                let participant = self.update_participant(&event_id, &member_id, update).await;
                let _ = response.send(participant);
            }
        }
    }
}

pub struct PersonalEventService;

impl PersonalEventService {
    pub fn new() -> Self {
        PersonalEventService {}
    }
}

#[async_trait]
impl<S: PersonalEventStore> Service<PersonalEventRequest, PersonalEventRequestHandler<S>>
    for PersonalEventService
{
}
