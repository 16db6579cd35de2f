use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::members::{self, Member, MemberFilter, MemberUpdate, NewMember},
    repositories::MemberStore,
};

pub enum MemberRequest {
    CreateMember {
        new_member: NewMember,
        response: oneshot::Sender<Result<Member, ServiceError>>,
    },
    ListMembers {
        filter: MemberFilter,
        response: oneshot::Sender<Result<Vec<Member>, ServiceError>>,
    },
    GetMember {
        id: String,
        response: oneshot::Sender<Result<Member, ServiceError>>,
    },
    UpdateMember {
        id: String,
        update: MemberUpdate,
        response: oneshot::Sender<Result<Member, ServiceError>>,
    },
    SetActive {
        id: String,
        is_active: bool,
        response: oneshot::Sender<Result<Member, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct MemberRequestHandler<S: MemberStore> {
    store: S,
}

impl<S: MemberStore> MemberRequestHandler<S> {
    pub fn new(store: S) -> Self {
        MemberRequestHandler { store }
    }

    pub async fn create_member(&self, new_member: NewMember) -> Result<Member, ServiceError> {
        let name = members::normalize_name(&new_member.name)
            .ok_or_else(|| ServiceError::Validation("name is required".to_string()))?;

        let member = self
            .store
            .insert_member(
                &name,
                new_member.phone.as_deref(),
                new_member.avatar.as_deref(),
            )
            .await
            .map_err(|e| duplicate_name(&name, e))?;

        log::info!("Registered member {} ({}).", member.name, member.id);
        Ok(member)
    }

    pub async fn list_members(&self, filter: MemberFilter) -> Result<Vec<Member>, ServiceError> {
        self.store
            .list_members(filter.active)
            .await
            .map_err(ServiceError::from_repository)
    }

    pub async fn get_member(&self, id: &str) -> Result<Member, ServiceError> {
        self.store
            .get_member_by_id(id)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| not_found(id))
    }

    pub async fn update_member(
        &self,
        id: &str,
        mut update: MemberUpdate,
    ) -> Result<Member, ServiceError> {
        if let Some(name) = update.name.take() {
            let name = members::normalize_name(&name)
                .ok_or_else(|| ServiceError::Validation("name must not be blank".to_string()))?;
            update.name = Some(name);
        }

        let requested_name = update.name.clone().unwrap_or_default();
        self.store
            .update_member(id, &update)
            .await
            .map_err(|e| duplicate_name(&requested_name, e))?
            .ok_or_else(|| not_found(id))
    }

    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<Member, ServiceError> {
        let member = self
            .store
            .set_active(id, is_active)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| not_found(id))?;

        log::info!(
            "Member {} is now {}.",
            member.id,
            if member.is_active { "active" } else { "inactive" }
        );
        Ok(member)
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Member {} not found.", id))
}

fn duplicate_name(name: &str, e: anyhow::Error) -> ServiceError {
    match ServiceError::from_repository(e) {
        ServiceError::Validation(_) => {
            ServiceError::Validation(format!("A member named {} already exists.", name))
        }
        other => other,
    }
}

#[async_trait]
impl<S: MemberStore> RequestHandler<MemberRequest> for MemberRequestHandler<S> {
    async fn handle_request(&self, request: MemberRequest) {
        match request {
            MemberRequest::CreateMember {
                new_member,
                response,
            } => {
                let member = self.create_member(new_member).await;
                let _ = response.send(member);
            }
            MemberRequest::ListMembers { filter, response } => {
                let members = self.list_members(filter).await;
                let _ = response.send(members);
            }
            MemberRequest::GetMember { id, response } => {
                let member = self.get_member(&id).await;
                let _ = response.send(member);
            }
            MemberRequest::UpdateMember {
                id,
                update,
                response,
            } => {
                let member = self.update_member(&id, update).await;
                let _ = response.send(member);
            }
            MemberRequest::SetActive {
                id,
                is_active,
                response,
            } => {
                let member = self.set_active(&id, is_active).await;
                let _ = response.send(member);
            }
        }
    }
}

pub struct MemberService;

impl MemberService {
    pub fn new() -> Self {
        MemberService {}
    }
}

#[async_trait]
impl<S: MemberStore> Service<MemberRequest, MemberRequestHandler<S>> for MemberService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::members::testing::MemoryMemberStore;
    use crate::services::payments::tests::member;

    fn new_member(name: &str) -> NewMember {
        NewMember {
            name: name.to_string(),
            phone: None,
            avatar: None,
        }
    }

    fn handler() -> MemberRequestHandler<MemoryMemberStore> {
        MemberRequestHandler::new(MemoryMemberStore::with_members(vec![
            member("m-1", "Linh"),
            member("m-2", "Bao"),
        ]))
    }

    #[tokio::test]
    async fn test_create_member_trims_name() {
        let handler = handler();

        let created = handler.create_member(new_member("  Chi  ")).await.unwrap();

        assert_eq!(created.name, "Chi");
        assert!(created.is_active);
        assert_eq!(handler.get_member(&created.id).await.unwrap().name, "Chi");
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let handler = handler();

        let result = handler.create_member(new_member(" Linh")).await;

        match result {
            Err(ServiceError::Validation(message)) => {
                assert_eq!(message, "A member named Linh already exists.")
            }
            other => panic!("expected a validation error, got {:?}", other.map(|m| m.id)),
        }
        assert_eq!(handler.list_members(MemberFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let handler = handler();

        assert!(matches!(
            handler.create_member(new_member("   ")).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_to_existing_name_is_rejected() {
        let handler = handler();
        let update = MemberUpdate {
            name: Some("Bao".to_string()),
            ..Default::default()
        };

        let result = handler.update_member("m-1", update).await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(handler.get_member("m-1").await.unwrap().name, "Linh");
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let handler = handler();
        let update = MemberUpdate {
            phone: Some("0901 234 567".to_string()),
            ..Default::default()
        };

        let updated = handler.update_member("m-1", update).await.unwrap();

        assert_eq!(updated.name, "Linh");
        assert_eq!(updated.phone.as_deref(), Some("0901 234 567"));
        assert!(matches!(
            handler.update_member("ghost", MemberUpdate::default()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_activity() {
        let handler = handler();
        handler.set_active("m-2", false).await.unwrap();

        let active = handler
            .list_members(MemberFilter { active: Some(true) })
            .await
            .unwrap();
        let all = handler.list_members(MemberFilter::default()).await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Linh");
        let names: Vec<&str> = all.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Bao", "Linh"]);
        assert!(matches!(
            handler.set_active("ghost", true).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
