use crate::models::members::{Member, MemberUpdate};
use crate::repositories::constraint_violation;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Member rows. Names are unique; a clash is reported as a
/// [`StoreError::Conflict`](super::StoreError::Conflict).
#[async_trait]
pub trait MemberStore: Clone + Send + Sync + 'static {
    async fn insert_member(
        &self,
        name: &str,
        phone: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<Member, anyhow::Error>;

    async fn get_member_by_id(&self, member_id: &str) -> Result<Option<Member>, anyhow::Error>;

    /// Members ordered by name, optionally only active or inactive ones.
    async fn list_members(&self, active: Option<bool>) -> Result<Vec<Member>, anyhow::Error>;

    /// Overwrites the fields set in `update`. `None` if the member is unknown.
    async fn update_member(
        &self,
        member_id: &str,
        update: &MemberUpdate,
    ) -> Result<Option<Member>, anyhow::Error>;

    async fn set_active(
        &self,
        member_id: &str,
        is_active: bool,
    ) -> Result<Option<Member>, anyhow::Error>;
}

#[derive(Clone)]
pub struct MemberRepository {
    conn: PgPool,
}

impl MemberRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl MemberStore for MemberRepository {
    async fn insert_member(
        &self,
        name: &str,
        phone: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<Member, anyhow::Error> {
        let member_id = Uuid::new_v4().hyphenated().to_string();

        let member = sqlx::query_as::<_, Member>(
            r#"
                INSERT INTO members (id, name, phone, avatar)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, phone, avatar, is_active, created_at, updated_at
            "#,
        )
        .bind(&member_id)
        .bind(name)
        .bind(phone)
        .bind(avatar)
        .fetch_one(&self.conn)
        .await
        .map_err(constraint_violation)?;

        Ok(member)
    }

    async fn get_member_by_id(&self, member_id: &str) -> Result<Option<Member>, anyhow::Error> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT id, name, phone, avatar, is_active, created_at, updated_at FROM members WHERE id = $1",
        )
        .bind(member_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(member)
    }

    async fn list_members(&self, active: Option<bool>) -> Result<Vec<Member>, anyhow::Error> {
        let members = sqlx::query_as::<_, Member>(
            r#"
                SELECT id, name, phone, avatar, is_active, created_at, updated_at
                FROM members
                WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
                ORDER BY name
            "#,
        )
        .bind(active)
        .fetch_all(&self.conn)
        .await?;

        Ok(members)
    }

    async fn update_member(
        &self,
        member_id: &str,
        update: &MemberUpdate,
    ) -> Result<Option<Member>, anyhow::Error> {
        let member = sqlx::query_as::<_, Member>(
            r#"
                UPDATE members SET
                    name = COALESCE($2, name),
                    phone = COALESCE($3, phone),
                    avatar = COALESCE($4, avatar),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING id, name, phone, avatar, is_active, created_at, updated_at
            "#,
        )
        .bind(member_id)
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.avatar.as_deref())
        .fetch_optional(&self.conn)
        .await
        .map_err(constraint_violation)?;

        Ok(member)
    }

    async fn set_active(
        &self,
        member_id: &str,
        is_active: bool,
    ) -> Result<Option<Member>, anyhow::Error> {
        let member = sqlx::query_as::<_, Member>(
            r#"
                UPDATE members SET is_active = $2, updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING id, name, phone, avatar, is_active, created_at, updated_at
            "#,
        )
        .bind(member_id)
        .bind(is_active)
        .fetch_optional(&self.conn)
        .await?;

        Ok(member)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use crate::repositories::StoreError;

    /// In-memory stand-in for the members table, including its unique name.
    #[derive(Clone, Default)]
    pub struct MemoryMemberStore {
        pub members: Arc<Mutex<Vec<Member>>>,
    }

    impl MemoryMemberStore {
        pub fn with_members(members: Vec<Member>) -> Self {
            Self {
                members: Arc::new(Mutex::new(members)),
            }
        }
    }

    fn name_taken(members: &[Member], name: &str, except_id: Option<&str>) -> bool {
        members
            .iter()
            .any(|m| m.name == name && Some(m.id.as_str()) != except_id)
    }

    #[async_trait]
    impl MemberStore for MemoryMemberStore {
        async fn insert_member(
            &self,
            name: &str,
            phone: Option<&str>,
            avatar: Option<&str>,
        ) -> Result<Member, anyhow::Error> {
            let mut members = self.members.lock().unwrap();
            if name_taken(&members, name, None) {
                return Err(StoreError::Conflict("members_name_key".to_string()).into());
            }

            let member = Member {
                id: Uuid::new_v4().hyphenated().to_string(),
                name: name.to_string(),
                phone: phone.map(str::to_string),
                avatar: avatar.map(str::to_string),
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            members.push(member.clone());
            Ok(member)
        }

        async fn get_member_by_id(
            &self,
            member_id: &str,
        ) -> Result<Option<Member>, anyhow::Error> {
            let members = self.members.lock().unwrap();
            Ok(members.iter().find(|m| m.id == member_id).cloned())
        }

        async fn list_members(&self, active: Option<bool>) -> Result<Vec<Member>, anyhow::Error> {
            let members = self.members.lock().unwrap();
            let mut listed: Vec<Member> = members
                .iter()
                .filter(|m| active.map_or(true, |active| m.is_active == active))
                .cloned()
                .collect();
            listed.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(listed)
        }

        async fn update_member(
            &self,
            member_id: &str,
            update: &MemberUpdate,
        ) -> Result<Option<Member>, anyhow::Error> {
            let mut members = self.members.lock().unwrap();
            if let Some(name) = &update.name {
                if name_taken(&members, name, Some(member_id)) {
                    return Err(StoreError::Conflict("members_name_key".to_string()).into());
                }
            }

            let Some(member) = members.iter_mut().find(|m| m.id == member_id) else {
                return Ok(None);
            };
            if let Some(name) = &update.name {
                member.name = name.clone();
            }
            if let Some(phone) = &update.phone {
                member.phone = Some(phone.clone());
            }
            if let Some(avatar) = &update.avatar {
                member.avatar = Some(avatar.clone());
            }
            member.updated_at = Utc::now();
            Ok(Some(member.clone()))
        }

        async fn set_active(
            &self,
            member_id: &str,
            is_active: bool,
        ) -> Result<Option<Member>, anyhow::Error> {
            let mut members = self.members.lock().unwrap();
            Ok(members.iter_mut().find(|m| m.id == member_id).map(|m| {
                m.is_active = is_active;
                m.updated_at = Utc::now();
                m.clone()
            }))
        }
    }
}
