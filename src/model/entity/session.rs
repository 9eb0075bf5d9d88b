use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::{
    model::{DatabaseResult, ModelManager, ResourceTyped},
    web::AuthenticatedUser,
};

/// A login session; its id is the `jti` of the refresh token.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Session {
    jti: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreate {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl ResourceTyped for Session {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Session
    }
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.jti
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn expires_at(&self) -> &DateTime<Utc> {
        &self.expires_at
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Not revoked and not past its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && self.expires_at > now
    }

    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SessionCreate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query_as(
            "INSERT INTO refresh_tokens (jti, user_id, expires_at) VALUES ($1,$2,$3) \
             RETURNING jti, user_id, created_at, expires_at, revoked_at",
        )
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.expires_at)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        jti: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(
            "SELECT jti, user_id, created_at, expires_at, revoked_at FROM refresh_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(mm.executor())
        .await?;

        Ok(result)
    }

    pub async fn revoke(mut self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let revoked_at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE refresh_tokens SET revoked_at = COALESCE(revoked_at, now()) WHERE jti = $1 RETURNING revoked_at",
        )
        .bind(self.jti)
        .fetch_one(mm.executor())
        .await?;

        self.revoked_at = Some(revoked_at);
        Ok(self)
    }

    /// Revokes every live session of `user_id`, returning how many were affected.
    pub async fn revoke_all_for_user(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > now()",
        )
        .bind(user_id)
        .execute(mm.executor())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn cleanup_expired(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < now()")
            .execute(mm.executor())
            .await?;

        Ok(result.rows_affected())
    }
}
