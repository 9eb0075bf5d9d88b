use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::web::AuthenticatedUser;
use crate::web::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
     is_active, address, phone_no, profile_picture, is_approved, date_joined";

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserEntity {
    id: uuid::Uuid,
    username: String,
    email: String,
    #[serde(skip)]
    password_hash: String,
    first_name: String,
    last_name: String,
    role: String,
    is_active: bool,
    address: Option<String>,
    phone_no: Option<String>,
    profile_picture: Option<String>,
    is_approved: bool,
    date_joined: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserEntityCreate {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub address: Option<String>,
    pub phone_no: Option<String>,
    pub profile_picture: Option<String>,
}

/// Partial update; `None` leaves the column untouched, `Some(None)` clears a
/// nullable one.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserEntityUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<Option<String>>,
    pub phone_no: Option<Option<String>>,
    pub profile_picture: Option<Option<String>>,
}

/// Admin listing filters.
#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub ordering: Vec<(UserOrderField, bool)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOrderField {
    Username,
    Email,
    FirstName,
    LastName,
    Role,
    IsActive,
    DateJoined,
}

impl UserOrderField {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "username" => Self::Username,
            "email" => Self::Email,
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            "role" => Self::Role,
            "is_active" => Self::IsActive,
            "date_joined" => Self::DateJoined,
            _ => return None,
        })
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Role => "role",
            Self::IsActive => "is_active",
            Self::DateJoined => "date_joined",
        }
    }
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::repo::ResourceType {
        crate::model::repo::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn phone_no(&self) -> Option<&str> {
        self.phone_no.as_deref()
    }

    pub fn profile_picture(&self) -> Option<&str> {
        self.profile_picture.as_deref()
    }

    pub fn is_approved(&self) -> bool {
        self.is_approved
    }

    pub fn date_joined(&self) -> DateTime<Utc> {
        self.date_joined
    }
}

#[async_trait::async_trait]
impl CrudRepository<UserEntity, UserEntityCreate, UserEntityUpdate, uuid::Uuid> for UserEntity {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query_as(&format!(
            "INSERT INTO users (id, username, email, password_hash, first_name, last_name, role, \
             address, phone_no, profile_picture) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.role.to_string())
        .bind(&data.address)
        .bind(&data.phone_no)
        .bind(&data.profile_picture)
        .fetch_one(mm.executor())
        .await?;

        Ok(result)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityUpdate,
    ) -> DatabaseResult<Self> {
        let updated = sqlx::query_as(&format!(
            "UPDATE users SET \
             username = COALESCE($1, username), \
             email = COALESCE($2, email), \
             password_hash = COALESCE($3, password_hash), \
             first_name = COALESCE($4, first_name), \
             last_name = COALESCE($5, last_name), \
             address = CASE WHEN $6 THEN $7 ELSE address END, \
             phone_no = CASE WHEN $8 THEN $9 ELSE phone_no END, \
             profile_picture = CASE WHEN $10 THEN $11 ELSE profile_picture END \
             WHERE id = $12 RETURNING {USER_COLUMNS}"
        ))
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.address.is_some())
        .bind(data.address.flatten())
        .bind(data.phone_no.is_some())
        .bind(data.phone_no.flatten())
        .bind(data.profile_picture.is_some())
        .bind(data.profile_picture.flatten())
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        Self::search(mm, actor, &UserFilter::default(), limit, offset).await
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        Self::count_matching(mm, actor, &UserFilter::default()).await
    }
}

impl_paginatable_for!(UserEntity, UserEntityCreate, UserEntityUpdate, Uuid);

#[async_trait]
impl HasOwner for UserEntity {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of users are themselves
    }
}

impl UserEntity {
    pub async fn find_by_username(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        username: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    /// Username taken by anyone other than `except`.
    pub async fn username_taken(
        mm: &ModelManager,
        username: &str,
        except: Option<Uuid>,
    ) -> DatabaseResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(mm.executor())
        .await?;
        Ok(taken)
    }

    /// Case-insensitive, mirrors the `lower(email)` unique index.
    pub async fn email_taken(
        mm: &ModelManager,
        email: &str,
        except: Option<Uuid>,
    ) -> DatabaseResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(mm.executor())
        .await?;
        Ok(taken)
    }

    pub async fn set_active(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        active: bool,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
            .bind(active)
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        self.is_active = active;
        Ok(self)
    }

    pub async fn search(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let mut builder = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        push_user_filters(&mut builder, filter);
        push_user_ordering(&mut builder, &filter.ordering);
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let result = builder
            .build_query_as::<Self>()
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn count_matching(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        filter: &UserFilter,
    ) -> DatabaseResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filters(&mut builder, filter);

        let result: i64 = builder
            .build_query_scalar()
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(role) = &filter.role {
        builder.push(" AND role = ").push_bind(role.to_string());
    }
    if let Some(active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(active);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = crate::utils::like_pattern(search);
        builder
            .push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_user_ordering(builder: &mut QueryBuilder<'_, Postgres>, ordering: &[(UserOrderField, bool)]) {
    builder.push(" ORDER BY ");
    if ordering.is_empty() {
        builder.push("date_joined DESC");
    }
    for (i, (field, descending)) in ordering.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(field.column());
        builder.push(if *descending { " DESC" } else { " ASC" });
    }
    builder.push(", id");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_listing_is_newest_first() {
        let mut builder = QueryBuilder::new("SELECT 1 FROM users WHERE TRUE");
        push_user_filters(&mut builder, &UserFilter::default());
        push_user_ordering(&mut builder, &[]);
        assert!(builder.sql().ends_with("ORDER BY date_joined DESC, id"));
    }

    #[test]
    fn filters_are_bound_not_interpolated() {
        let filter = UserFilter {
            role: Some(UserRole::Moderator),
            is_active: Some(true),
            search: Some("o'brien".to_string()),
            ordering: vec![(UserOrderField::Username, false), (UserOrderField::Role, true)],
        };
        let mut builder = QueryBuilder::new("SELECT 1 FROM users WHERE TRUE");
        push_user_filters(&mut builder, &filter);
        push_user_ordering(&mut builder, &filter.ordering);

        let sql = builder.sql();
        assert!(!sql.contains("o'brien"));
        assert!(sql.contains("role = $1"));
        assert!(sql.contains("is_active = $2"));
        assert!(sql.contains("username ILIKE $3"));
        assert!(sql.ends_with("ORDER BY username ASC, role DESC, id"));
    }

    #[test]
    fn order_field_names() {
        assert_eq!(UserOrderField::parse("date_joined"), Some(UserOrderField::DateJoined));
        assert_eq!(UserOrderField::parse("password_hash"), None);
    }
}
