use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

const RATING_SELECT: &str = "SELECT r.id, r.course_id, c.name AS course, r.user_id, \
     u.username AS username, r.rating::float8 AS rating, r.review, r.created_at, r.updated_at \
     FROM course_ratings r \
     JOIN courses c ON c.id = r.course_id \
     JOIN users u ON u.id = r.user_id";

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct CourseRating {
    id: Uuid,
    course_id: Uuid,
    /// Course name
    course: String,
    user_id: Uuid,
    /// Username of the author
    username: String,
    rating: f64,
    review: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CourseRatingUpsert {
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub rating: f64,
    pub review: Option<String>,
}

impl ResourceTyped for CourseRating {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Rating
    }
}

impl CourseRating {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn review(&self) -> Option<&str> {
        self.review.as_deref()
    }

    /// Inserts or replaces the rating of `user_id` for `course_id`; an absent
    /// review keeps the stored one. The flag is `true` when a new row was created.
    pub async fn upsert(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseRatingUpsert,
    ) -> DatabaseResult<(Self, bool)> {
        let (id, created): (Uuid, bool) = sqlx::query_as(
            "INSERT INTO course_ratings (id, course_id, user_id, rating, review) \
             VALUES ($1,$2,$3,$4,$5) \
             ON CONFLICT (course_id, user_id) DO UPDATE \
             SET rating = EXCLUDED.rating, \
                 review = COALESCE(EXCLUDED.review, course_ratings.review), \
                 updated_at = now() \
             RETURNING id, (xmax = 0) AS created",
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(data.user_id)
        .bind(data.rating)
        .bind(&data.review)
        .fetch_one(mm.executor())
        .await?;

        let rating = sqlx::query_as(&format!("{RATING_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_one(mm.executor())
            .await?;

        Ok((rating, created))
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(&format!("{RATING_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(&format!(
            "{RATING_SELECT} WHERE r.course_id = $1 AND r.user_id = $2"
        ))
        .bind(course_id)
        .bind(actor.user_id())
        .fetch_optional(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn list_for_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(&format!(
            "{RATING_SELECT} WHERE r.course_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM course_ratings WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HasOwner for CourseRating {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}
