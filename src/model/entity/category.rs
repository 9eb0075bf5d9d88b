use crate::impl_paginatable_for;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Category {
    id: Uuid,
    name: String,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CategoryCreate {
    pub name: String,
}

impl ResourceTyped for Category {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Category
    }
}

impl Category {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CrudRepository<Category, CategoryCreate, CategoryCreate, Uuid> for Category {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CategoryCreate,
    ) -> DatabaseResult<Self> {
        let result = sqlx::query_as("INSERT INTO categories (id, name) VALUES ($1,$2) RETURNING id, name")
            .bind(Uuid::new_v4())
            .bind(data.name.trim())
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CategoryCreate,
    ) -> DatabaseResult<Self> {
        let name = data.name.trim().to_string();
        sqlx::query("UPDATE categories SET name = $1 WHERE id = $2")
            .bind(&name)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.name = name;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT id, name FROM categories ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Category, CategoryCreate, CategoryCreate, Uuid);

impl Category {
    pub async fn find_by_name(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        name: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT id, name FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Replaces the category links of a course, creating missing categories by name.
    pub async fn replace_for_course(
        tx: &mut Transaction<'static, Postgres>,
        course_id: Uuid,
        names: &[String],
    ) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM course_categories WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut **tx)
            .await?;

        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            sqlx::query("INSERT INTO categories (id, name) VALUES ($1,$2) ON CONFLICT (name) DO NOTHING")
                .bind(Uuid::new_v4())
                .bind(name)
                .execute(&mut **tx)
                .await?;

            sqlx::query(
                "INSERT INTO course_categories (course_id, category_id) \
                 SELECT $1, id FROM categories WHERE name = $2 \
                 ON CONFLICT DO NOTHING",
            )
            .bind(course_id)
            .bind(name)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    pub async fn names_for_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Vec<String>> {
        let names = sqlx::query_scalar(
            "SELECT c.name FROM categories c \
             JOIN course_categories cc ON cc.category_id = c.id \
             WHERE cc.course_id = $1 ORDER BY c.name",
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(names)
    }
}
