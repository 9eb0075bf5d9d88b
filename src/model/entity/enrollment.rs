use std::fmt;
use std::str::FromStr;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::{AuthenticatedUser, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const ENROLLMENT_SELECT: &str = "SELECT e.id, e.course_id, c.name AS course, e.user_id, \
     u.username AS username, e.status, e.approved_by, e.enrolled_at, e.updated_at \
     FROM enrollments e \
     JOIN courses c ON c.id = e.course_id \
     JOIN users u ON u.id = e.user_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Approved,
    Denied,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            other => Err(format!("unknown enrollment status `{other}`")),
        }
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student's request to join a course, reviewed by a moderator or an admin.
#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Enrollment {
    id: Uuid,
    course_id: Uuid,
    /// Course name
    course: String,
    user_id: Uuid,
    /// Username of the student
    username: String,
    #[sqlx(try_from = "String")]
    status: EnrollmentStatus,
    /// Role of the reviewer that last decided on the request
    approved_by: Option<String>,
    enrolled_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EnrollmentCreate {
    pub course_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnrollmentFilter {
    pub status: Option<EnrollmentStatus>,
    pub course_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl ResourceTyped for Enrollment {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Enrollment
    }
}

impl Enrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: EnrollmentCreate,
    ) -> DatabaseResult<Self> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO enrollments (id, course_id, user_id) VALUES ($1,$2,$3) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(data.user_id)
        .fetch_one(mm.executor())
        .await?;

        let enrollment = sqlx::query_as(&format!("{ENROLLMENT_SELECT} WHERE e.id = $1"))
            .bind(id)
            .fetch_one(mm.executor())
            .await?;
        Ok(enrollment)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(&format!("{ENROLLMENT_SELECT} WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Enrollments of the actor, newest first.
    pub async fn list_own(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(&format!(
            "{ENROLLMENT_SELECT} WHERE e.user_id = $1 ORDER BY e.enrolled_at DESC, e.id"
        ))
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn search(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        filter: &EnrollmentFilter,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let mut builder = QueryBuilder::new(format!("{ENROLLMENT_SELECT} WHERE TRUE"));
        push_enrollment_filters(&mut builder, filter);
        builder.push(" ORDER BY e.enrolled_at DESC, e.id");
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
        filter: &EnrollmentFilter,
    ) -> DatabaseResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM enrollments e WHERE TRUE");
        push_enrollment_filters(&mut builder, filter);

        let result: i64 = builder
            .build_query_scalar()
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }

    /// Records a review decision. `approved_by` takes the reviewer's role, and
    /// is cleared when the request goes back to pending.
    pub async fn set_status(
        mut self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        status: EnrollmentStatus,
    ) -> DatabaseResult<Self> {
        let reviewer = reviewer_label(&actor.user_role(), status);

        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE enrollments SET status = $1, approved_by = $2, updated_at = now() \
             WHERE id = $3 RETURNING updated_at",
        )
        .bind(status.as_str())
        .bind(reviewer)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        self.status = status;
        self.approved_by = reviewer.map(str::to_string);
        self.updated_at = updated_at;
        Ok(self)
    }

    pub async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }
}

fn reviewer_label(role: &UserRole, status: EnrollmentStatus) -> Option<&'static str> {
    match (status, role) {
        (EnrollmentStatus::Pending, _) => None,
        (_, UserRole::Admin) => Some("admin"),
        (_, UserRole::Moderator) => Some("moderator"),
        (_, UserRole::Student) => None,
    }
}

fn push_enrollment_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &EnrollmentFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND e.status = ").push_bind(status.as_str());
    }
    if let Some(course_id) = filter.course_id {
        builder.push(" AND e.course_id = ").push_bind(course_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND e.user_id = ").push_bind(user_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_names() {
        assert_eq!("approved".parse::<EnrollmentStatus>(), Ok(EnrollmentStatus::Approved));
        assert_eq!(EnrollmentStatus::default(), EnrollmentStatus::Pending);
        assert!("accepted".parse::<EnrollmentStatus>().is_err());
        assert!(EnrollmentStatus::try_from(String::from("Denied")).is_err());
    }

    #[test]
    fn reviewer_is_recorded_only_for_decisions() {
        assert_eq!(
            reviewer_label(&UserRole::Moderator, EnrollmentStatus::Approved),
            Some("moderator")
        );
        assert_eq!(reviewer_label(&UserRole::Admin, EnrollmentStatus::Denied), Some("admin"));
        assert_eq!(reviewer_label(&UserRole::Admin, EnrollmentStatus::Pending), None);
    }

    #[test]
    fn filters_are_bound() {
        let filter = EnrollmentFilter {
            status: Some(EnrollmentStatus::Pending),
            course_id: Some(Uuid::new_v4()),
            user_id: None,
        };
        let mut builder = QueryBuilder::new("SELECT 1 FROM enrollments e WHERE TRUE");
        push_enrollment_filters(&mut builder, &filter);

        let sql = builder.sql();
        assert!(sql.contains("e.status = $1"));
        assert!(sql.contains("e.course_id = $2"));
        assert!(!sql.contains("e.user_id"));
    }
}
