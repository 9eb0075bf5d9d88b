use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::entity::{Category, SyllabusSection, SyllabusSectionCreate};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::utils::{join_lines, like_pattern};
use crate::web::AuthenticatedUser;

/// Derived table exposing `price` and `average_rating` as floats.
const COURSE_SOURCE: &str = "SELECT * FROM (SELECT c.id, c.name, c.title, c.duration_weeks, \
     c.price::float8 AS price, \
     COALESCE((SELECT AVG(r.rating) FROM course_ratings r WHERE r.course_id = c.id), 0)::float8 AS average_rating, \
     c.training_level, c.class_type, c.image, c.overview, c.objectives, c.prerequisites, \
     c.outcomes, c.career_prospects, c.description_introduction, c.description_overview, \
     c.description_requirements, c.description_context, c.owner_id, c.created_at, c.updated_at \
     FROM courses c) AS course WHERE TRUE";

pub const FEATURED_MIN_RATING: f64 = 4.0;
pub const FEATURED_LIMIT: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrainingLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl TrainingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for TrainingLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown training level `{other}`")),
        }
    }
}

impl fmt::Display for TrainingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassType {
    #[default]
    Online,
    Offline,
    Hybrid,
}

impl ClassType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Hybrid => "hybrid",
        }
    }
}

impl FromStr for ClassType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown class type `{other}`")),
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CourseEntity {
    id: Uuid,
    name: String,
    title: String,
    duration_weeks: i32,
    price: f64,
    average_rating: f64,
    training_level: String,
    class_type: String,
    image: Option<String>,
    overview: Option<String>,
    objectives: String,
    prerequisites: String,
    outcomes: String,
    career_prospects: String,
    description_introduction: Option<String>,
    description_overview: Option<String>,
    description_requirements: Option<String>,
    description_context: Option<String>,
    owner_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseDescription {
    pub introduction: Option<String>,
    pub overview: Option<String>,
    pub requirements: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CourseCreate {
    pub name: String,
    pub title: String,
    pub duration_weeks: i32,
    pub price: f64,
    pub training_level: TrainingLevel,
    pub class_type: ClassType,
    pub image: Option<String>,
    pub overview: Option<String>,
    pub objectives: Vec<String>,
    pub prerequisites: Vec<String>,
    pub outcomes: Vec<String>,
    pub career_prospects: Vec<String>,
    pub description: CourseDescription,
    pub syllabus: Vec<SyllabusSectionCreate>,
    pub categories: Vec<String>,
}

/// Partial update; `None` keeps the stored value. `Some(None)` clears a
/// nullable column. `description`, `syllabus` and `categories` replace the
/// stored ones when present.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub duration_weeks: Option<i32>,
    pub price: Option<f64>,
    pub training_level: Option<TrainingLevel>,
    pub class_type: Option<ClassType>,
    pub image: Option<Option<String>>,
    pub overview: Option<Option<String>>,
    pub objectives: Option<Vec<String>>,
    pub prerequisites: Option<Vec<String>>,
    pub outcomes: Option<Vec<String>>,
    pub career_prospects: Option<Vec<String>>,
    pub description: Option<CourseDescription>,
    pub syllabus: Option<Vec<SyllabusSectionCreate>>,
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseOrderField {
    Name,
    Price,
    Duration,
    CreatedAt,
    Rating,
}

impl CourseOrderField {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "name" => Self::Name,
            "price" => Self::Price,
            "duration" | "duration_weeks" => Self::Duration,
            "created_at" => Self::CreatedAt,
            "rating" | "average_rating" => Self::Rating,
            _ => return None,
        })
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Duration => "duration_weeks",
            Self::CreatedAt => "created_at",
            Self::Rating => "average_rating",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CourseFilter {
    pub price: Option<f64>,
    pub price_gte: Option<f64>,
    pub price_lte: Option<f64>,
    pub training_level: Option<TrainingLevel>,
    pub class_type: Option<ClassType>,
    pub duration: Option<i32>,
    pub duration_gte: Option<i32>,
    pub duration_lte: Option<i32>,
    pub rating_gte: Option<f64>,
    pub rating_lte: Option<f64>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub ordering: Vec<(CourseOrderField, bool)>,
}

impl ResourceTyped for CourseEntity {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Course
    }
}

impl CourseEntity {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration_weeks(&self) -> i32 {
        self.duration_weeks
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn average_rating(&self) -> f64 {
        self.average_rating
    }

    pub fn training_level(&self) -> TrainingLevel {
        self.training_level.parse().unwrap_or_default()
    }

    pub fn class_type(&self) -> ClassType {
        self.class_type.parse().unwrap_or_default()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn overview(&self) -> Option<&str> {
        self.overview.as_deref()
    }

    pub fn objectives(&self) -> Vec<String> {
        crate::utils::split_lines(&self.objectives)
    }

    pub fn prerequisites(&self) -> Vec<String> {
        crate::utils::split_lines(&self.prerequisites)
    }

    pub fn outcomes(&self) -> Vec<String> {
        crate::utils::split_lines(&self.outcomes)
    }

    pub fn career_prospects(&self) -> Vec<String> {
        crate::utils::split_lines(&self.career_prospects)
    }

    pub fn description(&self) -> CourseDescription {
        CourseDescription {
            introduction: self.description_introduction.clone(),
            overview: self.description_overview.clone(),
            requirements: self.description_requirements.clone(),
            context: self.description_context.clone(),
        }
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[async_trait]
impl CrudRepository<CourseEntity, CourseCreate, CoursePatch, Uuid> for CourseEntity {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.transaction().await?;
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO courses (id, name, title, duration_weeks, price, training_level, \
             class_type, image, overview, objectives, prerequisites, outcomes, career_prospects, \
             description_introduction, description_overview, description_requirements, \
             description_context, owner_id) \
             VALUES ($1,$2,$3,$4,$5::numeric,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.title)
        .bind(data.duration_weeks)
        .bind(data.price)
        .bind(data.training_level.as_str())
        .bind(data.class_type.as_str())
        .bind(&data.image)
        .bind(&data.overview)
        .bind(join_lines(&data.objectives))
        .bind(join_lines(&data.prerequisites))
        .bind(join_lines(&data.outcomes))
        .bind(join_lines(&data.career_prospects))
        .bind(&data.description.introduction)
        .bind(&data.description.overview)
        .bind(&data.description.requirements)
        .bind(&data.description.context)
        .bind(owner_of(actor))
        .execute(&mut *tx)
        .await?;

        SyllabusSection::replace_for_course(&mut tx, id, &data.syllabus).await?;
        Category::replace_for_course(&mut tx, id, &data.categories).await?;
        tx.commit().await?;

        fetch_one(mm, id).await
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CoursePatch,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.transaction().await?;
        let replace_description = data.description.is_some();
        let description = data.description.unwrap_or_default();

        sqlx::query(
            "UPDATE courses SET \
             name = COALESCE($1, name), \
             title = COALESCE($2, title), \
             duration_weeks = COALESCE($3, duration_weeks), \
             price = COALESCE($4::numeric, price), \
             training_level = COALESCE($5, training_level), \
             class_type = COALESCE($6, class_type), \
             image = CASE WHEN $7 THEN $8 ELSE image END, \
             overview = CASE WHEN $9 THEN $10 ELSE overview END, \
             objectives = COALESCE($11, objectives), \
             prerequisites = COALESCE($12, prerequisites), \
             outcomes = COALESCE($13, outcomes), \
             career_prospects = COALESCE($14, career_prospects), \
             description_introduction = CASE WHEN $15 THEN $16 ELSE description_introduction END, \
             description_overview = CASE WHEN $15 THEN $17 ELSE description_overview END, \
             description_requirements = CASE WHEN $15 THEN $18 ELSE description_requirements END, \
             description_context = CASE WHEN $15 THEN $19 ELSE description_context END, \
             updated_at = now() \
             WHERE id = $20",
        )
        .bind(&data.name)
        .bind(&data.title)
        .bind(data.duration_weeks)
        .bind(data.price)
        .bind(data.training_level.map(|l| l.as_str()))
        .bind(data.class_type.map(|c| c.as_str()))
        .bind(data.image.is_some())
        .bind(data.image.flatten())
        .bind(data.overview.is_some())
        .bind(data.overview.flatten())
        .bind(data.objectives.as_deref().map(join_lines))
        .bind(data.prerequisites.as_deref().map(join_lines))
        .bind(data.outcomes.as_deref().map(join_lines))
        .bind(data.career_prospects.as_deref().map(join_lines))
        .bind(replace_description)
        .bind(description.introduction)
        .bind(description.overview)
        .bind(description.requirements)
        .bind(description.context)
        .bind(self.id)
        .execute(&mut *tx)
        .await?;

        if let Some(syllabus) = &data.syllabus {
            SyllabusSection::replace_for_course(&mut tx, self.id, syllabus).await?;
        }
        if let Some(categories) = &data.categories {
            Category::replace_for_course(&mut tx, self.id, categories).await?;
        }
        tx.commit().await?;

        fetch_one(mm, self.id).await
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
        let result = sqlx::query_as(&format!("{COURSE_SOURCE} AND id = $1"))
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
        Self::search(mm, actor, &CourseFilter::default(), limit, offset).await
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        Self::count_matching(mm, actor, &CourseFilter::default()).await
    }
}

impl_paginatable_for!(CourseEntity, CourseCreate, CoursePatch, Uuid);

impl CourseEntity {
    pub async fn find_by_name(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        name: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as(&format!("{COURSE_SOURCE} AND name = $1"))
            .bind(name)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn name_taken(
        mm: &ModelManager,
        name: &str,
        except: Option<Uuid>,
    ) -> DatabaseResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(except)
        .fetch_one(mm.executor())
        .await?;
        Ok(taken)
    }

    pub async fn featured(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(&format!(
            "{COURSE_SOURCE} AND average_rating >= $1 \
             ORDER BY average_rating DESC, created_at DESC, id LIMIT $2"
        ))
        .bind(FEATURED_MIN_RATING)
        .bind(FEATURED_LIMIT)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn search(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        filter: &CourseFilter,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let mut builder = QueryBuilder::new(COURSE_SOURCE);
        push_course_filters(&mut builder, filter);
        push_course_ordering(&mut builder, &filter.ordering);
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
        filter: &CourseFilter,
    ) -> DatabaseResult<i64> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM ({COURSE_SOURCE}"));
        push_course_filters(&mut builder, filter);
        builder.push(") AS matching");

        let result: i64 = builder
            .build_query_scalar()
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

async fn fetch_one(mm: &ModelManager, id: Uuid) -> DatabaseResult<CourseEntity> {
    let result = sqlx::query_as(&format!("{COURSE_SOURCE} AND id = $1"))
        .bind(id)
        .fetch_one(mm.executor())
        .await?;
    Ok(result)
}

/// The system actor does not map to a user row.
fn owner_of(actor: &AuthenticatedUser) -> Option<Uuid> {
    let id = actor.user_id();
    (id != Uuid::max()).then_some(id)
}

fn push_course_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &CourseFilter) {
    if let Some(price) = filter.price {
        builder.push(" AND price = ").push_bind(price);
    }
    if let Some(price) = filter.price_gte {
        builder.push(" AND price >= ").push_bind(price);
    }
    if let Some(price) = filter.price_lte {
        builder.push(" AND price <= ").push_bind(price);
    }
    if let Some(level) = filter.training_level {
        builder.push(" AND training_level = ").push_bind(level.as_str());
    }
    if let Some(class_type) = filter.class_type {
        builder.push(" AND class_type = ").push_bind(class_type.as_str());
    }
    if let Some(weeks) = filter.duration {
        builder.push(" AND duration_weeks = ").push_bind(weeks);
    }
    if let Some(weeks) = filter.duration_gte {
        builder.push(" AND duration_weeks >= ").push_bind(weeks);
    }
    if let Some(weeks) = filter.duration_lte {
        builder.push(" AND duration_weeks <= ").push_bind(weeks);
    }
    if let Some(rating) = filter.rating_gte {
        builder.push(" AND average_rating >= ").push_bind(rating);
    }
    if let Some(rating) = filter.rating_lte {
        builder.push(" AND average_rating <= ").push_bind(rating);
    }
    if let Some(category) = filter.category.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM course_categories cc \
                 JOIN categories cat ON cat.id = cc.category_id \
                 WHERE cc.course_id = course.id AND lower(cat.name) = lower(",
            )
            .push_bind(category.to_string())
            .push("))");
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR overview ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_course_ordering(
    builder: &mut QueryBuilder<'_, Postgres>,
    ordering: &[(CourseOrderField, bool)],
) {
    builder.push(" ORDER BY ");
    if ordering.is_empty() {
        builder.push("created_at DESC");
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
    use crate::utils::parse_ordering;

    #[test]
    fn ordering_accepts_aliases_and_direction() {
        let parsed = parse_ordering("-rating, duration_weeks,price", CourseOrderField::parse).unwrap();
        assert_eq!(
            parsed,
            vec![
                (CourseOrderField::Rating, true),
                (CourseOrderField::Duration, false),
                (CourseOrderField::Price, false),
            ]
        );
    }

    #[test]
    fn ordering_rejects_unknown_fields() {
        let err = parse_ordering("-owner_id", CourseOrderField::parse).unwrap_err();
        assert!(err.contains("owner_id"));
    }

    #[test]
    fn default_ordering_is_newest_first() {
        let mut builder = QueryBuilder::new(COURSE_SOURCE);
        push_course_filters(&mut builder, &CourseFilter::default());
        push_course_ordering(&mut builder, &[]);
        assert!(builder.sql().ends_with("ORDER BY created_at DESC, id"));
    }

    #[test]
    fn price_range_and_rating_are_bound() {
        let filter = CourseFilter {
            price_gte: Some(3000.0),
            price_lte: Some(10000.0),
            rating_gte: Some(4.0),
            category: Some("Rust".to_string()),
            ordering: vec![(CourseOrderField::Rating, true)],
            ..Default::default()
        };
        let mut builder = QueryBuilder::new(COURSE_SOURCE);
        push_course_filters(&mut builder, &filter);
        push_course_ordering(&mut builder, &filter.ordering);

        let sql = builder.sql();
        assert!(sql.contains("price >= $1"));
        assert!(sql.contains("price <= $2"));
        assert!(sql.contains("average_rating >= $3"));
        assert!(sql.contains("lower(cat.name) = lower($4)"));
        assert!(!sql.contains("Rust"));
        assert!(sql.ends_with("ORDER BY average_rating DESC, id"));
    }

    #[test]
    fn enums_round_trip_through_strings() {
        assert_eq!("advanced".parse::<TrainingLevel>(), Ok(TrainingLevel::Advanced));
        assert_eq!(ClassType::Hybrid.to_string(), "hybrid");
        assert!("remote".parse::<ClassType>().is_err());
    }
}
