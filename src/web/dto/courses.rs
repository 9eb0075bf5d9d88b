use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    model::entity::{
        ClassType, CourseCreate, CourseDescription, CourseEntity, CourseFilter, CourseOrderField,
        CoursePatch, SyllabusItemCreate, SyllabusSection, SyllabusSectionCreate, TrainingLevel,
    },
    utils::parse_ordering,
    web::dto::{Pagination, double_option, parse_finite, parse_param},
};

const DEFAULT_DURATION_WEEKS: i32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct SyllabusItemBody {
    #[validate(length(min = 1, max = 255))]
    pub content: String,
    #[validate(range(min = 0))]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct SyllabusSectionBody {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(range(min = 0))]
    pub position: i32,
    #[serde(default)]
    #[validate(nested, custom(function = "validate_item_positions"))]
    pub items: Vec<SyllabusItemBody>,
}

impl From<SyllabusSectionBody> for SyllabusSectionCreate {
    fn from(body: SyllabusSectionBody) -> Self {
        Self {
            title: body.title,
            position: body.position,
            items: body
                .items
                .into_iter()
                .map(|item| SyllabusItemCreate {
                    content: item.content,
                    position: item.position,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct DescriptionBody {
    #[validate(length(max = 500))]
    pub introduction: Option<String>,
    #[validate(length(max = 500))]
    pub overview: Option<String>,
    #[validate(length(max = 500))]
    pub requirements: Option<String>,
    #[validate(length(max = 500))]
    pub context: Option<String>,
}

impl From<DescriptionBody> for CourseDescription {
    fn from(body: DescriptionBody) -> Self {
        Self {
            introduction: body.introduction,
            overview: body.overview,
            requirements: body.requirements,
            context: body.context,
        }
    }
}

fn validate_section_positions(sections: &[SyllabusSectionBody]) -> Result<(), ValidationError> {
    unique_positions(sections.iter().map(|s| s.position), "duplicate_section_position")
}

fn validate_item_positions(items: &[SyllabusItemBody]) -> Result<(), ValidationError> {
    unique_positions(items.iter().map(|i| i.position), "duplicate_item_position")
}

fn unique_positions(
    positions: impl Iterator<Item = i32>,
    code: &'static str,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for position in positions {
        if !seen.insert(position) {
            return Err(ValidationError::new(code)
                .with_message(format!("Position {position} is used more than once.").into()));
        }
    }
    Ok(())
}

/// Course names are URL path segments: non-blank once trimmed, at most 100
/// characters, and without `/`.
fn validate_course_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(ValidationError::new("course_name")
            .with_message("Course name must be 1-100 non-blank characters.".into()));
    }
    if trimmed.contains('/') {
        return Err(ValidationError::new("course_name")
            .with_message("Course name cannot contain `/`.".into()));
    }
    Ok(())
}

fn validate_category_names(names: &[String]) -> Result<(), ValidationError> {
    if names.iter().any(|n| n.trim().is_empty() || n.chars().count() > 255) {
        return Err(ValidationError::new("category_name")
            .with_message("Category names must be 1-255 characters.".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CourseCreateBody {
    #[validate(custom(function = "validate_course_name"))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(range(min = 1))]
    pub duration_weeks: Option<i32>,
    #[validate(range(min = 0.0, max = 99999999.99))]
    pub price: Option<f64>,
    #[serde(default)]
    pub training_level: TrainingLevel,
    #[serde(default)]
    pub class_type: ClassType,
    pub image: Option<String>,
    pub overview: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub career_prospects: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub description: DescriptionBody,
    #[serde(default)]
    #[validate(nested, custom(function = "validate_section_positions"))]
    pub syllabus: Vec<SyllabusSectionBody>,
    #[serde(default)]
    #[validate(custom(function = "validate_category_names"))]
    pub categories: Vec<String>,
}

impl From<CourseCreateBody> for CourseCreate {
    fn from(body: CourseCreateBody) -> Self {
        Self {
            name: body.name.trim().to_string(),
            title: body.title,
            duration_weeks: body.duration_weeks.unwrap_or(DEFAULT_DURATION_WEEKS),
            price: body.price.unwrap_or(0.0),
            training_level: body.training_level,
            class_type: body.class_type,
            image: body.image,
            overview: body.overview,
            objectives: body.objectives,
            prerequisites: body.prerequisites,
            outcomes: body.outcomes,
            career_prospects: body.career_prospects,
            description: body.description.into(),
            syllabus: body.syllabus.into_iter().map(Into::into).collect(),
            categories: body.categories,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct CoursePatchBody {
    #[validate(custom(function = "validate_course_name"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(range(min = 1))]
    pub duration_weeks: Option<i32>,
    #[validate(range(min = 0.0, max = 99999999.99))]
    pub price: Option<f64>,
    pub training_level: Option<TrainingLevel>,
    pub class_type: Option<ClassType>,
    /// `null` clears the image
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,
    /// `null` clears the overview
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub overview: Option<Option<String>>,
    pub objectives: Option<Vec<String>>,
    pub prerequisites: Option<Vec<String>>,
    pub outcomes: Option<Vec<String>>,
    pub career_prospects: Option<Vec<String>>,
    /// Replaces the whole description block; omitted parts are cleared
    #[validate(nested)]
    pub description: Option<DescriptionBody>,
    #[validate(nested, custom(function = "validate_section_positions"))]
    pub syllabus: Option<Vec<SyllabusSectionBody>>,
    #[validate(custom(function = "validate_category_names"))]
    pub categories: Option<Vec<String>>,
}

impl From<CoursePatchBody> for CoursePatch {
    fn from(body: CoursePatchBody) -> Self {
        Self {
            name: body.name.map(|n| n.trim().to_string()),
            title: body.title,
            duration_weeks: body.duration_weeks,
            price: body.price,
            training_level: body.training_level,
            class_type: body.class_type,
            image: body.image,
            overview: body.overview,
            objectives: body.objectives,
            prerequisites: body.prerequisites,
            outcomes: body.outcomes,
            career_prospects: body.career_prospects,
            description: body.description.map(Into::into),
            syllabus: body
                .syllabus
                .map(|sections| sections.into_iter().map(Into::into).collect()),
            categories: body.categories,
        }
    }
}

/// All values arrive as strings so malformed input can be reported as a 400.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseListQuery {
    pub price: Option<String>,
    pub price_gte: Option<String>,
    pub price_lte: Option<String>,
    /// `beginner`, `intermediate` or `advanced`
    pub training_level: Option<String>,
    /// `online`, `offline` or `hybrid`
    pub class_type: Option<String>,
    /// Exact duration in weeks
    pub duration: Option<String>,
    pub duration_gte: Option<String>,
    pub duration_lte: Option<String>,
    pub rating_gte: Option<String>,
    pub rating_lte: Option<String>,
    /// Category name
    pub category: Option<String>,
    /// Matches name, title or overview
    pub search: Option<String>,
    /// Comma separated list of `name`, `price`, `duration`, `duration_weeks`,
    /// `created_at`, `rating`, `average_rating`; `-` prefix for descending
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl CourseListQuery {
    pub fn into_parts(self) -> Result<(CourseFilter, Pagination), String> {
        let pagination = Pagination::parse(self.limit.as_deref(), self.offset.as_deref())?;
        let ordering = match self.ordering.as_deref() {
            Some(value) => parse_ordering(value, CourseOrderField::parse)?,
            None => Vec::new(),
        };

        let filter = CourseFilter {
            price: parse_finite("price", self.price.as_deref())?,
            price_gte: parse_finite("price_gte", self.price_gte.as_deref())?,
            price_lte: parse_finite("price_lte", self.price_lte.as_deref())?,
            training_level: parse_param("training_level", self.training_level.as_deref())?,
            class_type: parse_param("class_type", self.class_type.as_deref())?,
            duration: parse_param("duration", self.duration.as_deref())?,
            duration_gte: parse_param("duration_gte", self.duration_gte.as_deref())?,
            duration_lte: parse_param("duration_lte", self.duration_lte.as_deref())?,
            rating_gte: parse_finite("rating_gte", self.rating_gte.as_deref())?,
            rating_lte: parse_finite("rating_lte", self.rating_lte.as_deref())?,
            category: self.category.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            ordering,
        };

        Ok((filter, pagination))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseSummary {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub duration_weeks: i32,
    pub price: f64,
    pub average_rating: f64,
    pub training_level: TrainingLevel,
    pub class_type: ClassType,
    pub image: Option<String>,
    pub overview: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CourseEntity> for CourseSummary {
    fn from(course: &CourseEntity) -> Self {
        Self {
            id: course.id(),
            name: course.name().to_string(),
            title: course.title().to_string(),
            duration_weeks: course.duration_weeks(),
            price: round2(course.price()),
            average_rating: round2(course.average_rating()),
            training_level: course.training_level(),
            class_type: course.class_type(),
            image: course.image().map(String::from),
            overview: course.overview().map(String::from),
            created_at: course.created_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub summary: CourseSummary,
    pub objectives: Vec<String>,
    pub prerequisites: Vec<String>,
    pub outcomes: Vec<String>,
    pub career_prospects: Vec<String>,
    pub description: CourseDescription,
    pub syllabus: Vec<SyllabusSection>,
    pub categories: Vec<String>,
    pub owner_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl CourseDetail {
    pub fn new(course: &CourseEntity, syllabus: Vec<SyllabusSection>, categories: Vec<String>) -> Self {
        Self {
            summary: CourseSummary::from(course),
            objectives: course.objectives(),
            prerequisites: course.prerequisites(),
            outcomes: course.outcomes(),
            career_prospects: course.career_prospects(),
            description: course.description(),
            syllabus,
            categories,
            owner_id: course.owner_id(),
            updated_at: course.updated_at(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> CourseCreateBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let create: CourseCreate = body(json!({"name": "rust-101", "title": "Rust"})).into();
        assert_eq!(create.duration_weeks, DEFAULT_DURATION_WEEKS);
        assert_eq!(create.price, 0.0);
        assert_eq!(create.training_level, TrainingLevel::Beginner);
        assert_eq!(create.class_type, ClassType::Online);
    }

    #[test]
    fn duplicate_section_positions_are_rejected() {
        let course = body(json!({
            "name": "rust-101",
            "title": "Rust",
            "syllabus": [
                {"title": "Intro", "position": 0},
                {"title": "Ownership", "position": 0},
            ],
        }));
        let errors = course.validate().unwrap_err();
        assert!(errors.errors().contains_key("syllabus"));
    }

    #[test]
    fn duplicate_item_positions_are_rejected() {
        let course = body(json!({
            "name": "rust-101",
            "title": "Rust",
            "syllabus": [{
                "title": "Intro",
                "position": 0,
                "items": [
                    {"content": "Setup", "position": 1},
                    {"content": "Hello", "position": 1},
                ],
            }],
        }));
        assert!(course.validate().is_err());
    }

    #[test]
    fn negative_price_and_zero_duration_fail() {
        let course = body(json!({
            "name": "rust-101",
            "title": "Rust",
            "price": -1.0,
            "duration_weeks": 0,
        }));
        let errors = course.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("duration_weeks"));
    }

    #[test]
    fn unknown_training_level_does_not_deserialize() {
        let parsed = serde_json::from_value::<CourseCreateBody>(json!({
            "name": "rust-101",
            "title": "Rust",
            "training_level": "expert",
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn list_query_is_parsed() {
        let query = CourseListQuery {
            price_gte: Some("3000".into()),
            price_lte: Some("10000".into()),
            training_level: Some("advanced".into()),
            ordering: Some("-rating".into()),
            limit: Some("5".into()),
            ..Default::default()
        };
        let (filter, page) = query.into_parts().unwrap();
        assert_eq!(filter.price_gte, Some(3000.0));
        assert_eq!(filter.price_lte, Some(10000.0));
        assert_eq!(filter.training_level, Some(TrainingLevel::Advanced));
        assert_eq!(filter.ordering, vec![(CourseOrderField::Rating, true)]);
        assert_eq!(page.limit, 5);
    }

    #[test]
    fn malformed_list_query_fails() {
        for query in [
            CourseListQuery {
                price_gte: Some("cheap".into()),
                ..Default::default()
            },
            CourseListQuery {
                class_type: Some("remote".into()),
                ..Default::default()
            },
            CourseListQuery {
                ordering: Some("-popularity".into()),
                ..Default::default()
            },
            CourseListQuery {
                duration: Some("4.5".into()),
                ..Default::default()
            },
        ] {
            assert!(query.into_parts().is_err());
        }
    }

    #[test]
    fn blank_or_slashed_names_are_rejected() {
        for name in ["   ", "", "web/dev"] {
            let errors = body(json!({"name": name, "title": "Rust"})).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("name"), "{name:?} accepted");
        }
        assert!(body(json!({"name": "  rust-101 ", "title": "Rust"})).validate().is_ok());

        let patch: CoursePatchBody = serde_json::from_value(json!({"name": " \t"})).unwrap();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn patch_tells_null_from_missing() {
        let patch: CoursePatchBody =
            serde_json::from_value(json!({"image": null, "title": "New"})).unwrap();
        let patch = CoursePatch::from(patch);
        assert_eq!(patch.image, Some(None));
        assert_eq!(patch.overview, None);
        assert!(patch.description.is_none());
    }

    #[test]
    fn ratings_are_rounded() {
        assert_eq!(round2(4.333333), 4.33);
        assert_eq!(round2(0.0), 0.0);
    }
}
