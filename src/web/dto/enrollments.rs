use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::model::entity::{EnrollmentFilter, EnrollmentStatus};
use crate::web::dto::{Pagination, parse_param};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct EnrollBody {
    pub course_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct EnrollmentStatusBody {
    /// `pending`, `approved` or `denied`
    pub status: EnrollmentStatus,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollmentListQuery {
    /// `pending`, `approved` or `denied`
    pub status: Option<String>,
    pub course_id: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl EnrollmentListQuery {
    pub fn into_parts(self) -> Result<(EnrollmentFilter, Pagination), String> {
        let pagination = Pagination::parse(self.limit.as_deref(), self.offset.as_deref())?;
        let filter = EnrollmentFilter {
            status: parse_param::<EnrollmentStatus>("status", self.status.as_deref())?,
            course_id: parse_param::<Uuid>("course_id", self.course_id.as_deref())?,
            user_id: parse_param::<Uuid>("user_id", self.user_id.as_deref())?,
        };
        Ok((filter, pagination))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn list_query_is_parsed() {
        let course = Uuid::new_v4();
        let query = EnrollmentListQuery {
            status: Some("pending".into()),
            course_id: Some(course.to_string()),
            limit: Some("5".into()),
            ..Default::default()
        };
        let (filter, page) = query.into_parts().unwrap();
        assert_eq!(filter.status, Some(EnrollmentStatus::Pending));
        assert_eq!(filter.course_id, Some(course));
        assert_eq!(filter.user_id, None);
        assert_eq!(page.limit, 5);
    }

    #[test]
    fn bad_status_or_id_is_rejected() {
        let query = EnrollmentListQuery {
            status: Some("accepted".into()),
            ..Default::default()
        };
        assert!(query.into_parts().unwrap_err().contains("status"));

        let query = EnrollmentListQuery {
            user_id: Some("42".into()),
            ..Default::default()
        };
        assert!(query.into_parts().unwrap_err().contains("user_id"));
    }

    #[test]
    fn status_body_rejects_unknown_values() {
        let body: EnrollmentStatusBody = serde_json::from_str(r#"{"status":"denied"}"#).unwrap();
        assert_eq!(body.status, EnrollmentStatus::Denied);
        assert!(serde_json::from_str::<EnrollmentStatusBody>(r#"{"status":"maybe"}"#).is_err());
    }
}
