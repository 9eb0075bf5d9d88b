use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub struct BearerAuthModifier;

impl Modify for BearerAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            let mut scheme = Http::new(HttpAuthScheme::Bearer);
            scheme.bearer_format = Some(String::from("JWT"));
            scheme.description = Some(String::from("Access token returned by `/api/auth/login`"));
            schema.add_security_scheme("bearer", SecurityScheme::Http(scheme));
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::auth::register_student_handler,
        crate::web::routes::auth::register_moderator_handler,
        crate::web::routes::auth::login_handler,
        crate::web::routes::auth::refresh_handler,
        crate::web::routes::auth::logout_handler,
        crate::web::routes::auth::logout_all_handler,
        crate::web::routes::users::profile_handler,
        crate::web::routes::users::edit_profile_handler,
        crate::web::routes::users::delete_profile_handler,
        crate::web::routes::users::admin_profile_handler,
        crate::web::routes::users::admin_delete_temporary_handler,
        crate::web::routes::users::admin_delete_permanent_handler,
        crate::web::routes::users::admin_reactivate_handler,
        crate::web::routes::users::user_list_handler,
        crate::web::routes::courses::course_add_handler,
        crate::web::routes::courses::course_list_handler,
        crate::web::routes::courses::course_featured_handler,
        crate::web::routes::courses::course_detail_handler,
        crate::web::routes::courses::course_update_handler,
        crate::web::routes::courses::course_delete_handler,
        crate::web::routes::categories::category_list_handler,
        crate::web::routes::categories::category_add_handler,
        crate::web::routes::categories::category_edit_handler,
        crate::web::routes::categories::category_delete_handler,
        crate::web::routes::ratings::rating_rate_handler,
        crate::web::routes::ratings::rating_check_handler,
        crate::web::routes::ratings::rating_list_handler,
        crate::web::routes::ratings::rating_delete_handler,
        crate::web::routes::enrollments::enrollment_add_handler,
        crate::web::routes::enrollments::enrollment_list_handler,
        crate::web::routes::enrollments::enrollment_mine_handler,
        crate::web::routes::enrollments::enrollment_edit_handler,
        crate::web::routes::enrollments::enrollment_delete_handler,
    ),
    modifiers(&BearerAuthModifier),
    tags(
        (name = "auth", description = "Registration, login and token lifecycle"),
        (name = "users", description = "Own profile management"),
        (name = "admin", description = "User administration"),
        (name = "courses", description = "Course catalog"),
        (name = "categories", description = "Course categories"),
        (name = "ratings", description = "Course ratings"),
        (name = "enrollment", description = "Course enrollment requests and review"),
    ),
)]
pub struct ApiDoc;
