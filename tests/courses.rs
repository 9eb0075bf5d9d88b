use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

#[tokio::test]
async fn admin_creates_course_and_anyone_reads_it() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(
            add_course_action("rust-101", 4999.5)
                .with_auth("admin")
                .assert_body(|body| {
                    assert_eq!(body["price"], 4999.5);
                    assert_eq!(body["duration_weeks"], 6);
                    assert_eq!(body["categories"], json!(["Programming"]));
                }),
        )
        .step(
            Action::new("detail", "GET", "/api/courses/rust-101").assert_body(|body| {
                assert_eq!(body["title"], "rust-101 course");
                assert_eq!(body["average_rating"], 0.0);
                assert_eq!(body["objectives"], json!(["Learn the basics", "Ship a project"]));
                assert_eq!(body["description"]["introduction"], "Welcome");
                assert_eq!(body["syllabus"][0]["title"], "Getting started");
                assert_eq!(body["syllabus"][0]["items"][1]["content"], "First steps");
                assert_eq!(body["syllabus"][1]["items"], json!([]));
            }),
        )
        .step(
            add_course_action("rust-101", 10.0)
                .with_auth("admin")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("unknown", "GET", "/api/courses/missing")
                .with_expect(StatusCode::NOT_FOUND),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn course_defaults_apply() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(
            Action::new("minimal course", "POST", "/api/courses/add")
                .with_auth("admin")
                .with_body(json!({"name": "intro", "title": "Intro"}))
                .with_expect(StatusCode::CREATED)
                .assert_body(|body| {
                    assert_eq!(body["duration_weeks"], 4);
                    assert_eq!(body["price"], 0.0);
                    assert_eq!(body["training_level"], "beginner");
                }),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn blank_course_names_are_rejected() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(
            Action::new("blank name", "POST", "/api/courses/add")
                .with_auth("admin")
                .with_body(json!({"name": "   ", "title": "Blank"}))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("slash in name", "POST", "/api/courses/add")
                .with_auth("admin")
                .with_body(json!({"name": "web/dev", "title": "Web"}))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(add_course_action("rust-101", 100.0).with_auth("admin"))
        .step(
            Action::new("rename to blank", "PATCH", "/api/courses/update/rust-101")
                .with_auth("admin")
                .with_body(json!({"name": " "}))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("list", "GET", "/api/courses/list-courses")
                .assert_body(|body| assert_eq!(body["total"], 1)),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn update_clears_nullable_fields() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(
            Action::new("add", "POST", "/api/courses/add")
                .with_auth("admin")
                .with_body(json!({
                    "name": "intro",
                    "title": "Intro",
                    "image": "https://cdn.example.com/intro.png",
                    "overview": "Short overview",
                    "description": {"introduction": "Hi", "context": "Ctx"},
                }))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("title only", "PATCH", "/api/courses/update/intro")
                .with_auth("admin")
                .with_body(json!({"title": "Introduction"}))
                .assert_body(|body| {
                    assert_eq!(body["image"], "https://cdn.example.com/intro.png");
                    assert_eq!(body["overview"], "Short overview");
                    assert_eq!(body["description"]["context"], "Ctx");
                }),
        )
        .step(
            Action::new("clear", "PATCH", "/api/courses/update/intro")
                .with_auth("admin")
                .with_body(json!({"image": null, "description": {"introduction": "Hello"}}))
                .assert_body(|body| {
                    assert!(body["image"].is_null());
                    assert_eq!(body["overview"], "Short overview");
                    assert_eq!(body["description"]["introduction"], "Hello");
                    assert!(body["description"]["context"].is_null());
                }),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn non_finite_filters_are_rejected() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(
            Action::new("nan", "GET", "/api/courses/list-courses")
                .with_param("price_gte", "NaN")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("inf", "GET", "/api/courses/list-courses")
                .with_param("price_lte", "inf")
                .with_expect(StatusCode::BAD_REQUEST),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn students_cannot_manage_courses() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(add_course_action("rust-101", 100.0).with_expect(StatusCode::UNAUTHORIZED))
        .step(register_student_action("jane.doe", STRONG_PASSWORD))
        .step(login_action("jane.doe", STRONG_PASSWORD).with_save_as("jane"))
        .step(
            add_course_action("rust-101", 100.0)
                .with_auth("jane")
                .with_expect(StatusCode::FORBIDDEN),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn moderator_edits_but_cannot_delete() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(register_moderator_action("mod.one").with_auth("admin"))
        .step(login_action("mod.one", STRONG_PASSWORD).with_save_as("mod"))
        .step(add_course_action("rust-101", 100.0).with_auth("mod"))
        .step(
            Action::new("update", "PATCH", "/api/courses/update/rust-101")
                .with_auth("mod")
                .with_body(json!({"name": "rust-102", "price": 150, "categories": ["Systems"]}))
                .assert_body(|body| {
                    assert_eq!(body["name"], "rust-102");
                    assert_eq!(body["price"], 150.0);
                    assert_eq!(body["categories"], json!(["Systems"]));
                    assert_eq!(body["objectives"], json!(["Learn the basics", "Ship a project"]));
                }),
        )
        .step(
            Action::new("delete", "DELETE", "/api/courses/delete/rust-102")
                .with_auth("mod")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("delete", "DELETE", "/api/courses/delete/rust-102")
                .with_auth("admin")
                .with_expect(StatusCode::NO_CONTENT),
        )
        .step(
            Action::new("gone", "GET", "/api/courses/rust-102")
                .with_expect(StatusCode::NOT_FOUND),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn list_filters_and_orders() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(add_course_action("cheap", 1000.0).with_auth("admin"))
        .step(add_course_action("middle", 5000.0).with_auth("admin"))
        .step(add_course_action("pricey", 9000.0).with_auth("admin"))
        .step(add_course_action("luxury", 20000.0).with_auth("admin"))
        .step(
            Action::new("price range", "GET", "/api/courses/list-courses")
                .with_param("price_gte", "3000")
                .with_param("price_lte", "10000")
                .with_param("ordering", "-price")
                .assert_body(|body| {
                    assert_eq!(body["total"], 2);
                    assert_eq!(body["items"][0]["name"], "pricey");
                    assert_eq!(body["items"][1]["name"], "middle");
                }),
        )
        .step(
            Action::new("search", "GET", "/api/courses/list-courses")
                .with_param("search", "LUX")
                .assert_body(|body| {
                    assert_eq!(body["total"], 1);
                    assert_eq!(body["items"][0]["name"], "luxury");
                }),
        )
        .step(
            Action::new("category", "GET", "/api/courses/list-courses")
                .with_param("category", "programming")
                .with_param("limit", "2")
                .assert_body(|body| {
                    assert_eq!(body["total"], 4);
                    assert_eq!(body["items"].as_array().unwrap().len(), 2);
                }),
        )
        .step(
            Action::new("bad price", "GET", "/api/courses/list-courses")
                .with_param("price_gte", "cheap")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("bad ordering", "GET", "/api/courses/list-courses")
                .with_param("ordering", "owner")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("bad level", "GET", "/api/courses/list-courses")
                .with_param("training_level", "expert")
                .with_expect(StatusCode::BAD_REQUEST),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn ratings_drive_ordering_and_featured() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(add_course_action("good", 100.0).with_auth("admin").with_save_as("good"))
        .step(add_course_action("okay", 100.0).with_auth("admin").with_save_as("okay"))
        .step(register_student_action("jane.doe", STRONG_PASSWORD))
        .step(login_action("jane.doe", STRONG_PASSWORD).with_save_as("jane"))
        .step(
            Action::new("rate good", "POST", "")
                .with_auth("jane")
                .with_dyn_path(|ctx| format!("/api/ratings/rate/{}", ctx.field("good", "id")))
                .with_body(json!({"rating": 4.5, "review": "Great"}))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("re-rate good", "POST", "")
                .with_auth("jane")
                .with_dyn_path(|ctx| format!("/api/ratings/rate/{}", ctx.field("good", "id")))
                .with_body(json!({"rating": 5}))
                .assert_body(|body| assert_eq!(body["rating"], 5.0)),
        )
        .step(
            Action::new("rate okay", "POST", "")
                .with_auth("jane")
                .with_dyn_path(|ctx| format!("/api/ratings/rate/{}", ctx.field("okay", "id")))
                .with_body(json!({"rating": 3}))
                .with_expect(StatusCode::CREATED)
                .with_save_as("okay_rating"),
        )
        .step(
            Action::new("out of range", "POST", "")
                .with_auth("jane")
                .with_dyn_path(|ctx| format!("/api/ratings/rate/{}", ctx.field("okay", "id")))
                .with_body(json!({"rating": 7}))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("admin cannot rate", "POST", "")
                .with_auth("admin")
                .with_dyn_path(|ctx| format!("/api/ratings/rate/{}", ctx.field("okay", "id")))
                .with_body(json!({"rating": 1}))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("ordering by rating", "GET", "/api/courses/list-courses")
                .with_param("ordering", "-rating")
                .assert_body(|body| {
                    assert_eq!(body["items"][0]["name"], "good");
                    assert_eq!(body["items"][0]["average_rating"], 5.0);
                    assert_eq!(body["items"][1]["name"], "okay");
                }),
        )
        .step(
            Action::new("featured", "GET", "/api/courses/featured").assert_body(|body| {
                let featured = body.as_array().unwrap();
                assert_eq!(featured.len(), 1);
                assert_eq!(featured[0]["name"], "good");
            }),
        )
        .step(
            Action::new("check", "GET", "")
                .with_auth("jane")
                .with_dyn_path(|ctx| format!("/api/ratings/check/{}", ctx.field("good", "id")))
                .assert_body(|body| assert_eq!(body["review"], "Great")),
        )
        .step(
            Action::new("list", "GET", "")
                .with_dyn_path(|ctx| format!("/api/ratings/list/{}", ctx.field("good", "id")))
                .assert_body(|body| {
                    assert_eq!(body.as_array().unwrap().len(), 1);
                    assert_eq!(body[0]["username"], "jane.doe");
                }),
        )
        .step(
            Action::new("delete", "DELETE", "")
                .with_auth("jane")
                .with_dyn_path(|ctx| format!("/api/ratings/delete/{}", ctx.field("okay_rating", "id")))
                .with_expect(StatusCode::NO_CONTENT),
        )
        .step(
            Action::new("check deleted", "GET", "")
                .with_auth("jane")
                .with_dyn_path(|ctx| format!("/api/ratings/check/{}", ctx.field("okay", "id")))
                .with_expect(StatusCode::NOT_FOUND),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn rating_unknown_course() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(register_student_action("jane.doe", STRONG_PASSWORD))
        .step(login_action("jane.doe", STRONG_PASSWORD).with_save_as("jane"))
        .step(
            Action::new("rate", "POST", "/api/ratings/rate/00000000-0000-0000-0000-000000000001")
                .with_auth("jane")
                .with_body(json!({"rating": 4}))
                .with_expect(StatusCode::NOT_FOUND),
        );

    flow.run(&mut server, db).await;
}

#[tokio::test]
async fn category_lifecycle() {
    let db = setup_test_db().await;
    let mut server = setup_server(&db).await;

    let flow = Flow::new()
        .step(login_admin_action().with_save_as("admin"))
        .step(
            Action::new("add", "POST", "/api/categories/add")
                .with_auth("admin")
                .with_body(json!({"name": "Design"}))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("duplicate", "POST", "/api/categories/add")
                .with_auth("admin")
                .with_body(json!({"name": "Design"}))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("rename", "PUT", "/api/categories/edit/Design")
                .with_auth("admin")
                .with_body(json!({"name": "UX Design"}))
                .assert_body(|body| assert_eq!(body["name"], "UX Design")),
        )
        .step(
            Action::new("list", "GET", "/api/categories/list").assert_body(|body| {
                assert_eq!(body["total"], 1);
                assert_eq!(body["items"][0]["name"], "UX Design");
            }),
        )
        .step(
            Action::new("delete", "DELETE", "/api/categories/delete/UX%20Design")
                .with_auth("admin")
                .with_expect(StatusCode::NO_CONTENT),
        )
        .step(
            Action::new("delete missing", "DELETE", "/api/categories/delete/Design")
                .with_auth("admin")
                .with_expect(StatusCode::NOT_FOUND),
        );

    flow.run(&mut server, db).await;
}
