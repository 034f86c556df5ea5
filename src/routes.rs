use crate::{
    api::{self, admin, attendance, report},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

fn build_limiter(
    requests_per_min: u32,
) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} per minute"))?;
    Ok(Governor::new(&cfg))
}

/// Protected API behind per-IP rate limiting and bearer authentication.
pub fn configure(
    config: &Config,
) -> anyhow::Result<impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static> {
    let limiter = Arc::new(build_limiter(config.rate_protected_per_min)?);
    let prefix = config.api_prefix.clone();

    Ok(move |cfg: &mut web::ServiceConfig| {
        cfg.service(
            web::scope(&prefix)
                .wrap(from_fn(auth_middleware)) // authentication
                .wrap(limiter.clone()) // rate limiting
                .configure(api_routes),
        );
    })
}

pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(api::json_error))
        .app_data(web::QueryConfig::default().error_handler(api::query_error))
        .app_data(web::PathConfig::default().error_handler(api::path_error))
        .service(
        web::scope("/attendance")
            // /attendance
            .service(web::resource("").route(web::get().to(attendance::list_attendance)))
            .service(web::resource("/clock-in").route(web::post().to(attendance::clock_in)))
            .service(web::resource("/clock-out").route(web::post().to(attendance::clock_out)))
            // /attendance/{user_id}/{date}
            .service(
                web::resource("/{user_id}/{date}").route(web::get().to(attendance::get_record)),
            ),
    )
    .service(
        web::scope("/reports")
            .service(web::resource("/summary").route(web::get().to(report::summary)))
            .service(web::resource("/snapshot").route(web::get().to(report::snapshot))),
    )
    .service(
        web::scope("/admin")
            .service(web::resource("/users").route(web::post().to(admin::create_user)))
            .service(
                web::resource("/users/{id}/department")
                    .route(web::put().to(admin::assign_department)),
            )
            .service(
                web::resource("/users/{id}/deactivate")
                    .route(web::put().to(admin::deactivate_user)),
            )
            .service(web::resource("/departments").route(web::post().to(admin::create_department)))
            .service(
                web::resource("/departments/{id}/manager")
                    .route(web::put().to(admin::set_department_manager)),
            )
            .service(
                web::resource("/departments/{id}/deactivate")
                    .route(web::put().to(admin::deactivate_department)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenType, issue_token};
    use crate::model::UserId;
    use crate::testing::{Harness, TEST_SECRET, test_config};
    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};

    macro_rules! app {
        ($h:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::from($h.state.clone()))
                    .app_data(Data::new(test_config()))
                    .service(
                        web::scope("/api")
                            .wrap(from_fn(auth_middleware))
                            .configure(api_routes),
                    ),
            )
            .await
        };
    }

    fn bearer(user_id: UserId) -> (&'static str, String) {
        let token = issue_token(user_id, TokenType::Access, TEST_SECRET, 300);
        ("Authorization", format!("Bearer {token}"))
    }

    #[actix_web::test]
    async fn requests_without_a_valid_access_token_are_rejected() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::post().uri("/api/attendance/clock-in").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let refresh = issue_token(h.org.e1.id, TokenType::Refresh, TEST_SECRET, 300);
        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-in")
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-in")
            .insert_header(bearer(9_999))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn clock_in_twice_conflicts() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-in")
            .insert_header(bearer(h.org.e1.id))
            .set_json(json!({ "location": "HQ" }))
            .to_request();
        let record: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(record["status"], "open");
        assert_eq!(record["location"], "HQ");

        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-in")
            .insert_header(bearer(h.org.e1.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn other_department_supervisor_is_forbidden() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri(&format!("/api/attendance?user_id={}", h.org.e1.id))
            .insert_header(bearer(h.org.s2.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "message": "insufficient privilege" }));

        let req = test::TestRequest::get()
            .uri(&format!("/api/attendance?user_id={}", h.org.e1.id))
            .insert_header(bearer(h.org.s1.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn inverted_range_reports_the_field() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/api/reports/summary?from=2025-03-10&to=2025-03-01")
            .insert_header(bearer(h.org.admin.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0]["field"], "from");

        let req = test::TestRequest::get()
            .uri("/api/reports/snapshot?date=yesterday")
            .insert_header(bearer(h.org.admin.id))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["errors"][0]["field"], "date");
    }

    #[actix_web::test]
    async fn deactivation_takes_effect_on_the_next_request() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/users/{}/deactivate", h.org.e2.id))
            .insert_header(bearer(h.org.admin.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-in")
            .insert_header(bearer(h.org.e2.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn admin_creates_department() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/admin/departments")
            .insert_header(bearer(h.org.admin.id))
            .set_json(json!({ "name": "Logistics", "manager_id": h.org.s1.id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["name"], "Logistics");
        assert_eq!(body["active"], true);

        let req = test::TestRequest::post()
            .uri("/api/admin/departments")
            .insert_header(bearer(h.org.e1.id))
            .set_json(json!({ "name": "Shadow IT", "manager_id": null }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn malformed_clock_in_body_is_rejected_without_a_record() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-in")
            .insert_header(bearer(h.org.e1.id))
            .set_json(json!({ "location": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "validation failed");
        assert_eq!(body["errors"][0]["field"], "body");
        assert_eq!(h.org.records.len(), 0);

        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-in")
            .insert_header(bearer(h.org.e1.id))
            .to_request();
        let record: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(record["location"], Value::Null);
        assert_eq!(h.org.records.len(), 1);
    }

    #[actix_web::test]
    async fn extractor_failures_use_the_json_error_body() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::get()
            .uri("/api/attendance?user_id=abc")
            .insert_header(bearer(h.org.admin.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0]["field"], "user_id");

        let req = test::TestRequest::get()
            .uri("/api/reports/summary?department_id=-1")
            .insert_header(bearer(h.org.admin.id))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["errors"][0]["field"], "department_id");

        let req = test::TestRequest::post()
            .uri("/api/admin/departments")
            .insert_header(bearer(h.org.admin.id))
            .set_json(json!({ "name": 5 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "validation failed");
        assert_eq!(body["errors"][0]["field"], "body");
    }

    #[actix_web::test]
    async fn clock_out_without_clock_in_names_the_missing_record() {
        let h = Harness::new().await;
        let app = app!(h);

        let req = test::TestRequest::post()
            .uri("/api/attendance/clock-out")
            .insert_header(bearer(h.org.e1.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "message": "no open attendance record for today" }));
    }
}
