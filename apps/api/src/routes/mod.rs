pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/template", get(handlers::handle_get_template))
        // Resume API
        .route("/api/v1/resumes/validate", post(handlers::handle_validate))
        .route("/api/v1/resumes/ats", post(handlers::handle_ats))
        .route("/api/v1/resumes/tailor", post(handlers::handle_tailor))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::layout::TemplateConfig;

    fn app() -> Router {
        let config = Config {
            port: 0,
            rust_log: "info".to_string(),
            template_path: None,
            ats_target_years: 5.0,
            rewrite_timeout: Duration::from_millis(500),
            cache_capacity: 16,
        };
        build_router(AppState::new(config, TemplateConfig::harvard()))
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn resume_body() -> Value {
        json!({
            "raw_text": "Jane Doe jane@example.com\nAcme Corp Data Engineer 2019-01 - Present\nCut costs by 40%",
            "structured": {
                "contact_info": { "full_name": "Jane Doe" },
                "experience": [{
                    "company": "Acme Corp",
                    "position": "Data Engineer",
                    "start_date": "2019-01",
                    "end_date": "Present",
                    "achievements": ["Cut costs by 40%"]
                }],
                "skills": { "Programming": ["Python", "SQL"] }
            }
        })
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_template_returns_harvard_default() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/template")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["template"]["font"], "Times New Roman");
        assert_eq!(body["page_budget_pt"], 648.0);
    }

    #[tokio::test]
    async fn test_validate_recovers_email_and_emits_all_sections() {
        let (status, body) = post_json("/api/v1/resumes/validate", resume_body()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resume"]["contact_info"]["email"], "jane@example.com");
        for key in [
            "contact_info",
            "links",
            "summary",
            "education",
            "experience",
            "projects",
            "certifications",
            "skills",
            "languages",
        ] {
            assert!(body["resume"].get(key).is_some(), "missing {key}");
        }
        assert_eq!(body["counts"]["experience"], 1);
    }

    #[tokio::test]
    async fn test_validate_rejects_data_loss() {
        let mut body = resume_body();
        body["raw_text"] = json!("Jane Doe\nGrew revenue by $3M in 2021");
        let (status, body) = post_json("/api/v1/resumes/validate", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "DATA_LOSS");
    }

    #[tokio::test]
    async fn test_ats_reports_matches_and_missing_keywords() {
        let mut body = resume_body();
        body["job_description"] = json!("Requirements: Python, SQL, Kubernetes");
        let (status, body) = post_json("/api/v1/resumes/ats", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keyword_matches"]["technical"], json!(["Python", "SQL"]));
        assert_eq!(body["missing_keywords"], json!(["Kubernetes"]));
        assert!(body["ats_score"].as_u64().unwrap() <= 100);
    }

    #[tokio::test]
    async fn test_tailor_falls_back_on_unknown_references() {
        let mut body = resume_body();
        body["job_description"] = json!("Python, SQL");
        body["proposal"] = json!({
            "rewritten_experience": [{ "company": "Globex", "bullets": ["Did things"] }],
            "ranked_projects": ["Nonexistent"],
            "unexpected_field": true
        });
        let (status, body) = post_json("/api/v1/resumes/tailor", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["resume"]["experience"][0]["achievements"],
            json!(["Cut costs by 40%"])
        );
        assert_eq!(body["merge_report"]["discarded"].as_array().unwrap().len(), 2);
        assert_eq!(body["layout"]["fits"], true);
        assert!(body["cache_key"].as_str().unwrap().len() == 64);
    }

    #[tokio::test]
    async fn test_tailor_requires_job_description() {
        let mut body = resume_body();
        body["job_description"] = json!("   ");
        let (status, body) = post_json("/api/v1/resumes/tailor", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
