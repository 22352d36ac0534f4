#[cfg(test)]
mod tests {
    use crate::app_state::AppState;
    use crate::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use cita_config::{AppConfig, DatabaseConfig};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn starts_without_database_or_calendar() {
        let state = AppState::new(Arc::new(AppConfig::default())).await.unwrap();
        let app = build_router(&state);

        let response = app
            .oneshot(Request::builder().uri("/api/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn booking_routes_are_nested_under_api() {
        let config = AppConfig {
            database: Some(DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            }),
            ..Default::default()
        };
        let state = AppState::new(Arc::new(config)).await.unwrap();
        let app = build_router(&state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/availability?date=2030-01-07")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["days"][0]["slots"].as_array().unwrap().len(), 8);

        let response = app
            .oneshot(Request::builder().uri("/availability").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_schedule_fails_startup() {
        let mut config = AppConfig::default();
        config.schedule.work_start_time = "18:00".to_string();
        assert!(AppState::new(Arc::new(config)).await.is_err());
    }
}
