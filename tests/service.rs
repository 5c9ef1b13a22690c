//! End-to-end tests over real listeners.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn serves_version_health_and_hello() {
    let app = common::spawn_app("1.2.3").await;
    let client = common::client();

    let res = client.get(app.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.text().await.unwrap(),
        r#"{"application":"app","version":"1.2.3"}"#
    );

    let res = client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), r#"{"alive":true}"#);

    let res = client.get(app.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), r#"{"hello":"world!"}"#);

    let res = client.get(app.url("/index.html")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().contains("<h1>app</h1>"));

    app.stop().await.unwrap();
}

#[tokio::test]
async fn unknown_path_is_404_and_logged_as_error() {
    let app = common::spawn_app("1.2.3").await;

    let res = common::client()
        .get(app.url("/nonexistent"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let records = app.logs.request_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["level"], "ERROR");
    assert_eq!(records[0]["message"], "request_error");
    assert_eq!(records[0]["uri"], "/nonexistent");
    assert_eq!(records[0]["status"], 404);

    app.stop().await.unwrap();
}

#[tokio::test]
async fn request_records_carry_connection_details() {
    let app = common::spawn_app("1.2.3").await;

    let res = common::client()
        .get(app.url("/hello?lang=en"))
        .header("user-agent", "integration-test")
        .send()
        .await
        .unwrap();
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_owned();

    let records = app.logs.request_records();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r["level"], "INFO");
    assert_eq!(r["message"], "request");
    assert_eq!(r["uri"], "/hello?lang=en");
    assert_eq!(r["status"], 200);
    assert_eq!(r["method"], "GET");
    assert_eq!(r["host"], app.primary.to_string().as_str());
    assert_eq!(r["remote_ip"], "127.0.0.1");
    assert_eq!(r["request_id"], request_id.as_str());
    assert_eq!(r["user_agent"], "integration-test");
    assert!(r["latency"].as_str().unwrap().ends_with('s'));

    app.stop().await.unwrap();
}

#[tokio::test]
async fn health_checks_stay_out_of_logs_and_metrics() {
    let app = common::spawn_app("1.2.3").await;
    let client = common::client();

    for _ in 0..5 {
        client.get(app.url("/health")).send().await.unwrap();
    }
    client.get(app.url("/")).send().await.unwrap();

    assert_eq!(app.logs.request_records().len(), 1);

    let res = client.get(app.metrics_url()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let text = res.text().await.unwrap();
    assert!(text.contains("app_requests_total"));
    assert!(text.contains("app_request_duration_seconds"));
    assert!(!text.contains(r#"url="/health""#));

    app.stop().await.unwrap();
}

#[tokio::test]
async fn metrics_listener_only_serves_metrics() {
    let app = common::spawn_app("1.2.3").await;

    let res = common::client()
        .get(format!("http://{}/health", app.metrics))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    app.stop().await.unwrap();
}
