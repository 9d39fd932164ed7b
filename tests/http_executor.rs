use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use petstore_probe::fixtures::Pet;
use petstore_probe::testing::assertion::BODY_NOT_PARSEABLE;
use petstore_probe::testing::{batch_verdict, check, run_concurrent_same};
use petstore_probe::{Executor, Expectation, FailureKind, HarnessConfig, HttpRemote, RequestSpec};

fn executor_for(base_url: String) -> Executor {
    let config = HarnessConfig {
        base_url,
        ..HarnessConfig::default()
    };
    Executor::new(Arc::new(
        HttpRemote::new(&config).expect("http remote should build"),
    ))
}

#[tokio::test]
async fn json_create_sends_body_and_content_type() {
    let server = MockServer::start_async().await;
    let created = server.mock(|when, then| {
        when.method(POST)
            .path("/v2/pet")
            .header("content-type", "application/json")
            .json_body_includes(json!({"id": 12345, "name": "Oreo"}).to_string());
        then.status(200)
            .header("content-type", "application/json")
            .json_body(serde_json::to_value(Pet::sample(12345)).unwrap());
    });

    let executor = executor_for(format!("{}/v2", server.base_url()));
    let spec = RequestSpec::post("/pet")
        .json(&Pet::sample(12345))
        .build()
        .expect("spec");
    let result = executor.execute(&spec).await;

    created.assert();
    assert_eq!(result.status_code, Some(200));
    assert!(check(&result, &Expectation::field_eq("name", "Oreo")).passed);
}

#[tokio::test]
async fn raw_body_without_content_type_gets_415() {
    let server = MockServer::start_async().await;
    let rejected = server.mock(|when, then| {
        when.method(POST).path("/pet").body("{name: 'Buddy'}");
        then.status(415);
    });

    let executor = executor_for(server.base_url());
    let spec = RequestSpec::post("/pet")
        .raw("{name: 'Buddy'}")
        .build()
        .expect("spec");
    let result = executor.execute(&spec).await;

    rejected.assert();
    assert_eq!(result.status_code, Some(415));
    assert!(result.body.is_none());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn malformed_json_keeps_status_and_flags_body() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/pet/7");
        then.status(200)
            .header("content-type", "application/json")
            .body("{\"id\": 7, ");
    });

    let executor = executor_for(server.base_url());
    let spec = RequestSpec::get("/pet/7").build().expect("spec");
    let result = executor.execute(&spec).await;

    assert_eq!(result.status_code, Some(200));
    assert!(result.body.is_none());
    assert_eq!(result.failure_kind(), Some(FailureKind::MalformedBody));
    assert!(check(&result, &Expectation::status(200)).passed);

    let verdict = check(&result, &Expectation::field_eq("id", 7));
    assert!(!verdict.passed);
    assert_eq!(verdict.reason.as_deref(), Some(BODY_NOT_PARSEABLE));
}

#[tokio::test]
async fn slow_response_is_a_timeout_without_status() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/pet/1");
        then.status(200).delay(Duration::from_millis(500));
    });

    let executor = executor_for(server.base_url());
    let spec = RequestSpec::get("/pet/1")
        .timeout(Duration::from_millis(50))
        .build()
        .expect("spec");
    let result = executor.execute(&spec).await;

    assert_eq!(result.status_code, None);
    assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
}

#[tokio::test]
async fn refused_connection_is_a_transport_failure() {
    let executor = executor_for("http://127.0.0.1:1".to_string());
    let spec = RequestSpec::get("/pet/1")
        .timeout(Duration::from_secs(2))
        .build()
        .expect("spec");
    let result = executor.execute(&spec).await;

    assert_eq!(result.status_code, None);
    assert_eq!(result.failure_kind(), Some(FailureKind::TransportFailure));
}

#[tokio::test]
async fn refused_connection_is_not_labelled_by_url_text() {
    let executor = executor_for("http://127.0.0.1:1/dns-tls-ssl".to_string());
    let spec = RequestSpec::get("/certificate")
        .timeout(Duration::from_secs(2))
        .build()
        .expect("spec");
    let result = executor.execute(&spec).await;

    let failure = result.error.expect("failure");
    assert_eq!(failure.kind, FailureKind::TransportFailure);
    assert!(failure.message.starts_with("connect: "), "{}", failure.message);
}

#[tokio::test]
async fn query_and_form_bodies_reach_the_server() {
    let server = MockServer::start_async().await;
    let find = server.mock(|when, then| {
        when.method(GET)
            .path("/pet/findByStatus")
            .query_param("status", "sold");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!([{"id": 72, "status": "sold"}]));
    });
    let form = server.mock(|when, then| {
        when.method(POST)
            .path("/pet/678")
            .header("content-type", "application/x-www-form-urlencoded")
            .body_includes("name=NewName");
        then.status(200);
    });

    let executor = executor_for(server.base_url());
    let found = executor
        .execute(
            &RequestSpec::get("/pet/findByStatus")
                .query("status", "sold")
                .build()
                .expect("spec"),
        )
        .await;
    let updated = executor
        .execute(
            &RequestSpec::post("/pet/{{petId}}")
                .var("petId", 678)
                .form([("name", "NewName"), ("status", "sold")])
                .build()
                .expect("spec"),
        )
        .await;

    find.assert();
    form.assert();
    assert!(check(&found, &Expectation::each_field_eq("status", "sold")).passed);
    assert_eq!(updated.status_code, Some(200));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_hits_the_server_once_per_dispatch() {
    let server = MockServer::start_async().await;
    let reads = server.mock(|when, then| {
        when.method(GET).path("/pet/findByStatus");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!([]));
    });

    let executor = executor_for(server.base_url());
    let spec = RequestSpec::get("/pet/findByStatus")
        .query("status", "available")
        .build()
        .expect("spec");
    let results = run_concurrent_same(&executor, spec, 100, 10).await;

    assert_eq!(results.len(), 100);
    assert!(batch_verdict("read", &results, &Expectation::status(200)).passed);
    assert_eq!(reads.calls(), 100);
}
