//! End-to-end tests for the search pipeline against a mocked service.
//!
//! Each test drives the full submit → correlate → fetch → shape chain with
//! wiremock standing in for the upstream: the submission endpoint answers
//! with an event-stream body, the view endpoint with a DataTables-style hit
//! table.

use serde_json::{Value, json};
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use swsearch::client::{SearchConfig, SearchError, SearchOptions, SmallWorldClient};

fn sse_body(hlid: u64) -> String {
    format!(
        "data: {{\"hlid\": {hlid}, \"status\": \"RUNNING\"}}\n\
         data: {{\"hlid\": {hlid}, \"status\": \"COMPLETE\"}}\n"
    )
}

fn hit_row(description: &str, dist: u64) -> Value {
    json!([
        { "hitSmiles": description, "qrySmiles": "CCO", "arm": 0 },
        dist, 0.52, 0.41, 2, 3, 0, 1, 0, 0, 0, 0, 0, 1, 1, 0, 2
    ])
}

fn view_body(rows: Vec<Value>) -> Value {
    json!({
        "recordsTotal": rows.len(),
        "recordsFiltered": rows.len(),
        "data": rows,
    })
}

async fn mount_submit(server: &MockServer, smi: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/search/submit"))
        .and(query_param("smi", smi))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

async fn mount_view(server: &MockServer, hlid: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/search/view"))
        .and(query_param("hlid", hlid))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> SmallWorldClient {
    SmallWorldClient::new(&server.uri(), SearchConfig::default()).expect("client should build")
}

#[tokio::test]
async fn single_search_shapes_the_hit_table() {
    let server = MockServer::start().await;
    mount_submit(&server, "CCO", sse_body(4321)).await;
    mount_view(
        &server,
        "4321",
        view_body(vec![
            hit_row("CCO ethanol-analog-42", 1),
            hit_row("CCN amine-7", 2),
            hit_row("CCCO Z100-77", 3),
        ]),
    )
    .await;

    let client = client_for(&server);
    let rows = client.get_molecules("CCO").await.expect("search succeeds");

    assert_eq!(rows.len(), 3, "expected every hit row to survive shaping");
    assert_eq!(rows[0].smiles, "CCO");
    assert_eq!(rows[0].name, "ethanol-analog-42");
    assert_eq!(rows[1].smiles, "CCN");
    assert_eq!(rows[1].name, "amine-7");
    assert_eq!(rows[0].metrics["dist"], json!(1));
    assert_eq!(rows[2].metrics["dist"], json!(3));
    assert_eq!(rows[0].alignment.qry_smiles.as_deref(), Some("CCO"));
}

#[tokio::test]
async fn batch_excludes_inputs_with_zero_records() {
    let server = MockServer::start().await;
    mount_submit(&server, "CCO", sse_body(1)).await;
    mount_view(
        &server,
        "1",
        view_body(vec![
            hit_row("CCO a-1", 1),
            hit_row("CCO a-2", 2),
            hit_row("CCO a-3", 3),
        ]),
    )
    .await;

    // Second input correlates fine but its hit list reports zero records.
    mount_submit(&server, "CCN", sse_body(2)).await;
    mount_view(&server, "2", json!({ "recordsTotal": 0, "data": [] })).await;

    let client = client_for(&server);
    let rows = client
        .search_many(
            vec!["CCO".to_string(), "CCN".to_string()],
            SearchOptions::default(),
        )
        .await
        .expect("batch succeeds despite one empty input");

    assert_eq!(rows.len(), 3, "empty input must be dropped, not fatal");
    assert!(rows.iter().all(|row| row.smiles == "CCO"));
}

#[tokio::test]
async fn empty_stream_means_no_results() {
    let server = MockServer::start().await;
    mount_submit(&server, "CCO", String::new()).await;

    let client = client_for(&server);
    let rows = client.get_molecules("CCO").await.expect("empty is not an error");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn garbled_first_frame_means_no_results() {
    let server = MockServer::start().await;
    mount_submit(&server, "CCO", "data: {\"hlid\": tru\n".to_string()).await;

    let client = client_for(&server);
    let rows = client
        .get_molecules("CCO")
        .await
        .expect("decode failure downgrades to empty");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn duplicate_ids_are_a_protocol_violation() {
    let server = MockServer::start().await;
    mount_submit(
        &server,
        "CCO",
        "data: {\"hlid\": 1}\ndata: {\"hlid\": 2}\n".to_string(),
    )
    .await;

    let client = client_for(&server);
    let err = client
        .get_molecules("CCO")
        .await
        .expect_err("two distinct ids must fail loudly");
    assert!(matches!(err, SearchError::ProtocolViolation { .. }));

    // The violation is fatal for the whole batch, not silently dropped.
    let err = client
        .search_many(vec!["CCO".to_string()], SearchOptions::default())
        .await
        .expect_err("batch must propagate the violation");
    assert!(matches!(err, SearchError::ProtocolViolation { .. }));
}

#[tokio::test]
async fn empty_batch_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows = client
        .search_many(Vec::new(), SearchOptions::default())
        .await
        .expect("empty batch is a no-op");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn batch_of_empty_results_is_empty_not_fatal() {
    let server = MockServer::start().await;
    mount_submit(&server, "CCO", String::new()).await;
    mount_submit(&server, "CCN", String::new()).await;

    let client = client_for(&server);
    let rows = client
        .search_many(
            vec!["CCO".to_string(), "CCN".to_string()],
            SearchOptions::default(),
        )
        .await
        .expect("all-empty batch succeeds");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let server = MockServer::start().await;

    // First submission attempt crashes the upstream; the retry succeeds.
    Mock::given(method("GET"))
        .and(path("/search/submit"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/submit"))
        .and(query_param("smi", "CCO"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(9), "text/event-stream"),
        )
        .with_priority(5)
        .mount(&server)
        .await;
    mount_view(&server, "9", view_body(vec![hit_row("CCO kept", 1)])).await;

    let client = client_for(&server);
    let rows = client.get_molecules("CCO").await.expect("retry should recover");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "kept");
}

#[tokio::test]
async fn missing_data_field_is_recoverable() {
    let server = MockServer::start().await;
    mount_submit(&server, "CCO", sse_body(3)).await;
    mount_view(&server, "3", json!({ "recordsTotal": 5 })).await;

    let client = client_for(&server);
    let rows = client
        .get_molecules("CCO")
        .await
        .expect("missing data collapses to empty");
    assert!(rows.is_empty());
}
