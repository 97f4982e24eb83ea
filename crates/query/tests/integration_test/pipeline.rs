//! Single-query behaviour: success, classification of each failure class,
//! idempotence.

use pancake_core::Secrets;
use pancake_query::*;
use serde_json::json;

use crate::helpers::{row, FakeApi};

fn stars_api() -> FakeApi {
    FakeApi::new().json(
        "https://api.test/repos",
        json!({
            "total": 3,
            "items": [
                {"name": "alpha", "stars": 10},
                {"name": "beta", "stars": "20"},
                {"name": "gamma", "stars": 30}
            ]
        }),
    )
}

fn repos(path: &str, aggregation: &str) -> Query {
    Query::new(
        &row(
            json!({"request": {"method": "GET", "url": "https://api.test/repos"}}),
            path,
            aggregation,
        ),
        &Secrets::new(),
    )
}

#[tokio::test]
async fn aggregations_over_live_payload() {
    let api = stars_api();
    let cases = [
        ("$.items[*]", "COUNT", "3"),
        ("$.items[*].stars", "SUM", "60"),
        ("$.items[*].stars", "AVG", "20"),
        ("$.items[*].stars", "MAX", "30"),
        ("$.items[*].stars", "MIN", "10"),
        ("$.items[*].stars", "MED", "20"),
        ("$.items[*].stars", "VAR", "100"),
        ("$.items[*].name", "", r#"["alpha","beta","gamma"]"#),
    ];

    for (path, op, expected) in cases {
        let result = repos(path, op).execute(&api).await;
        assert_eq!(result.error_code, SUCCESS_CODE, "{op} {path}: {}", result.error_message);
        assert_eq!(result.result, expected, "{op} {path}");
        assert_eq!(result.error_message, "");
        assert_eq!(result.size, expected.len());
    }
}

#[tokio::test]
async fn stdev_over_payload() {
    let result = repos("$.items[*].stars", "STDEV").execute(&stars_api()).await;
    let value: f64 = result.result.parse().unwrap();
    assert!((value - 10.0).abs() < 1e-9, "got {value}");
}

#[tokio::test]
async fn whole_document_without_query() {
    let result = repos("", "").execute(&stars_api()).await;
    let parsed: serde_json::Value = serde_json::from_str(&result.result).unwrap();
    assert_eq!(parsed["total"], 3);
    assert_eq!(result.length, -1);
}

#[tokio::test]
async fn default_headers_are_sent() {
    let api = stars_api();
    repos("", "").execute(&api).await;

    let request = &api.requests()[0];
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(request.header("accept-encoding"), Some("gzip"));
    assert_eq!(request.header("user-agent"), Some(USER_AGENT));
}

#[tokio::test]
async fn post_sends_data_and_parameters() {
    let api = FakeApi::new().json("https://api.test/search", json!({"hits": [1, 2]}));
    let query = Query::new(
        &row(
            json!({
                "request": {
                    "method": "post",
                    "url": "https://api.test/search",
                    "headers": {"X-Api-Key": "{{ secrets.search_key }}"},
                    "data": {"q": "rust"},
                    "parameters": {"page": 1}
                }
            }),
            "$.hits[*]",
            "COUNT",
        ),
        &Secrets::from([("search_key".to_string(), "k-42".to_string())]),
    );

    let result = query.execute(&api).await;
    assert_eq!(result.result, "2");

    let request = &api.requests()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.header("x-api-key"), Some("k-42"));
    assert_eq!(request.body, Some(json!({"q": "rust"})));
    assert_eq!(request.query, vec![("page".to_string(), "1".to_string())]);
}

#[tokio::test]
async fn malformed_rows_never_hit_the_network() {
    let api = stars_api();
    let rows = [
        vec!["{".to_string(), String::new(), String::new()],
        row(json!({"request": {"url": "https://api.test/repos"}}), "", ""),
        row(json!({"request": {"method": "GET"}}), "", ""),
        row(json!({"response": {}}), "", ""),
        vec![json!({"request": {"method": "GET", "url": "https://api.test/repos"}}).to_string()],
    ];

    for fields in &rows {
        let query = Query::new(fields, &Secrets::new());
        let result = query.execute(&api).await;
        assert_eq!(result.error_code, "2", "row {fields:?}");
        assert_eq!(result.result, "");
        assert_eq!(result.size, 0);
        assert_eq!(result.length, -1);
    }
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn unsupported_method() {
    let api = stars_api();
    let query = Query::new(
        &row(json!({"request": {"method": "PATCH", "url": "https://api.test/repos"}}), "", ""),
        &Secrets::new(),
    );

    let result = query.execute(&api).await;
    assert_eq!(result.error_code, "3");
    assert!(result.error_message.contains("PATCH"));
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn http_404() {
    let api = FakeApi::new().respond("https://api.test/nope", 404, "Not Found", "{}");
    let query = Query::new(
        &row(json!({"request": {"method": "GET", "url": "https://api.test/nope"}}), "", ""),
        &Secrets::new(),
    );

    let result = query.execute(&api).await;
    assert_eq!(result.error_code, "404");
    assert_eq!(result.error_message, "Not Found");
    assert_eq!(result.result, "");
    assert_eq!(result.length, -1);
    assert_eq!(result.to_record()[2], "-1");
}

#[tokio::test]
async fn non_json_body() {
    let api = FakeApi::new().respond("https://api.test/html", 200, "OK", "<!doctype html>");
    let query = Query::new(
        &row(json!({"request": {"method": "GET", "url": "https://api.test/html"}}), "", ""),
        &Secrets::new(),
    );
    assert_eq!(query.execute(&api).await.error_code, "2");
}

#[tokio::test]
async fn network_failure_keeps_underlying_message() {
    let query = Query::new(
        &row(json!({"request": {"method": "GET", "url": "https://down.test/"}}), "", ""),
        &Secrets::new(),
    );
    let result = query.execute(&FakeApi::new()).await;
    assert_eq!(result.error_code, "1");
    assert!(result.error_message.starts_with("ConnectionError: dns error"));
}

#[tokio::test]
async fn aggregation_edge_cases() {
    let api = FakeApi::new().json(
        "https://api.test/edge",
        json!({"nums": [1, 2, 3], "strs": ["1", "2", "3"], "one": [5], "obj": {"a": 1}, "words": ["a"]}),
    );
    let run = |path: &str, op: &str| {
        Query::new(
            &row(json!({"request": {"method": "GET", "url": "https://api.test/edge"}}), path, op),
            &Secrets::new(),
        )
    };

    assert_eq!(run("$.nums[*]", "COUNT").execute(&api).await.result, "3");
    assert_eq!(run("$.strs[*]", "SUM").execute(&api).await.result, "6");
    assert_eq!(run("$.one[*]", "STDEV").execute(&api).await.error_code, "7");
    assert_eq!(run("$.one[*]", "VAR").execute(&api).await.error_code, "7");
    assert_eq!(run("$.words[*]", "SUM").execute(&api).await.error_code, "6");
    assert_eq!(run("", "COUNT").execute(&api).await.error_code, "6");
    assert_eq!(run("$.nums[*]", "TOTAL").execute(&api).await.error_code, "5");
    assert_eq!(run("$.nums[", "COUNT").execute(&api).await.error_code, "4");
}

#[tokio::test]
async fn same_query_twice_gives_same_row() {
    let api = stars_api();
    let query = repos("$.items[*].stars", "AVG");

    let first = query.execute(&api).await;
    let second = query.execute(&api).await;

    assert_eq!(first.result, second.result);
    assert_eq!(first.size, second.size);
    assert_eq!(first.length, second.length);
    assert_eq!(first.error_code, second.error_code);
    assert_eq!(first.error_message, second.error_message);
    assert!(second.query_start >= first.query_end);
}

#[tokio::test]
async fn refused_connection_through_reqwest() {
    let transport = ReqwestTransport::new(std::time::Duration::from_secs(5)).unwrap();
    let query = Query::new(
        &row(json!({"request": {"method": "GET", "url": "http://127.0.0.1:1/x"}}), "", "COUNT"),
        &Secrets::new(),
    );

    let result = query.execute(&transport).await;
    assert_eq!(result.error_code, "1");
    assert!(result.error_message.starts_with("ConnectionError: "), "{}", result.error_message);
    assert_eq!(result.result, "");
}

#[tokio::test]
async fn secret_with_quotes_and_backslashes() {
    let api = stars_api();
    let query = Query::new(
        &row(
            json!({
                "request": {
                    "method": "GET",
                    "url": "https://api.test/repos",
                    "headers": {"Authorization": "Basic {{ secrets.pw }}"}
                }
            }),
            "$.items[*]",
            "COUNT",
        ),
        &Secrets::from([("pw".to_string(), r#"p"ss\w0rd"#.to_string())]),
    );

    let result = query.execute(&api).await;
    assert_eq!(result.error_code, "0", "{}", result.error_message);
    assert_eq!(api.requests()[0].header("authorization"), Some(r#"Basic p"ss\w0rd"#));
}

#[tokio::test]
async fn invalid_header_name_is_invalid_query() {
    let api = stars_api();
    let query = Query::new(
        &row(
            json!({"request": {"method": "GET", "url": "https://api.test/repos", "headers": {"Bad Header": "x"}}}),
            "",
            "",
        ),
        &Secrets::new(),
    );

    assert_eq!(query.execute(&api).await.error_code, "2");
    assert!(api.requests().is_empty());
}
