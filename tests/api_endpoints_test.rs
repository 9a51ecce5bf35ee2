use axum::http::StatusCode;
use fourfunds::api;
use fourfunds::config::Config;
use fourfunds::db::init_db;
use fourfunds::{Decimal, Repository, Tier};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        default_tier: Tier::Standard,
        max_simulation_deposits: 5_000,
        default_active_ceiling: 100,
        default_healthy_exit_rate: Decimal::from_int(55),
    };

    TestApp {
        app: api::create_router(api::AppState::new(repo, config)),
        _temp: temp_dir,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, body)
}

async fn send_json(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, body) = send(app, method, uri, body).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_create_pool_and_deposit() {
    let t = setup_test_app().await;

    let (status, pool) =
        send_json(&t.app, "POST", "/v1/pools", Some(json!({"name": "main"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pool["name"], "main");
    assert_eq!(pool["entryAmount"], "10");
    assert_eq!(pool["exitAmount"], "12");
    assert_eq!(pool["activePositions"], 0);
    assert_eq!(pool["configFingerprint"], Tier::Standard.config().fingerprint());

    let (status, first) = send_json(
        &t.app,
        "POST",
        "/v1/pools/main/deposits",
        Some(json!({"owner": "0xAAA"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["seq"], 1);
    assert_eq!(first["position"], 1);
    assert_eq!(first["split"]["turn"], "3.4825");
    assert_eq!(first["split"]["global"], "5.4725");
    assert_eq!(first["split"]["operational"], "0.995");
    assert_eq!(first["turnPayout"]["kind"], "foldedIntoPool");
    assert!(first.get("dispersal").is_none());

    let (status, second) = send_json(
        &t.app,
        "POST",
        "/v1/pools/main/deposits",
        Some(json!({"owner": "0xbbb", "amount": "10.000"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["turnPayout"]["kind"], "paid");
    assert_eq!(second["turnPayout"]["position"], 1);
    assert_eq!(second["dispersal"]["recipients"], 1);
    assert_eq!(second["exits"][0]["position"], 1);
    assert_eq!(second["exits"][0]["owner"], "0xaaa");
    assert_eq!(second["exits"][0]["balance"], "17.91");
    assert_eq!(second["exits"][0]["payout"], "12");
    assert_eq!(second["exits"][0]["excess"], "5.91");

    let (status, summary) = send_json(&t.app, "GET", "/v1/pools/main", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["depositCount"], 2);
    assert_eq!(summary["completedCycles"], 1);
    assert_eq!(summary["queueHead"], 2);
    assert_eq!(summary["globalPool"], "5.91");
    assert_eq!(summary["totalWithdrawn"], "12");
}

#[tokio::test]
async fn test_queue_and_position_views() {
    let t = setup_test_app().await;
    send_json(&t.app, "POST", "/v1/pools", Some(json!({"name": "q", "tier": "standard"}))).await;
    for owner in ["0x1", "0x2", "0x3", "0x4"] {
        let (status, _) = send_json(
            &t.app,
            "POST",
            "/v1/pools/q/deposits",
            Some(json!({"owner": owner})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, queue) = send_json(&t.app, "GET", "/v1/pools/q/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["length"], 2);
    assert_eq!(queue["positions"][0]["id"], 3);
    assert_eq!(queue["positions"][0]["balance"], "11.82");
    assert_eq!(queue["positions"][1]["id"], 4);
    assert_eq!(queue["positions"][1]["balance"], "0");

    let (status, exited) = send_json(&t.app, "GET", "/v1/pools/q/positions/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exited["hasExited"], true);
    assert_eq!(exited["isActive"], false);
    assert_eq!(exited["exitedAt"], 2);

    let (status, _) = send_json(&t.app, "GET", "/v1/pools/q/positions/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pool_errors() {
    let t = setup_test_app().await;

    let (status, _) = send_json(&t.app, "GET", "/v1/pools/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send_json(&t.app, "POST", "/v1/pools", Some(json!({"name": "dup", "tier": "micro"}))).await;
    let (status, body) =
        send_json(&t.app, "POST", "/v1/pools", Some(json!({"name": "dup"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, _) =
        send_json(&t.app, "POST", "/v1/pools", Some(json!({"name": "x", "tier": "gold"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad = serde_json::to_value(Tier::Standard.config()).unwrap();
    bad["turnPercent"] = json!(40);
    let (status, body) =
        send_json(&t.app, "POST", "/v1/pools", Some(json!({"name": "bad", "config": bad}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("must equal 100"));

    let mut huge = serde_json::to_value(Tier::Standard.config()).unwrap();
    huge["entryAmount"] = json!(2e27);
    let (status, body) =
        send_json(&t.app, "POST", "/v1/pools", Some(json!({"name": "huge", "config": huge}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("must be below"));

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/pools/dup/deposits",
        Some(json!({"owner": "0x1", "amount": "2"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/pools/dup/deposits",
        Some(json!({"owner": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = send_json(&t.app, "GET", "/v1/pools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pools"], json!(["dup"]));
}

#[tokio::test]
async fn test_simulation_lifecycle() {
    let t = setup_test_app().await;

    let (status, run) = send_json(
        &t.app,
        "POST",
        "/v1/simulations",
        Some(json!({"depositCount": 8, "checkpointInterval": 4, "verifyEvery": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let run_id = run["runId"].as_str().unwrap().to_string();
    assert_eq!(run["depositCount"], 8);
    assert_eq!(run["completedCycles"], 5);
    assert_eq!(run["activePositions"], 3);
    assert_eq!(run["exitRate"], "62.5");
    assert_eq!(run["netFlowRatio"], "25");
    assert_eq!(run["checkpointCount"], 2);
    assert_eq!(run["verdict"]["status"], "stable");

    let (status, stored) =
        send_json(&t.app, "GET", &format!("/v1/simulations/{}", run_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["runId"], run_id.as_str());
    assert_eq!(stored["exitRate"], "62.5");
    assert_eq!(stored["createdAt"], run["createdAt"]);

    let (status, csv) = send(
        &t.app,
        "GET",
        &format!("/v1/simulations/{}/checkpoints.csv", run_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("deposit_index,active_positions"));
    assert!(lines[2].starts_with("8,3,5,62.5,25,"));

    let fingerprint = Tier::Standard.config().fingerprint();
    let (status, list) = send_json(
        &t.app,
        "GET",
        &format!("/v1/simulations?fingerprint={}", fingerprint),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["runs"][0]["runId"], run_id.as_str());
}

#[tokio::test]
async fn test_simulation_thresholds_and_limits() {
    let t = setup_test_app().await;

    let (status, run) = send_json(
        &t.app,
        "POST",
        "/v1/simulations",
        Some(json!({"tier": "micro", "depositCount": 1000, "activeCeiling": 10, "healthyExitRate": 70})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(run["activeCeiling"], 10);
    assert_eq!(run["healthyExitRate"], "70");
    assert_eq!(run["verdict"]["status"], "unstable");
    assert_eq!(run["verdict"]["reasons"].as_array().unwrap().len(), 2);

    let (status, body) = send_json(
        &t.app,
        "POST",
        "/v1/simulations",
        Some(json!({"depositCount": 5001})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceeds the limit"));

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/v1/simulations",
        Some(json!({"depositCount": 10, "checkpointInterval": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&t.app, "GET", "/v1/simulations/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&t.app, "GET", "/v1/simulations/unknown/checkpoints.csv", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
