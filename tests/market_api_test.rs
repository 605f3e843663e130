/// HTTP API tests against a live server
///
/// Each test boots the router on an ephemeral port with an in-memory store and
/// talks to it over real HTTP.

use serde_json::{json, Value};
use whisper_prediction_market::{router, AppState};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

async fn spawn_server() -> String {
    let app = router(AppState::in_memory());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
    format!("http://{}", addr)
}

fn current_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn market_payload(visibility: &str) -> Value {
    json!({
        "question": "Will ETH close above 5k this month?",
        "description": "Resolves YES on a monthly close above 5000 USD",
        "creator": "0xcreator",
        "expiresAt": current_millis() + 1_000_000,
        "category": "Crypto",
        "tags": ["eth", "price"],
        "visibility": visibility,
        "accessList": ["alice"]
    })
}

async fn create_market(client: &reqwest::Client, base_url: &str, payload: Value) -> Value {
    let response = client
        .post(format!("{}/markets", base_url))
        .json(&payload)
        .send()
        .await
        .expect("Failed to create market");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["market"].clone()
}

async fn place_bet(
    client: &reqwest::Client,
    base_url: &str,
    market_id: &str,
    bettor: &str,
    outcome: bool,
    amount: &str,
) -> (u16, Value) {
    let response = client
        .post(format!("{}/bets", base_url))
        .json(&json!({
            "marketId": market_id,
            "bettor": bettor,
            "outcome": outcome,
            "amount": amount
        }))
        .send()
        .await
        .expect("Failed to place bet");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Failed to parse response");
    (status, body)
}

// ============================================================================
// MARKET TESTS
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let base_url = spawn_server().await;
    let response = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Online"));
}

#[tokio::test]
async fn test_create_and_fetch_market() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let market = create_market(&client, &base_url, market_payload("public")).await;
    assert_eq!(market["totalYesAmount"], "0");
    assert_eq!(market["totalNoAmount"], "0");
    assert_eq!(market["resolved"], false);
    assert!(market.get("accessList").is_none());

    let id = market["id"].as_str().unwrap();
    let response = client.get(format!("{}/markets/{}", base_url, id)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["market"]["question"], "Will ETH close above 5k this month?");
    assert_eq!(body["bets"], json!([]));
    assert_eq!(body["odds"], json!({ "yesPercent": 50, "noPercent": 50 }));
}

#[tokio::test]
async fn test_create_market_missing_fields() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/markets", base_url))
        .json(&json!({ "question": "Q", "description": "D" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Missing required field"));

    let response = client
        .post(format!("{}/markets", base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_list_markets_with_filters() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    create_market(&client, &base_url, market_payload("public")).await;
    let mut sports = market_payload("whisper");
    sports["category"] = json!("Sports");
    sports["tags"] = json!(["nba"]);
    create_market(&client, &base_url, sports).await;

    let all: Value = client
        .get(format!("{}/markets", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all["markets"].as_array().unwrap().len(), 2);

    let filtered: Value = client
        .get(format!("{}/markets?category=Sports&visibility=whisper&tag=nba&resolved=false", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let markets = filtered["markets"].as_array().unwrap();
    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0]["category"], "Sports");

    let none: Value = client
        .get(format!("{}/markets?resolved=true", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(none["markets"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_query_string_is_json_400() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    for query in ["markets?resolved=yes", "markets?visibility=Public", "markets?resolved="] {
        let response = client.get(format!("{}/{}", base_url, query)).send().await.unwrap();
        assert_eq!(response.status(), 400, "{}", query);
        let body: Value = response.json().await.expect("error body should be JSON");
        assert!(body["error"].as_str().unwrap().contains("Invalid query string"), "{}", query);
    }

    let response = client.get(format!("{}/markets?resolved=false", base_url)).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_missing_market_is_404() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/markets/market_nope", base_url)).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = client
        .put(format!("{}/markets/market_nope", base_url))
        .json(&json!({ "resolved": true, "outcome": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = client.delete(format!("{}/markets/market_nope", base_url)).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let (status, body) = place_bet(&client, &base_url, "market_nope", "alice", true, "1").await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

// ============================================================================
// BETTING TESTS
// ============================================================================

#[tokio::test]
async fn test_betting_scenario() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let market = create_market(&client, &base_url, market_payload("public")).await;
    let id = market["id"].as_str().unwrap().to_string();

    let (status, body) = place_bet(&client, &base_url, &id, "alice", true, "100").await;
    assert_eq!(status, 201);
    assert_eq!(body["bet"]["marketId"], id.as_str());
    assert_eq!(body["bet"]["amount"], "100");
    assert_eq!(body["bet"]["outcome"], true);

    let (status, _) = place_bet(&client, &base_url, &id, "bob", false, "50").await;
    assert_eq!(status, 201);

    let body: Value = client
        .get(format!("{}/markets/{}", base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["market"]["totalYesAmount"], "100");
    assert_eq!(body["market"]["totalNoAmount"], "50");
    assert_eq!(body["bets"].as_array().unwrap().len(), 2);
    assert_eq!(body["odds"], json!({ "yesPercent": 66, "noPercent": 34 }));

    let response = client
        .put(format!("{}/markets/{}", base_url, id))
        .json(&json!({ "resolved": true, "outcome": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["market"]["resolved"], true);
    assert_eq!(body["market"]["outcome"], true);

    let (status, body) = place_bet(&client, &base_url, &id, "carol", true, "10").await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("already resolved"));

    let response = client
        .put(format!("{}/markets/{}", base_url, id))
        .json(&json!({ "resolved": true, "outcome": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let bets: Value = client
        .get(format!("{}/bets?bettor=alice", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bets["bets"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bet_validation() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let market = create_market(&client, &base_url, market_payload("public")).await;
    let id = market["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/bets", base_url))
        .json(&json!({ "marketId": id, "bettor": "alice", "amount": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let (status, body) = place_bet(&client, &base_url, id, "   ", true, "10").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) = place_bet(&client, &base_url, "market_nope", "alice", true, "").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = place_bet(&client, &base_url, id, "alice", true, "0").await;
    assert_eq!(status, 400);
    let (status, _) = place_bet(&client, &base_url, id, "alice", true, "ten").await;
    assert_eq!(status, 400);

    let response = client
        .post(format!("{}/bets", base_url))
        .json(&json!({ "marketId": id, "bettor": "alice", "outcome": false, "amount": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_expired_market_rejects_bets() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let mut payload = market_payload("public");
    payload["expiresAt"] = json!(current_millis() - 1_000);
    let market = create_market(&client, &base_url, payload).await;

    let (status, body) = place_bet(&client, &base_url, market["id"].as_str().unwrap(), "alice", true, "1").await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn test_private_market_access() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let market = create_market(&client, &base_url, market_payload("private")).await;
    assert_eq!(market["accessList"], json!(["alice"]));
    let id = market["id"].as_str().unwrap();

    let (status, _) = place_bet(&client, &base_url, id, "bob", true, "5").await;
    assert_eq!(status, 403);
    let (status, _) = place_bet(&client, &base_url, id, "alice", true, "5").await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn test_delete_market_purges_bets() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let market = create_market(&client, &base_url, market_payload("public")).await;
    let id = market["id"].as_str().unwrap();
    place_bet(&client, &base_url, id, "alice", true, "5").await;

    let response = client.delete(format!("{}/markets/{}", base_url, id)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let bets: Value = client
        .get(format!("{}/bets?marketId={}", base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(bets["bets"].as_array().unwrap().is_empty());

    let markets: Value = client
        .get(format!("{}/markets", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(markets["markets"].as_array().unwrap().is_empty());
}

// ============================================================================
// SETTLEMENT TESTS
// ============================================================================

#[tokio::test]
async fn test_build_contract_transactions() {
    let base_url = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/transactions", base_url))
        .json(&json!({ "action": "bet", "marketIndex": 4, "outcome": true, "amount": "0.01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["chainId"], 8453);
    assert_eq!(body["contracts"][0]["functionName"], "bet");
    assert_eq!(body["contracts"][0]["value"], "10000000000000000");

    let market = create_market(&client, &base_url, market_payload("private")).await;
    let response = client
        .post(format!("{}/transactions", base_url))
        .json(&json!({ "action": "createMarket", "marketId": market["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["contracts"][0]["functionName"], "createMarket");
    assert_eq!(body["contracts"][0]["args"][4], 1);
    assert_eq!(body["contracts"][0]["args"][5], json!(["alice"]));

    let response = client
        .post(format!("{}/transactions", base_url))
        .json(&json!({ "action": "bet", "marketIndex": 4, "outcome": true, "amount": "0" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
