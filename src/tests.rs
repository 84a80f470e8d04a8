//! Integration tests for the clan registry service.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::audit::Modlog;
use crate::auth::Privileges;
use crate::channels::RoomDirectory;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::registry::ClanRegistry;
use crate::{create_router, AppState};

const PSK: &str = "test-api-key";

async fn build_state(temp_dir: &TempDir, psk: Option<String>) -> AppState {
    let db_path = temp_dir.path().join("test.sqlite");

    let pool = init_database(&db_path).await.expect("Failed to init DB");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        api_psk: psk,
        db_path,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        admins: vec!["Admin".to_string()],
        reserved_rooms: vec!["lobby".to_string()],
    };

    let rooms = Arc::new(RoomDirectory::with_reserved(config.reserved_rooms.clone()));
    let registry = Arc::new(ClanRegistry::new(
        repo.clone(),
        rooms,
        Arc::new(Modlog::new(repo.clone())),
    ));

    AppState {
        registry,
        repo,
        privileges: Arc::new(Privileges::new(&config.admins)),
        config: Arc::new(config),
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some(PSK.to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = build_state(&temp_dir, psk.clone()).await;
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn command(&self, actor: &str, command: &str, target: &str) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url("/api/commands"))
            .json(&json!({ "actor": actor, "command": command, "target": target }))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    // Request without API key
    let resp = Client::new()
        .get(fixture.url("/api/clans"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/clans"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = Client::new()
        .get(fixture.url("/api/clans"))
        .header("authorization", format!("Bearer {}", PSK))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_no_psk_configured_allows_requests() {
    let fixture = TestFixture::with_psk(None).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/clans"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_points_scenario() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.command("Admin", "createclan", "Pokemon Masters,Ash").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["clan"]["id"], "pokemonmasters");
    assert_eq!(body["data"]["clan"]["points"], 1000);
    assert_eq!(body["data"]["clan"]["leader"], "ash");

    let (status, body) = fixture.command("Admin", "takepoints", "pokemonmasters,1200").await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_POINTS");

    let (status, body) = fixture.command("Admin", "givepoints", "Pokemon Masters,500").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["clan"]["points"], 1500);
    assert_eq!(
        body["data"]["message"],
        "Successfully gave 500 points to clan \"Pokemon Masters\". Total points: 1500"
    );

    let (status, body) = fixture.command("Admin", "takepoints", "pokemonmasters,1200").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["clan"]["points"], 300);

    let resp = fixture
        .client
        .get(fixture.url("/api/clans/pokemonmasters"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["points"], 300);
}

#[tokio::test]
async fn test_rank_gating() {
    let fixture = TestFixture::new().await;
    fixture.command("Admin", "createclan", "Rockets,Jessie").await;
    fixture.command("Admin", "addclanmember", "Rockets,James").await;

    // Regular users cannot create clans
    let (status, body) = fixture.command("James", "createclan", "Mine,James").await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // A plain member cannot edit the clan
    let (status, _) = fixture.command("James", "setclanicon", "Rockets,https://x/r.png").await;
    assert_eq!(status, 403);

    // The leader can
    let (status, body) = fixture
        .command("Jessie", "setclandesc", "Rockets, Prepare for trouble, make it double")
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"]["clan"]["description"],
        "Prepare for trouble, make it double"
    );

    let (status, body) = fixture.command("Jessie", "clanrank", "Rockets,James,Deputy").await;
    assert_eq!(status, 200);
    let members = body["data"]["clan"]["members"].as_array().unwrap();
    let james = members.iter().find(|m| m["id"] == "james").unwrap();
    assert_eq!(james["rank"], 4);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;
    fixture.command("Admin", "createclan", "Rockets,Jessie").await;

    let (status, body) = fixture.command("Admin", "createclan", "ROCKETS!,Meowth").await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "DUPLICATE_CLAN");

    let (status, body) = fixture.command("Admin", "createclan", "Lobby,Meowth").await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "DUPLICATE_CLAN");

    let (status, body) = fixture.command("Admin", "givepoints", "Rockets,-5").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_AMOUNT");

    let (status, body) = fixture.command("Admin", "clanrank", "Rockets,Jessie,Emperor").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_RANK");

    let (status, body) = fixture.command("Admin", "clanrank", "Rockets,Meowth,Member").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "UNKNOWN_MEMBER");

    let (status, body) = fixture.command("Admin", "frobnicate", "").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let (status, body) = fixture.command("  ", "claninfo", "Rockets").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/clans/nosuchclan"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNKNOWN_CLAN");

    let (status, body) = fixture.command("Admin", "deleteclan", "nosuchclan").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "UNKNOWN_CLAN");
}

#[tokio::test]
async fn test_delete_and_list() {
    let fixture = TestFixture::new().await;
    fixture.command("Admin", "createclan", "Alpha,Ann").await;
    fixture.command("Admin", "createclan", "Beta,Ben").await;

    let (status, _) = fixture.command("Admin", "deleteclan", "Alpha").await;
    assert_eq!(status, 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/clans"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let clans = body["data"].as_array().unwrap();
    assert_eq!(clans.len(), 1);
    assert_eq!(clans[0]["id"], "beta");
}

#[tokio::test]
async fn test_modlog_listing() {
    let fixture = TestFixture::new().await;
    fixture.command("Admin", "createclan", "Alpha,Ann").await;
    fixture.command("Admin", "givepoints", "Alpha,10").await;

    // Modlog writes happen in the background
    let mut entries = Vec::new();
    for _ in 0..20 {
        let resp = fixture
            .client
            .get(fixture.url("/api/modlog?limit=10"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        entries = body["data"].as_array().unwrap().clone();
        if entries.len() == 2 {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(25)).await;
    }

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "GIVEPOINTS");
    assert_eq!(entries[1]["action"], "CLANCREATE");
    assert_eq!(entries[1]["actor"], "admin");
}

#[tokio::test]
async fn test_router_oneshot_requires_psk() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_router(build_state(&temp_dir, Some(PSK.to_string())).await);

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/clans").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/commands")
                .header("x-api-key", PSK)
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "actor": "Admin", "command": "createclan", "target": "Gamma,Gia" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"]["clan"]["id"], "gamma");
}
