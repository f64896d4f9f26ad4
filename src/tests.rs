//! Integration tests for the lineup backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use sqlx::{Row, SqlitePool};
use tempfile::TempDir;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool.clone()));

        // Create config
        let config = Config {
            jwt_secret: "test-secret".to_string(),
            jwt_secret_is_default: false,
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 7 * 24 * 3600,
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let tokens = TokenService::new(config.jwt_secret.clone(), config.access_token_ttl_secs);
        let state = AppState {
            repo,
            tokens,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            pool,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user and return (access token, refresh token).
    async fn register_and_login(&self, email: &str) -> (String, String) {
        let register_resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(register_resp.status(), 200);

        let login_resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(login_resp.status(), 200);
        let body: Value = login_resp.json().await.unwrap();
        (
            body["token"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    /// Count player rows for a composition directly in the database.
    async fn player_row_count(&self, composition_id: i64) -> i64 {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM player_positions WHERE composition_id = ?")
            .bind(composition_id)
            .fetch_one(&self.pool)
            .await
            .unwrap();
        row.get("n")
    }
}

fn sample_composition() -> Value {
    json!({
        "name": "4-4-2 base",
        "formation": "4-4-2",
        "players": [
            { "playerName": "GK1", "position": "GK", "number": 1, "x": 0.5, "y": 0.05 }
        ]
    })
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
async fn test_compositions_require_auth() {
    let fixture = TestFixture::new().await;

    // No token
    let resp = fixture
        .client
        .get(fixture.url("/api/compositions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Garbage token
    let resp = fixture
        .client
        .get(fixture.url("/api/compositions"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_register_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "email": "not-an-email", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let details = body["error"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let fixture = TestFixture::new().await;
    fixture.register_and_login("coach@example.com").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "email": "coach@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let fixture = TestFixture::new().await;
    fixture.register_and_login("coach@example.com").await;

    // Wrong password and unknown email answer identically
    let wrong_password = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "coach@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), 401);
    let body1: Value = wrong_password.json().await.unwrap();

    let unknown_email = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_email.status(), 401);
    let body2: Value = unknown_email.json().await.unwrap();

    assert_eq!(body1["error"]["message"], body2["error"]["message"]);
}

#[tokio::test]
async fn test_refresh_rotation() {
    let fixture = TestFixture::new().await;
    let (_token, refresh_token) = fixture.register_and_login("coach@example.com").await;

    // First refresh succeeds and yields a new pair
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let new_refresh = body["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, refresh_token);

    // The old token is revoked: replay fails
    let replay = fixture
        .client
        .post(fixture.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 401);

    // The rotated token still works
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": new_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The new access token is usable against a protected route
    let body: Value = resp.json().await.unwrap();
    let access = body["token"].as_str().unwrap();
    let list = fixture
        .client
        .get(fixture.url("/api/compositions"))
        .bearer_auth(access)
        .send()
        .await
        .unwrap();
    assert_eq!(list.status(), 200);
}

#[tokio::test]
async fn test_composition_lifecycle() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.register_and_login("a@example.com").await;

    // Create
    let create_resp = fixture
        .client
        .post(fixture.url("/api/compositions"))
        .bearer_auth(&token)
        .json(&sample_composition())
        .send()
        .await
        .unwrap();
    assert_eq!(create_resp.status(), 201);
    let created: Value = create_resp.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "4-4-2 base");
    assert!(created["players"][0]["id"].as_i64().unwrap() > 0);

    // List returns exactly one item with that name
    let list_resp = fixture
        .client
        .get(fixture.url("/api/compositions"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(list_resp.status(), 200);
    let list: Value = list_resp.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "4-4-2 base");

    // Get returns the single player with number 1
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 200);
    let got: Value = get_resp.json().await.unwrap();
    assert_eq!(got["players"].as_array().unwrap().len(), 1);
    assert_eq!(got["players"][0]["number"], 1);
    assert_eq!(got["players"][0]["y"], 0.05);

    // Update with an empty player list
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "name": "4-4-2 base", "formation": "4-4-2", "players": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 204);

    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let got: Value = get_resp.json().await.unwrap();
    assert_eq!(got["players"].as_array().unwrap().len(), 0);
    assert_eq!(fixture.player_row_count(id).await, 0);

    // Delete, then the composition is gone
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 204);

    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 404);
}

#[tokio::test]
async fn test_update_is_full_replace() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.register_and_login("a@example.com").await;

    let create_resp = fixture
        .client
        .post(fixture.url("/api/compositions"))
        .bearer_auth(&token)
        .json(&sample_composition())
        .send()
        .await
        .unwrap();
    let created: Value = create_resp.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    let old_player_id = created["players"][0]["id"].as_i64().unwrap();

    // Replace the roster with two different players
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .json(&json!({
            "name": "4-3-3 press",
            "formation": "4-3-3",
            "isFavorite": true,
            "players": [
                { "playerName": "ST", "number": 9, "x": 0.5, "y": 0.9 },
                { "playerName": "CB", "number": 4, "color": "#ff0000", "x": 0.5, "y": 0.2 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 204);

    // Row count matches the new list; the old player is gone
    assert_eq!(fixture.player_row_count(id).await, 2);

    let got: Value = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(got["name"], "4-3-3 press");
    assert_eq!(got["isFavorite"], true);
    let players = got["players"].as_array().unwrap();
    assert_eq!(players.len(), 2);
    assert!(players.iter().all(|p| p["id"].as_i64().unwrap() != old_player_id));
}

#[tokio::test]
async fn test_delete_leaves_no_orphan_players() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.register_and_login("a@example.com").await;

    let created: Value = fixture
        .client
        .post(fixture.url("/api/compositions"))
        .bearer_auth(&token)
        .json(&sample_composition())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(fixture.player_row_count(id).await, 1);

    fixture
        .client
        .delete(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(fixture.player_row_count(id).await, 0);
}

#[tokio::test]
async fn test_ownership_isolation() {
    let fixture = TestFixture::new().await;
    let (token_a, _) = fixture.register_and_login("a@example.com").await;
    let (token_b, _) = fixture.register_and_login("b@example.com").await;

    let created: Value = fixture
        .client
        .post(fixture.url("/api/compositions"))
        .bearer_auth(&token_a)
        .json(&sample_composition())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    // B cannot see, modify, or delete A's composition
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 404);

    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token_b)
        .json(&json!({ "name": "Hijacked", "formation": "5-3-2", "players": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 404);

    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 404);

    // B's list is empty; A's composition is unchanged
    let list_b: Value = fixture
        .client
        .get(fixture.url("/api/compositions"))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list_b.as_array().unwrap().len(), 0);

    let got_a: Value = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}", id)))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(got_a["name"], "4-4-2 base");
    assert_eq!(got_a["players"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.register_and_login("a@example.com").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/compositions"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "",
            "formation": "",
            "players": [{ "playerName": "", "x": 0.5, "y": 0.5 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let details = body["error"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 3);
}

#[tokio::test]
async fn test_out_of_range_coordinates_accepted() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.register_and_login("a@example.com").await;

    // Coordinates are not clamped at write time
    let resp = fixture
        .client
        .post(fixture.url("/api/compositions"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Keeper in the stands",
            "formation": "4-4-2",
            "players": [{ "playerName": "GK1", "x": 1.7, "y": -0.3 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["players"][0]["x"], 1.7);
    assert_eq!(created["players"][0]["y"], -0.3);
}

#[tokio::test]
async fn test_pdf_export() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.register_and_login("a@example.com").await;

    let created: Value = fixture
        .client
        .post(fixture.url("/api/compositions"))
        .bearer_auth(&token)
        .json(&sample_composition())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}/export", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("4-4-2_base.pdf"));

    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    // Export of someone else's composition is 404
    let (token_b, _) = fixture.register_and_login("b@example.com").await;
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/compositions/{}/export", id)))
        .bearer_auth(&token_b)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_profile_endpoints() {
    let fixture = TestFixture::new().await;
    let (token, _) = fixture.register_and_login("coach@example.com").await;

    let profile: Value = fixture
        .client
        .get(fixture.url("/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["email"], "coach@example.com");
    assert_eq!(profile["username"], "coach");

    // Update the username; a fresh token comes back and remains valid
    let update_resp = fixture
        .client
        .put(fixture.url("/api/profile"))
        .bearer_auth(&token)
        .json(&json!({ "username": "head-coach" }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let body: Value = update_resp.json().await.unwrap();
    let new_token = body["token"].as_str().unwrap();

    let profile: Value = fixture
        .client
        .get(fixture.url("/api/profile"))
        .bearer_auth(new_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["username"], "head-coach");
}
