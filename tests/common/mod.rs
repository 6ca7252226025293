#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use keywarden::{ServerConfig, create_app, db::Database};
use tower::ServiceExt;

pub const TEST_ACCESS_SECRET: &[u8] = b"test-access-secret-long-enough-to-use";
pub const TEST_REFRESH_SECRET: &[u8] = b"test-refresh-secret-long-enough-to-use";

pub struct TestContext {
    pub app: Router,
    pub db: Database,
}

/// Build the app against an in-memory database.
/// Minimum bcrypt cost keeps the suite fast; production uses the default.
pub async fn setup() -> TestContext {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let config = ServerConfig {
        db: db.clone(),
        access_secret: TEST_ACCESS_SECRET.to_vec(),
        refresh_secret: TEST_REFRESH_SECRET.to_vec(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 7 * 24 * 60 * 60,
        bcrypt_cost: 4,
        secure_cookies: false,
    };

    TestContext {
        app: create_app(&config),
        db,
    }
}

impl TestContext {
    /// Send a request through the router.
    /// `body` becomes a JSON body, `bearer` an Authorization header, and
    /// `refresh` the refresh_token cookie.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<&serde_json::Value>,
        bearer: Option<&str>,
        refresh: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(token) = refresh {
            builder = builder.header(header::COOKIE, format!("refresh_token={}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }
}

/// Read the response body as JSON. Returns Null for an empty body.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not valid JSON")
    }
}

/// Extract the refresh_token cookie value from a response, if one was set.
pub fn refresh_cookie_value(response: &Response) -> Option<String> {
    for value in response.headers().get_all(header::SET_COOKIE) {
        let value = value.to_str().ok()?;
        if let Some(rest) = value.strip_prefix("refresh_token=") {
            let token = rest.split(';').next().unwrap_or("");
            return Some(token.to_string());
        }
    }
    None
}

/// Find the raw refresh_token Set-Cookie header, attributes included.
pub fn refresh_cookie_header(response: &Response) -> Option<String> {
    for value in response.headers().get_all(header::SET_COOKIE) {
        let value = value.to_str().ok()?;
        if value.starts_with("refresh_token=") {
            return Some(value.to_string());
        }
    }
    None
}

/// An account registered through the API, with both token halves.
pub struct Registered {
    pub access_token: String,
    pub refresh_token: String,
    pub user: serde_json::Value,
}

/// Register an account and return its tokens and public view.
pub async fn register_account(
    ctx: &TestContext,
    full_name: &str,
    email: &str,
    password: &str,
) -> Registered {
    let response = ctx
        .send(
            "POST",
            "/api/auth/register",
            Some(&serde_json::json!({
                "fullName": full_name,
                "email": email,
                "password": password,
            })),
            None,
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let refresh_token = refresh_cookie_value(&response).expect("No refresh cookie set");
    let body = body_json(response).await;

    Registered {
        access_token: body["data"]["accessToken"]
            .as_str()
            .expect("No access token")
            .to_string(),
        refresh_token,
        user: body["data"]["user"].clone(),
    }
}

/// Sign a token with the given claims and secret, bypassing the service.
/// Used to craft expired or cross-class tokens for negative tests.
pub fn sign_token(sub: &str, email: &str, iat: u64, exp: u64, secret: &[u8]) -> String {
    let claims = keywarden::jwt::Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        iat,
        exp,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret),
    )
    .expect("Failed to sign token")
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
