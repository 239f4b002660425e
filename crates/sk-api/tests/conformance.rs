//! End-to-end session behaviour through the demo routes

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use tower::ServiceExt;

use sk_api::{app, routes};
use sk_core::{CookieSettings, FlashMessage, MemoryStore, SessionManager, SqliteStore};

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}

async fn send(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).expect("request builds successfully");

    app.clone().oneshot(request).await.expect("service call succeeds")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    String::from_utf8(bytes.to_vec()).expect("body is utf-8")
}

/// `name=value` part of the response's Set-Cookie header
fn session_cookie(response: &Response) -> Option<String> {
    let set_cookie = response.headers().get(header::SET_COOKIE)?;
    let set_cookie = set_cookie.to_str().expect("set-cookie header is valid utf-8");
    set_cookie.split(';').next().map(str::to_string)
}

fn memory_app() -> Router {
    app(SessionManager::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_values_survive_across_requests() {
    let app = memory_app();
    let pairs = [
        ("key", "value"),
        ("中文测试", "中文测试"),
        ("<html> &tag, test", "<html> &tag, test"),
    ];

    for (key, value) in pairs {
        let uri = format!("/set?key={}&value={}", encode(key), encode(value));
        let response = send(&app, &uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = session_cookie(&response).expect("new session sets a cookie");
        assert_eq!(body_text(response).await, value);

        let uri = format!("/get?key={}", encode(key));
        let response = send(&app, &uri, Some(&cookie)).await;
        assert!(session_cookie(&response).is_none());
        assert_eq!(body_text(response).await, value);
    }
}

#[tokio::test]
async fn test_pop_consumes_value() {
    let app = memory_app();

    let response = send(&app, "/set?key=key&value=value", None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = send(&app, "/pop?key=key", Some(&cookie)).await;
    assert_eq!(body_text(response).await, "value");

    let response = send(&app, "/pop?key=key", Some(&cookie)).await;
    assert_eq!(body_text(response).await, "");

    let response = send(&app, "/get?key=key", Some(&cookie)).await;
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_flashes_across_requests() {
    let app = memory_app();

    let response = send(&app, "/flash?message=hello1", None).await;
    let cookie = session_cookie(&response).unwrap();
    send(&app, "/flash?message=hello2&kind=success", Some(&cookie)).await;

    let response = send(&app, "/flashes", Some(&cookie)).await;
    let flashes: Vec<FlashMessage> = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        flashes,
        vec![
            FlashMessage::new("hello1"),
            FlashMessage::new("hello2").with_kind("success"),
        ]
    );

    let response = send(&app, "/flashes", Some(&cookie)).await;
    assert_eq!(body_text(response).await, "[]");
}

#[tokio::test]
async fn test_clients_do_not_share_sessions() {
    let app = memory_app();

    let response = send(&app, "/set?key=key&value=mine", None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = send(&app, "/get?key=key", None).await;
    let other = session_cookie(&response).expect("second client gets its own id");
    assert_ne!(other, cookie);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_unknown_id_gets_empty_session() {
    let app = memory_app();

    let response = send(&app, "/get?key=key", Some("sk_session=bogus")).await;
    assert!(session_cookie(&response).is_none());
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_signed_cookie_tampering() {
    let settings = CookieSettings {
        secret: Some("test-secret".to_string()),
        ..CookieSettings::default()
    };
    let app = app(SessionManager::new(MemoryStore::new()).with_cookie(settings));

    let response = send(&app, "/set?key=key&value=value", None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = send(&app, "/get?key=key", Some(&cookie)).await;
    assert_eq!(body_text(response).await, "value");

    // Drop the signature: the id alone is no longer accepted
    let (unsigned, _) = cookie.rsplit_once('.').unwrap();
    let response = send(&app, "/get?key=key", Some(unsigned)).await;
    let reissued = session_cookie(&response).expect("rejected cookie is replaced");
    assert_ne!(reissued, cookie);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_sqlite_backend() {
    let app = app(SessionManager::new(SqliteStore::in_memory().unwrap()));

    let response = send(&app, "/set?key=key&value=value", None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = send(&app, "/keys", Some(&cookie)).await;
    assert_eq!(body_text(response).await, r#"["key"]"#);

    let response = send(&app, "/pop?key=key", Some(&cookie)).await;
    assert_eq!(body_text(response).await, "value");
}

#[tokio::test]
async fn test_empty_key_rejected() {
    let app = memory_app();

    let response = send(&app, "/set?key=&value=value", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_middleware() {
    let app = routes();

    let response = send(&app, "/get?key=key", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("Session middleware is not installed"));
}

#[tokio::test]
async fn test_health() {
    let response = send(&routes(), "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}
