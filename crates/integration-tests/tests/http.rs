//! HTTP tests against a running Satchel server.
//!
//! These tests require:
//! - The server running (cargo run -p satchel)
//! - `SATCHEL_TEST_BASE_URL` if it is not on <http://localhost:8080>
//!
//! Sign-in needs a real identity provider, so only anonymous behaviour is
//! covered here. Signed-in flows are covered by the router tests.

use reqwest::{Client, StatusCode, redirect::Policy};

use satchel_integration_tests::base_url;

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_roster_is_public() {
    let resp = client()
        .get(base_url())
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("content-security-policy"));
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains(r#"id="roster""#));
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_profile_requires_sign_in() {
    let resp = client()
        .get(format!("{}/employee/someone%40objectcomputing.com", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client()
        .delete(format!("{}/reflection/1", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_unknown_provider() {
    let resp = client()
        .get(format!("{}/auth/nonexistent/login", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
