mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};

#[tokio::test]
async fn health_endpoint_reports_ok() -> Result<()> {
    let app = TestApp::new()?;

    let res = app.get("/api/health", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert!(res.body["timestamp"].is_string());
    assert!(res.body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_then_verify() -> Result<()> {
    let app = TestApp::new()?;

    let res = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(res.body["user"]["role"], "admin");
    let token = res.body["token"].as_str().unwrap().to_string();

    let res = app.json(Method::POST, "/api/auth/verify", Some(&token), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["email"], ADMIN_EMAIL);
    Ok(())
}

#[tokio::test]
async fn tampered_token_is_rejected() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    // Flip one character in the middle of the signature.
    let (unsigned, signature) = token.rsplit_once('.').unwrap();
    let mut signature: Vec<char> = signature.chars().collect();
    signature[10] = if signature[10] == 'A' { 'B' } else { 'A' };
    let token = format!("{}.{}", unsigned, signature.into_iter().collect::<String>());

    let res = app.json(Method::POST, "/api/auth/verify", Some(&token), None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    Ok(())
}

#[tokio::test]
async fn verify_without_token_is_unauthorized() -> Result<()> {
    let app = TestApp::new()?;

    let res = app.json(Method::POST, "/api/auth/verify", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let app = TestApp::new()?;

    let res = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "guess" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.body.get("token").is_none());
    Ok(())
}

#[tokio::test]
async fn login_requires_both_fields() -> Result<()> {
    let app = TestApp::new()?;

    let res = app
        .json(Method::POST, "/api/auth/login", None, Some(json!({ "email": ADMIN_EMAIL })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}
