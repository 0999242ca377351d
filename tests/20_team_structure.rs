mod common;

use anyhow::{Context, Result};
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{MultipartBody, TestApp, PNG};

async fn create(app: &TestApp, token: &str, path: &str, body: Value) -> Result<i64> {
    let res = app
        .json(Method::POST, &format!("/api/team-structure/{}", path), Some(token), Some(body))
        .await?;
    anyhow::ensure!(
        res.status == StatusCode::CREATED,
        "create {} failed: {} {}",
        path,
        res.status,
        res.body
    );
    res.body["data"]["id"].as_i64().context("created row has no id")
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
        .unwrap_or_default()
}

fn names(layer: &Value) -> Vec<String> {
    layer["members"]
        .as_array()
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn public_structure_keeps_active_layers_in_member_order() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let layer_a = create(&app, &token, "categories", json!({ "title": "Leadership", "order": 1 })).await?;
    let role = create(
        &app,
        &token,
        "roles",
        json!({ "layerId": layer_a, "title": "Director" }),
    )
    .await?;
    create(&app, &token, "members", json!({ "name": "M1", "roleId": role, "order": 2 })).await?;
    create(&app, &token, "members", json!({ "name": "M2", "roleId": role, "order": 1 })).await?;

    let layer_b = create(
        &app,
        &token,
        "categories",
        json!({ "title": "Alumni", "order": 0, "isActive": false }),
    )
    .await?;
    create(
        &app,
        &token,
        "members",
        json!({ "name": "Old Hand", "layerId": layer_b, "title": "Advisor" }),
    )
    .await?;

    let res = app.get("/api/team-structure/structure/public", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(&res.body["data"]), vec![layer_a]);
    assert_eq!(names(&res.body["data"][0]), vec!["M2", "M1"]);
    assert_eq!(res.body["data"][0]["members"][0]["title"], "Director");
    Ok(())
}

#[tokio::test]
async fn public_structure_filters_pages_and_private_layers() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let about = create(
        &app,
        &token,
        "categories",
        json!({ "title": "Founders", "visibleOn": ["about"] }),
    )
    .await?;
    create(&app, &token, "members", json!({ "name": "F", "layerId": about, "title": "Founder" })).await?;

    let hidden = create(&app, &token, "categories", json!({ "title": "Interns" })).await?;
    create(
        &app,
        &token,
        "members",
        json!({ "name": "I", "layerId": hidden, "title": "Intern", "isPublic": false }),
    )
    .await?;

    let team = app.get("/api/team-structure/structure/public?page=team", None).await?;
    assert_eq!(ids(&team.body["data"]), Vec::<i64>::new());

    let all = app.get("/api/team-structure/structure/public?page=all", None).await?;
    assert_eq!(ids(&all.body["data"]), vec![about]);
    Ok(())
}

#[tokio::test]
async fn duplicate_layer_key_is_rejected() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let first = create(&app, &token, "categories", json!({ "title": "Board Members" })).await?;
    let layer = app
        .get(&format!("/api/team-structure/categories/{}", first), Some(&token))
        .await?;
    assert_eq!(layer.body["data"]["key"], "board-members");

    let res = app
        .json(
            Method::POST,
            "/api/team-structure/categories",
            Some(&token),
            Some(json!({ "title": "Another", "key": "Board Members" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let list = app.get("/api/team-structure/categories", Some(&token)).await?;
    assert_eq!(list.body["count"], 1);
    Ok(())
}

#[tokio::test]
async fn deleting_a_layer_removes_its_roles_and_members() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let layer = create(&app, &token, "categories", json!({ "title": "Engineering" })).await?;
    let backend = create(&app, &token, "roles", json!({ "layerId": layer, "title": "Backend" })).await?;
    let frontend = create(&app, &token, "roles", json!({ "layerId": layer, "title": "Frontend" })).await?;
    let member = create(&app, &token, "members", json!({ "name": "A", "roleId": backend })).await?;
    create(&app, &token, "members", json!({ "name": "B", "roleId": frontend })).await?;
    create(&app, &token, "members", json!({ "name": "C", "layerId": layer, "title": "Lead" })).await?;

    let res = app
        .json(
            Method::DELETE,
            &format!("/api/team-structure/categories/{}", layer),
            Some(&token),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let message = res.body["message"].as_str().unwrap_or_default();
    assert!(message.contains("2 role(s)"), "{}", message);
    assert!(message.contains("3 member(s)"), "{}", message);

    let gone = app
        .get(&format!("/api/team-structure/members/{}", member), Some(&token))
        .await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    let roles = app.get("/api/team-structure/roles", Some(&token)).await?;
    assert_eq!(roles.body["count"], 0);
    Ok(())
}

#[tokio::test]
async fn deleting_a_role_unassigns_its_members() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let layer = create(&app, &token, "categories", json!({ "title": "Design" })).await?;
    let role = create(&app, &token, "roles", json!({ "layerId": layer, "title": "Illustrator" })).await?;
    let member = create(
        &app,
        &token,
        "members",
        json!({ "name": "D", "roleId": role, "title": "Senior Illustrator" }),
    )
    .await?;

    let res = app
        .json(Method::DELETE, &format!("/api/team-structure/roles/{}", role), Some(&token), None)
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .get(&format!("/api/team-structure/members/{}", member), Some(&token))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["data"]["roleId"].is_null());
    assert_eq!(res.body["data"]["layerId"], layer);
    Ok(())
}

#[tokio::test]
async fn role_listing_filters_by_layer() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let first = create(&app, &token, "categories", json!({ "title": "First" })).await?;
    let second = create(&app, &token, "categories", json!({ "title": "Second" })).await?;
    let role = create(&app, &token, "roles", json!({ "layerId": first, "title": "Chair" })).await?;
    create(&app, &token, "roles", json!({ "layerId": second, "title": "Member" })).await?;

    let res = app
        .get(&format!("/api/team-structure/roles?layerId={}", first), Some(&token))
        .await?;
    assert_eq!(ids(&res.body["data"]), vec![role]);
    assert_eq!(res.body["data"][0]["layer"]["title"], "First");
    assert_eq!(res.body["data"][0]["memberCount"], 0);
    Ok(())
}

#[tokio::test]
async fn writes_require_an_admin_token() -> Result<()> {
    let app = TestApp::new()?;

    let res = app
        .json(
            Method::POST,
            "/api/team-structure/categories",
            None,
            Some(json!({ "title": "Nope" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn admin_listings_are_hidden_from_anonymous_callers() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let layer = create(
        &app,
        &token,
        "categories",
        json!({ "title": "Stealth", "isActive": false }),
    )
    .await?;
    let member = create(
        &app,
        &token,
        "members",
        json!({ "name": "Secret Person", "layerId": layer, "title": "Spy", "isPublic": false }),
    )
    .await?;

    for uri in [
        "/api/team-structure/categories".to_string(),
        "/api/team-structure/roles".to_string(),
        "/api/team-structure/members".to_string(),
        format!("/api/team-structure/categories/{}", layer),
        format!("/api/team-structure/members/{}", member),
    ] {
        let res = app.get(&uri, None).await?;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let members = app.get("/api/team-structure/members", Some(&token)).await?;
    assert_eq!(members.status, StatusCode::OK);
    assert_eq!(ids(&members.body["data"]), vec![member]);

    let public = app.get("/api/team-structure/structure/public", None).await?;
    assert_eq!(public.status, StatusCode::OK);
    assert_eq!(ids(&public.body["data"]), Vec::<i64>::new());
    Ok(())
}

async fn update(app: &TestApp, token: &str, path: &str, body: Value) -> Result<common::TestResponse> {
    app.json(
        Method::PUT,
        &format!("/api/team-structure/{}", path),
        Some(token),
        Some(body),
    )
    .await
}

async fn member_json(app: &TestApp, token: &str, id: i64) -> Result<Value> {
    let res = app
        .get(&format!("/api/team-structure/members/{}", id), Some(token))
        .await?;
    anyhow::ensure!(res.status == StatusCode::OK, "member {} missing: {}", id, res.body);
    Ok(res.body["data"].clone())
}

#[tokio::test]
async fn layer_update_checks_the_key_only_when_it_changes() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let alpha = create(
        &app,
        &token,
        "categories",
        json!({ "title": "Alpha", "description": "First tier", "order": 3 }),
    )
    .await?;
    create(&app, &token, "categories", json!({ "title": "Beta" })).await?;
    let path = format!("categories/{}", alpha);

    let res = update(&app, &token, &path, json!({ "title": "Alpha Prime", "key": "alpha" })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["title"], "Alpha Prime");
    assert_eq!(res.body["data"]["key"], "alpha");
    assert_eq!(res.body["data"]["description"], "First tier");
    assert_eq!(res.body["data"]["order"], 3);

    let res = update(&app, &token, &path, json!({ "key": "Beta" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .get(&format!("/api/team-structure/{}", path), Some(&token))
        .await?;
    assert_eq!(res.body["data"]["key"], "alpha");
    Ok(())
}

#[tokio::test]
async fn moving_a_role_takes_its_members_along() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let from = create(&app, &token, "categories", json!({ "title": "From" })).await?;
    let to = create(&app, &token, "categories", json!({ "title": "To" })).await?;
    let role = create(&app, &token, "roles", json!({ "layerId": from, "title": "Mentor" })).await?;
    let member = create(&app, &token, "members", json!({ "name": "Mo", "roleId": role })).await?;

    let res = update(&app, &token, &format!("roles/{}", role), json!({ "layerId": to })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["layerId"], to);

    let moved = member_json(&app, &token, member).await?;
    assert_eq!(moved["layerId"], to);
    assert_eq!(moved["roleId"], role);

    let res = update(&app, &token, &format!("roles/{}", role), json!({ "layerId": 9999 })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn member_placement_follows_layer_and_role_rules() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let first = create(&app, &token, "categories", json!({ "title": "First" })).await?;
    let second = create(&app, &token, "categories", json!({ "title": "Second" })).await?;
    let first_role = create(&app, &token, "roles", json!({ "layerId": first, "title": "Lead" })).await?;
    let second_role = create(&app, &token, "roles", json!({ "layerId": second, "title": "Aide" })).await?;
    let member = create(
        &app,
        &token,
        "members",
        json!({ "name": "Sol", "layerId": first, "title": "Solo" }),
    )
    .await?;
    let path = format!("members/{}", member);

    // A role from another layer is refused.
    let res = update(&app, &token, &path, json!({ "layerId": first, "roleId": second_role })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // A role alone moves the member into the role's layer.
    let res = update(&app, &token, &path, json!({ "roleId": second_role })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["layerId"], second);
    assert_eq!(res.body["data"]["roleId"], second_role);

    // Changing layer drops a role that stays behind.
    let res = update(&app, &token, &path, json!({ "layerId": first })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["layerId"], first);
    assert!(res.body["data"]["roleId"].is_null());

    // Without a role, a member needs its own title.
    let untitled = create(&app, &token, "members", json!({ "name": "Ula", "roleId": first_role })).await?;
    let res = update(&app, &token, &format!("members/{}", untitled), json!({ "roleId": null })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"]["title"].is_string());
    assert_eq!(member_json(&app, &token, untitled).await?["roleId"], first_role);
    Ok(())
}

#[tokio::test]
async fn partial_member_update_keeps_other_fields() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let layer = create(&app, &token, "categories", json!({ "title": "Board" })).await?;
    let member = create(
        &app,
        &token,
        "members",
        json!({
            "name": "Kay",
            "layerId": layer,
            "title": "Chair",
            "bio": "Long-time member",
            "socialLinks": { "linkedin": "https://linkedin.com/in/kay" },
            "order": 4,
        }),
    )
    .await?;

    let res = update(&app, &token, &format!("members/{}", member), json!({ "name": "Kay L." })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    let kept = member_json(&app, &token, member).await?;
    assert_eq!(kept["name"], "Kay L.");
    assert_eq!(kept["title"], "Chair");
    assert_eq!(kept["bio"], "Long-time member");
    assert_eq!(kept["socialLinks"]["linkedin"], "https://linkedin.com/in/kay");
    assert_eq!(kept["order"], 4);
    assert_eq!(kept["layerId"], layer);
    Ok(())
}

#[tokio::test]
async fn deleting_a_layer_removes_member_images_from_disk() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;

    let body = MultipartBody::new()
        .text("title", "Gallery")
        .file("image", "banner.png", "image/png", PNG)
        .finish();
    let res = app
        .multipart(Method::POST, "/api/team-structure/categories", Some(&token), body)
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let layer = res.body["data"]["id"].as_i64().context("no layer id")?;

    let body = MultipartBody::new()
        .text("name", "Pat")
        .text("layerId", &layer.to_string())
        .text("title", "Painter")
        .file("image", "pat.png", "image/png", PNG)
        .finish();
    let res = app
        .multipart(Method::POST, "/api/team-structure/members", Some(&token), body)
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(std::fs::read_dir(app.uploads.path())?.count(), 2);

    let res = app
        .json(
            Method::DELETE,
            &format!("/api/team-structure/categories/{}", layer),
            Some(&token),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(std::fs::read_dir(app.uploads.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn member_image_upload_is_served() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.admin_token().await?;
    let layer = create(&app, &token, "categories", json!({ "title": "Crew" })).await?;

    let body = MultipartBody::new()
        .text("name", "Pic")
        .text("layerId", &layer.to_string())
        .text("title", "Photographer")
        .text("socialLinks", r#"{"github":"https://github.com/pic"}"#)
        .file("image", "face.png", "image/png", PNG)
        .finish();
    let res = app
        .multipart(Method::POST, "/api/team-structure/members", Some(&token), body)
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["socialLinks"]["github"], "https://github.com/pic");

    let url = res.body["data"]["image"].as_str().context("no image url")?;
    assert!(url.starts_with("/uploads/"));

    let file = app.get(url, None).await?;
    assert_eq!(file.status, StatusCode::OK);
    Ok(())
}
