use axum::http::{header, StatusCode};
use serde_json::json;

mod common;
use common::*;

use photoshake::models::messages;
use photoshake::services::media_storage::MediaStorage;

#[tokio::test]
async fn test_me_and_edit_profile() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;

    let (status, me) = app.send(get("/api/users/me/", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "deadpool@example.com");
    assert!(me["avatar"].is_null());

    let png = png_bytes(64, 48);
    let (status, body) = app
        .send(multipart_request(
            "PUT",
            "/api/users/edit_me/",
            &token,
            &[("new_username", "wade_wilson")],
            &[("avatar", "me.png", png.as_slice())],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["username"], "wade_wilson");

    let avatar = body["avatar"].as_str().unwrap();
    let id = me["id"].as_i64().unwrap();
    assert_eq!(
        avatar,
        format!(
            "http://testserver/media/c_fill,h_250,w_250/v1/photoshake/avatars/{}",
            id
        )
    );

    let response = app.raw(get(&media_path(avatar), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let rendered = decode_image(&bytes);
    assert_eq!((rendered.width(), rendered.height()), (250, 250));

    // The cached user must not hide the rename
    let (_, me) = app.send(get("/api/users/me/", Some(&token))).await;
    assert_eq!(me["username"], "wade_wilson");

    let (status, _) = app
        .send(multipart_request(
            "PUT",
            "/api/users/edit_me/",
            &token,
            &[("new_username", "dp")],
            &[],
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(multipart_request(
            "PUT",
            "/api/users/edit_me/",
            &token,
            &[],
            &[("avatar", "notes.txt", &b"plain text, not an image"[..])],
        ))
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_rejected_profile_edit_leaves_no_avatar_behind() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let (_, me) = app.send(get("/api/users/me/", Some(&token))).await;
    let public_id = MediaStorage::avatar_public_id(me["id"].as_i64().unwrap());
    let png = png_bytes(32, 32);

    let (status, _) = app
        .send(multipart_request(
            "PUT",
            "/api/users/edit_me/",
            &token,
            &[("new_username", "dp")],
            &[("avatar", "me.png", png.as_slice())],
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!app.state.storage.exists(&public_id));

    sqlx::query(
        "CREATE TRIGGER users_read_only BEFORE UPDATE ON users \
         BEGIN SELECT RAISE(ABORT, 'users are read only'); END",
    )
    .execute(&app.state.db)
    .await
    .unwrap();

    let (status, _) = app
        .send(multipart_request(
            "PUT",
            "/api/users/edit_me/",
            &token,
            &[],
            &[("avatar", "me.png", png.as_slice())],
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!app.state.storage.exists(&public_id));

    let (_, me) = app.send(get("/api/users/me/", Some(&token))).await;
    assert!(me["avatar"].is_null());
}

#[tokio::test]
async fn test_avatar_upload_respects_size_limit() {
    let app = TestApp::with_config(|config| config.max_file_size = 64).await;
    let token = app.register("deadpool").await;

    let png = png_bytes(64, 64);
    let (status, body) = app
        .send(multipart_request(
            "PUT",
            "/api/users/edit_me/",
            &token,
            &[],
            &[("avatar", "me.png", png.as_slice())],
        ))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error_code"], "FILE_TOO_LARGE");
}

#[tokio::test]
async fn test_listing_and_searching_users() {
    let app = TestApp::new().await;
    let admin = app.register("deadpool").await;
    let user = app.register("wolverine").await;

    let (status, body) = app.send(get("/api/users/all", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app
        .send(get("/api/users/all?skip=1&limit=10", Some(&admin)))
        .await;
    assert_eq!(body[0]["username"], "wolverine");

    let (status, body) = app.send(get("/api/users/all", Some(&user))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], messages::OPERATION_FORBIDDEN);

    let (status, body) = app
        .send(get("/api/users/users_with_username/WOLV", Some(&user)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["is_active"], true);

    let (status, _) = app
        .send(get("/api/users/users_with_username/magneto", Some(&user)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_profile_counts() {
    let app = TestApp::new().await;
    let owner = app.register("deadpool").await;
    let fan = app.register("wolverine").await;

    let foto = app.upload_foto(&owner, "Beach", &[]).await;
    let foto_id = foto["id"].as_i64().unwrap();

    app.send(json_request(
        "POST",
        &format!("/api/comments/new/{}", foto_id),
        Some(&fan),
        &json!({"text": "Great shot"}),
    ))
    .await;
    app.send(empty_request(
        "POST",
        &format!("/api/ratings/fotos/{}/5", foto_id),
        Some(&fan),
    ))
    .await;

    let (status, profile) = app
        .send(get("/api/users/user_profile_with_username/deadpool", Some(&fan)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["foto_count"], 1);
    assert_eq!(profile["comment_count"], 0);

    let (_, profile) = app
        .send(get("/api/users/user_profile_with_username/wolverine", Some(&fan)))
        .await;
    assert_eq!(profile["comment_count"], 1);
    assert_eq!(profile["rates_count"], 1);

    let (status, _) = app
        .send(get("/api/users/user_profile_with_username/magneto", Some(&fan)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(get("/api/users/commented_fotos_by_me/", Some(&fan)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], foto_id);

    let (_, body) = app.send(get("/api/users/rated_fotos_by_me/", Some(&fan))).await;
    assert_eq!(body[0]["avg_rating"], 5.0);

    let (status, _) = app
        .send(get("/api/users/commented_fotos_by_me/", Some(&owner)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(get("/api/users/rated_fotos_by_me/", Some(&owner)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ban_user() {
    let app = TestApp::new().await;
    let admin = app.register("deadpool").await;
    let user = app.register("wolverine").await;

    let ban = |token: &str, email: &str| {
        json_request(
            "PATCH",
            &format!("/api/users/ban/{}/", email),
            Some(token),
            &json!({ "email": email }),
        )
    };

    let (status, _) = app.send(ban(&user, "deadpool@example.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(ban(&admin, "ghost@example.com")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], messages::INVALID_EMAIL);

    let (status, body) = app.send(ban(&admin, "wolverine@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], messages::USER_NOT_ACTIVE);

    let (status, body) = app.send(ban(&admin, "wolverine@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], messages::USER_ALREADY_NOT_ACTIVE);

    let (status, body) = app.send(get("/api/users/me/", Some(&user))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], messages::USER_NOT_ACTIVE);

    let (status, _) = app.login("wolverine@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_make_role() {
    let app = TestApp::new().await;
    let admin = app.register("deadpool").await;
    let user = app.register("wolverine").await;

    let make_role = |token: &str, role: &str| {
        json_request(
            "PATCH",
            "/api/users/make_role/wolverine@example.com/",
            Some(token),
            &json!({ "email": "wolverine@example.com", "role": role }),
        )
    };

    let (status, _) = app.send(make_role(&user, "Administrator")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(make_role(&admin, "Moderator")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User role changed to Moderator");

    let (_, body) = app.send(make_role(&admin, "Moderator")).await;
    assert_eq!(body["message"], messages::USER_ROLE_EXISTS);

    let (_, me) = app.send(get("/api/users/me/", Some(&user))).await;
    assert_eq!(me["role"], "Moderator");
}
