use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

use photoshake::models::messages;

#[tokio::test]
async fn test_tags() {
    let app = TestApp::new().await;
    let admin = app.register("deadpool").await;
    let user = app.register("wolverine").await;

    let create = |token: &str, title: &str| {
        json_request("POST", "/api/tags/new/", Some(token), &json!({ "title": title }))
    };

    let (status, nature) = app.send(create(&user, "nature")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nature["title"], "nature");

    let (_, again) = app.send(create(&admin, " nature ")).await;
    assert_eq!(again["id"], nature["id"]);

    let (status, _) = app.send(create(&user, "   ")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    app.send(create(&user, "city")).await;
    let (_, mine) = app.send(get("/api/tags/my/", Some(&user))).await;
    assert_eq!(mine.as_array().unwrap().len(), 2);
    let (_, mine) = app.send(get("/api/tags/my/?limit=1", Some(&user))).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = app.send(get("/api/tags/all/", Some(&user))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, all) = app.send(get("/api/tags/all/", Some(&admin))).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let nature_uri = |action: &str| format!("/api/tags/{}/{}", action, nature["id"]);

    let (status, found) = app.send(get(&nature_uri("by_id"), Some(&user))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["title"], "nature");
    let (status, _) = app.send(get("/api/tags/by_id/999", Some(&user))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let rename = |token: &str, title: &str| {
        json_request("PUT", &nature_uri("upd_tag"), Some(token), &json!({ "title": title }))
    };
    let (status, _) = app.send(rename(&user, "wildlife")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.send(rename(&admin, "city")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], messages::TAG_ALREADY_EXISTS);
    let (status, body) = app.send(rename(&admin, "wildlife")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "wildlife");

    let (status, _) = app
        .send(empty_request("DELETE", &nature_uri("del"), Some(&user)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(empty_request("DELETE", &nature_uri("del"), Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(empty_request("DELETE", &nature_uri("del"), Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments() {
    let app = TestApp::new().await;
    let admin = app.register("deadpool").await;
    let author = app.register("wolverine").await;
    let owner = app.register("colossus").await;

    let foto = app.upload_foto(&owner, "Harbour", &[]).await;
    let foto_id = foto["id"].as_i64().unwrap();

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/comments/new/999",
            Some(&author),
            &json!({"text": "Lost"}),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], messages::NO_FOTO_ID);

    let (status, comment) = app
        .send(json_request(
            "POST",
            &format!("/api/comments/new/{}", foto_id),
            Some(&author),
            &json!({"text": "Lovely light"}),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["update_status"], false);
    assert!(comment["updated_at"].is_null());
    let comment_id = comment["id"].as_i64().unwrap();
    let author_id = comment["user_id"].as_i64().unwrap();

    let (status, _) = app
        .send(json_request(
            "POST",
            &format!("/api/comments/new/{}", foto_id),
            Some(&author),
            &json!({"text": ""}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let edit = |token: &str| {
        json_request(
            "PUT",
            &format!("/api/comments/edit/{}", comment_id),
            Some(token),
            &json!({"text": "Lovely light, edited"}),
        )
    };
    let (status, body) = app.send(edit(&owner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], messages::COMM_NOT_FOUND);
    let (status, edited) = app.send(edit(&author)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["update_status"], true);
    assert!(edited["updated_at"].is_string());

    let (status, single) = app
        .send(get(&format!("/api/comments/single/{}", comment_id), Some(&owner)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(single["text"], "Lovely light, edited");

    let (_, on_foto) = app
        .send(get(&format!("/api/fotos/comments/all/{}", foto_id), Some(&owner)))
        .await;
    assert_eq!(on_foto.as_array().unwrap().len(), 1);

    let by_author = format!("/api/comments/by_author/{}", author_id);
    let (status, _) = app.send(get(&by_author, Some(&owner))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, list) = app.send(get(&by_author, Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, list) = app
        .send(get(
            &format!("/api/comments/foto_by_author/{}/{}", author_id, foto_id),
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["id"], comment_id);

    let delete_uri = format!("/api/comments/delete/{}", comment_id);
    let (status, _) = app.send(empty_request("DELETE", &delete_uri, Some(&author))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(empty_request("DELETE", &delete_uri, Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(get(&by_author, Some(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ratings() {
    let app = TestApp::new().await;
    let admin = app.register("deadpool").await;
    let owner = app.register("wolverine").await;
    let voter = app.register("colossus").await;

    let foto = app.upload_foto(&owner, "Skyline", &[]).await;
    let foto_id = foto["id"].as_i64().unwrap();

    // Listing ratings before any exist is an empty list, not a 404
    let (status, all) = app.send(get("/api/ratings/all", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all, json!([]));

    let rate = |token: &str, value: i64| {
        empty_request(
            "POST",
            &format!("/api/ratings/fotos/{}/{}", foto_id, value),
            Some(token),
        )
    };

    let (status, body) = app.send(rate(&owner, 5)).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["detail"], messages::OWN_FOTO);

    let (status, _) = app.send(rate(&voter, 0)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, rating) = app.send(rate(&voter, 4)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating["rate"], 4);
    let rating_id = rating["id"].as_i64().unwrap();
    let voter_id = rating["user_id"].as_i64().unwrap();

    let (status, body) = app.send(rate(&voter, 5)).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["detail"], messages::VOTE_TWICE);

    let (status, _) = app.send(rate(&admin, 1)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, foto) = app
        .send(get(&format!("/api/fotos/by_id/{}", foto_id), Some(&owner)))
        .await;
    assert_eq!(foto["avg_rating"], 2.5);

    let (status, body) = app
        .send(empty_request("POST", "/api/ratings/fotos/999/3", Some(&voter)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], messages::NO_FOTO_ID);

    let edit = |token: &str, value: i64| {
        empty_request(
            "PUT",
            &format!("/api/ratings/edit/{}/{}", rating_id, value),
            Some(token),
        )
    };
    let (status, _) = app.send(edit(&owner, 1)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, edited) = app.send(edit(&voter, 2)).await;
    assert_eq!(edited["rate"], 2);
    let (_, edited) = app.send(edit(&admin, 3)).await;
    assert_eq!(edited["rate"], 3);
    let (status, body) = app
        .send(empty_request("PUT", "/api/ratings/edit/999/3", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], messages::NO_RATING);

    let (status, _) = app.send(get("/api/ratings/all", Some(&voter))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, all) = app.send(get("/api/ratings/all", Some(&admin))).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, mine) = app.send(get("/api/ratings/all_my", Some(&voter))).await;
    assert_eq!(mine[0]["id"], rating_id);
    let (status, mine) = app.send(get("/api/ratings/all_my", Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine, json!([]));

    let user_foto = format!("/api/ratings/user_foto/{}/{}", voter_id, foto_id);
    let (status, _) = app.send(get(&user_foto, Some(&voter))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, found) = app.send(get(&user_foto, Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["rate"], 3);

    let delete_uri = format!("/api/ratings/delete/{}", rating_id);
    let (status, _) = app.send(empty_request("DELETE", &delete_uri, Some(&voter))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(empty_request("DELETE", &delete_uri, Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(get(&user_foto, Some(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
