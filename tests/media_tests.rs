use axum::http::{header, StatusCode};
use base64::Engine;
use serde_json::{json, Value};

mod common;
use common::*;

async fn fetch(app: &TestApp, url: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.raw(get(&media_path(url), None)).await;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, body.to_vec())
}

async fn transform(app: &TestApp, token: &str, foto_id: i64, body: Value) -> (StatusCode, Value) {
    app.send(json_request(
        "PATCH",
        &format!("/api/transformations/{}", foto_id),
        Some(token),
        &body,
    ))
    .await
}

fn public_id(foto: &Value) -> String {
    let url = foto["image_url"].as_str().unwrap();
    url.split("/v1/").nth(1).unwrap().to_string()
}

#[tokio::test]
async fn test_original_and_preview_delivery() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let foto = app.upload_foto(&token, "Original", &[]).await;

    let original_url = format!("http://testserver/media/v1/{}", public_id(&foto));
    let (status, content_type, bytes) = fetch(&app, &original_url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(bytes, png_bytes(40, 30));

    let (status, _, bytes) = fetch(&app, foto["image_url"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let preview = decode_image(&bytes);
    assert_eq!((preview.width(), preview.height()), (250, 250));

    // Served from the cache the second time
    assert_eq!(app.state.media_cache.len().await, 1);
    let (_, _, again) = fetch(&app, foto["image_url"].as_str().unwrap()).await;
    assert_eq!(again, bytes);
    assert_eq!(app.state.media_cache.get_stats().await.total_hits, 1);
}

#[tokio::test]
async fn test_media_errors() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let foto = app.upload_foto(&token, "Original", &[]).await;
    let id = public_id(&foto);

    let (status, _, _) = fetch(&app, "http://testserver/media/v1/photoshake/1/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = fetch(&app, &format!("http://testserver/media/x_nonsense/v1/{}", id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = fetch(&app, &format!("http://testserver/media/c_fill,h_0,w_10/v1/{}", id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = fetch(&app, "http://testserver/media/photoshake/1/no-version").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_chains_are_refused() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let foto = app.upload_foto(&token, "Spin", &[]).await;
    let id = public_id(&foto);

    // Every 45 degree turn enlarges the canvas; eight of them pass 4000px
    let spins = vec!["a_45"; 8].join("/");
    let (status, _, _) = fetch(
        &app,
        &format!("http://testserver/media/c_scale,w_400/{}/v1/{}", spins, id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let flips = vec!["a_vflip"; 17].join("/");
    let (status, _, _) = fetch(&app, &format!("http://testserver/media/{}/v1/{}", flips, id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.state.media_cache.len().await, 0);
}

#[tokio::test]
async fn test_circle_and_effect_transformation() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let foto = app.upload_foto(&token, "Portrait", &[]).await;
    let foto_id = foto["id"].as_i64().unwrap();

    let (status, body) = transform(
        &app,
        &token,
        foto_id,
        json!({
            "circle": {"use_filter": true, "height": 100, "width": 100},
            "effect": {"use_filter": true, "art_audrey": true, "art_zorro": true}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let url = body["transform_url"].as_str().unwrap();
    assert_eq!(
        url,
        format!(
            "http://testserver/media/c_thumb,g_face,h_100,w_100/r_max/e_art:zorro/v1/{}",
            public_id(&foto)
        )
    );
    assert_eq!(body["image_url"], foto["image_url"]);

    let (status, content_type, bytes) = fetch(&app, url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));

    let rendered = decode_image(&bytes);
    assert_eq!((rendered.width(), rendered.height()), (100, 100));
    assert_eq!(rendered.get_pixel(0, 0).0[3], 0);
    let centre = rendered.get_pixel(50, 50).0;
    assert_eq!(centre[3], 255);
    assert_eq!(centre[0], centre[1]);
}

#[tokio::test]
async fn test_rotate_and_text_transformation() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let foto = app.upload_foto(&token, "Street", &[]).await;
    let foto_id = foto["id"].as_i64().unwrap();

    let (_, body) = transform(
        &app,
        &token,
        foto_id,
        json!({"rotate": {"use_filter": true, "width": 200, "degree": 90}}),
    )
    .await;
    let url = body["transform_url"].as_str().unwrap();
    assert!(url.contains("/media/c_scale,w_200/a_vflip/a_90/v1/"));

    let (status, _, bytes) = fetch(&app, url).await;
    assert_eq!(status, StatusCode::OK);
    let rotated = decode_image(&bytes);
    assert_eq!((rotated.width(), rotated.height()), (150, 200));

    let (_, body) = transform(
        &app,
        &token,
        foto_id,
        json!({"text": {"use_filter": true, "font_size": 14, "text": "Hi there"}}),
    )
    .await;
    let url = body["transform_url"].as_str().unwrap();
    assert!(url.contains("/media/co_yellow,g_south,l_text:14:Hi%20there,y_20/v1/"));

    let (status, _, bytes) = fetch(&app, url).await;
    assert_eq!(status, StatusCode::OK);
    let captioned = decode_image(&bytes);
    assert_eq!((captioned.width(), captioned.height()), (40, 30));
}

#[tokio::test]
async fn test_question_mark_caption_url_resolves() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let foto = app.upload_foto(&token, "Query", &[]).await;

    let (status, body) = transform(
        &app,
        &token,
        foto["id"].as_i64().unwrap(),
        json!({"text": {"use_filter": true, "font_size": 14, "text": "Why?"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let url = body["transform_url"].as_str().unwrap();
    assert!(url.contains("/media/co_yellow,g_south,l_text:14:Why%3F,y_20/v1/"));
    assert!(!url.contains('?'));

    let (status, content_type, _) = fetch(&app, url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_transformation_rules() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let other = app.register("wolverine").await;
    let foto = app.upload_foto(&token, "Rules", &[]).await;
    let foto_id = foto["id"].as_i64().unwrap();

    let (status, body) = transform(&app, &token, foto_id, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transform_url"], foto["transform_url"]);

    let (status, _) = transform(
        &app,
        &token,
        foto_id,
        json!({"rotate": {"use_filter": true, "width": 200, "degree": 400}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = transform(
        &app,
        &token,
        foto_id,
        json!({"text": {"use_filter": true, "font_size": 14, "text": "no/slashes"}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let resize = json!({"resize": {"use_filter": true, "crop": true, "fill": true, "height": 20, "width": 20}});
    let (status, _) = transform(&app, &other, foto_id, resize.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = transform(&app, &token, foto_id, resize).await;
    assert!(body["transform_url"]
        .as_str()
        .unwrap()
        .contains("/media/c_fill,g_auto,h_20,w_20/v1/"));
}

#[tokio::test]
async fn test_qr_code_for_transform_url() {
    let app = TestApp::new().await;
    let token = app.register("deadpool").await;
    let other = app.register("wolverine").await;
    let foto = app.upload_foto(&token, "Share me", &[]).await;
    let uri = format!("/api/transformations/qr/{}", foto["id"]);

    let (status, body) = app.send(empty_request("POST", &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let png = base64::engine::general_purpose::STANDARD
        .decode(body.as_str().unwrap())
        .unwrap();
    let qr = decode_image(&png);
    assert_eq!(qr.width(), qr.height());
    assert!(qr.width() > 100);

    let (status, _) = app.send(empty_request("POST", &uri, Some(&other))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(empty_request("POST", "/api/transformations/qr/999", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
