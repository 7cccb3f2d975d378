use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers::{
    auth, comments, fotos, health, media, ratings, tags, transformations, users,
};
use crate::services::rate_limiter::rate_limit;
use crate::AppState;

/// Builds the full application router with its middleware stack
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    let api = Router::new()
        .route("/healthchecker", get(health::healthchecker))
        .nest("/auth", auth_routes(&state))
        .nest("/users", user_routes())
        .nest("/fotos", foto_routes())
        .nest("/tags", tag_routes())
        .nest("/comments", comment_routes())
        .nest("/ratings", rating_routes())
        .nest("/transformations", transformation_routes());

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/media/*path", get(media::serve_media))
        .nest("/api", api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(cors),
        )
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/refresh_token", get(auth::refresh_token))
        .route("/confirmed_email/:token", get(auth::confirmed_email))
        .route("/request_email", post(auth::request_email))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me/", get(users::me))
        .route("/edit_me/", put(users::edit_me))
        .route("/all", get(users::all))
        .route("/users_with_username/:username", get(users::users_with_username))
        .route("/user_profile_with_username/:username", get(users::user_profile))
        .route("/commented_fotos_by_me/", get(users::commented_fotos))
        .route("/rated_fotos_by_me/", get(users::rated_fotos))
        .route("/ban/:email/", patch(users::ban))
        .route("/make_role/:email/", patch(users::make_role))
}

fn foto_routes() -> Router<AppState> {
    Router::new()
        .route("/new/", post(fotos::create_foto))
        .route("/my_fotos", get(fotos::my_fotos))
        .route("/all", get(fotos::all_fotos))
        .route("/by_id/:foto_id", get(fotos::by_id))
        .route("/by_title/:title", get(fotos::by_title))
        .route("/by_user_id/:user_id", get(fotos::by_user_id))
        .route("/by_username/:name", get(fotos::by_username))
        .route("/with_tag/:tag", get(fotos::with_tag))
        .route("/comments/all/:foto_id", get(fotos::comments))
        .route("/by_keyword/:keyword", get(fotos::by_keyword))
        .route(
            "/:foto_id",
            put(fotos::update_foto).delete(fotos::remove_foto),
        )
}

fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/new/", post(tags::create_tag))
        .route("/my/", get(tags::my_tags))
        .route("/all/", get(tags::all_tags))
        .route("/by_id/:tag_id", get(tags::by_id))
        .route("/upd_tag/:tag_id", put(tags::update_tag))
        .route("/del/:tag_id", delete(tags::remove_tag))
}

fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/new/:foto_id", post(comments::create_comment))
        .route("/edit/:comment_id", put(comments::edit_comment))
        .route("/delete/:comment_id", delete(comments::delete_comment))
        .route("/single/:comment_id", get(comments::single_comment))
        .route("/by_author/:user_id", get(comments::by_author))
        .route(
            "/foto_by_author/:user_id/:foto_id",
            get(comments::foto_by_author),
        )
}

fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/fotos/:foto_id/:rate", post(ratings::create_rate))
        .route("/edit/:rate_id/:new_rate", put(ratings::edit_rate))
        .route("/delete/:rate_id", delete(ratings::delete_rate))
        .route("/all", get(ratings::all_ratings))
        .route("/all_my", get(ratings::my_ratings))
        .route("/user_foto/:user_id/:foto_id", get(ratings::user_foto_rating))
}

fn transformation_routes() -> Router<AppState> {
    Router::new()
        .route("/:foto_id", patch(transformations::transform_foto))
        .route("/qr/:foto_id", post(transformations::foto_qr))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}
