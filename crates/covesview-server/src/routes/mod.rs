pub mod comments;
pub mod common;
pub mod communities;
pub mod feeds;
pub mod health;
pub mod image_proxy;
pub mod posts;
pub mod session;
pub mod votes;

use axum::Extension;
use covesview_core::traits::{RecordStore, SessionStore};

use crate::auth::JwtSecret;
use crate::state::AppState;

pub fn build_router<S, Sess>(state: AppState<S, Sess>) -> axum::Router
where
    S: RecordStore,
    Sess: SessionStore,
{
    let jwt_secret = JwtSecret(state.config.session.jwt_secret.clone());

    axum::Router::new()
        .route("/xrpc/_health", axum::routing::get(health::health_check))
        // Session exchange
        .route(
            "/xrpc/app.coves.session.create",
            axum::routing::post(session::create_session::<S, Sess>),
        )
        .route(
            "/xrpc/app.coves.session.delete",
            axum::routing::post(session::delete_session::<S, Sess>),
        )
        // Posts
        .route(
            "/xrpc/app.coves.post.create",
            axum::routing::post(posts::create_post::<S, Sess>),
        )
        .route(
            "/xrpc/app.coves.post.get",
            axum::routing::get(posts::get_post::<S, Sess>),
        )
        // Comments
        .route(
            "/xrpc/app.coves.comment.create",
            axum::routing::post(comments::create_comment::<S, Sess>),
        )
        .route(
            "/xrpc/app.coves.comment.update",
            axum::routing::post(comments::update_comment::<S, Sess>),
        )
        .route(
            "/xrpc/app.coves.comment.delete",
            axum::routing::post(comments::delete_comment::<S, Sess>),
        )
        .route(
            "/xrpc/app.coves.comment.getTree",
            axum::routing::get(comments::get_comment_tree::<S, Sess>),
        )
        // Communities
        .route(
            "/xrpc/app.coves.community.update",
            axum::routing::post(communities::update_community::<S, Sess>),
        )
        .route(
            "/xrpc/app.coves.community.get",
            axum::routing::get(communities::get_community::<S, Sess>),
        )
        // Votes
        .route(
            "/xrpc/app.coves.vote.create",
            axum::routing::post(votes::create_vote::<S, Sess>),
        )
        .route(
            "/xrpc/app.coves.vote.delete",
            axum::routing::post(votes::delete_vote::<S, Sess>),
        )
        // Feeds
        .route(
            "/xrpc/app.coves.feed.get",
            axum::routing::get(feeds::get_feed::<S, Sess>),
        )
        // Image proxy
        .route(
            "/img/{preset}/{plain}/{did}/{cid}",
            axum::routing::get(image_proxy::serve_image::<S, Sess>),
        )
        .layer(Extension(jwt_secret))
        // CORS: allow any origin for XRPC (AT Protocol expects this).
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
                .expose_headers(tower_http::cors::Any),
        )
        // Request body size limit: 10 MiB default (covers image uploads).
        .layer(tower_http::limit::RequestBodyLimitLayer::new(10 * 1024 * 1024))
        .with_state(state)
}
