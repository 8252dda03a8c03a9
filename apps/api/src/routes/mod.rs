pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::outfits::handlers as outfits;
use crate::outfits::upload::MAX_UPLOAD_BODY_BYTES;
use crate::recommendation::handlers as recommendation;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/auth/signup", post(auth::handle_sign_up))
        .route("/auth/signin", post(auth::handle_sign_in))
        .route(
            "/auth/signin-anonymous",
            post(auth::handle_sign_in_anonymous),
        )
        .route("/auth/signout", post(auth::handle_sign_out))
        .route("/auth/me", get(auth::handle_me))
        // Wardrobe
        .route("/outfits", get(outfits::handle_list))
        .route(
            "/outfits/upload",
            post(outfits::handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route(
            "/outfits/recommendations",
            post(recommendation::handle_recommendations),
        )
        .route(
            "/outfits/:id",
            get(outfits::handle_get).delete(outfits::handle_delete),
        )
        .route(
            "/outfits/:id/favorite",
            patch(outfits::handle_toggle_favorite),
        );

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api)
        .with_state(state)
}
