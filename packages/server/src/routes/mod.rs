use axum::Router;
use axum::routing::{get, post};

use crate::handlers::avatar;
use crate::state::AppState;

pub fn avatar_routes() -> Router<AppState> {
    Router::new()
        .route("/avatar", get(avatar::list_avatars))
        .route(
            "/avatar/{student_id}/avatar",
            post(avatar::upload_avatar).layer(avatar::avatar_upload_body_limit()),
        )
        .route("/avatar/{student_id}/cover", get(avatar::get_cover))
        .route(
            "/avatar/{student_id}/cover/preview",
            get(avatar::get_preview),
        )
}
