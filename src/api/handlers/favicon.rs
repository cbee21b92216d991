use axum::{http::header, response::IntoResponse};

static FAVICON_ICO: &[u8] = include_bytes!("../../../static/favicon.ico");

pub async fn favicon() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/vnd.microsoft.icon"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        FAVICON_ICO,
    )
}
