//! Static Pages

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../static/index.html");
const SUCCESS_HTML: &str = include_str!("../static/success.html");

/// Order form
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Post-payment upload and generation page
pub async fn success() -> Html<&'static str> {
    Html(SUCCESS_HTML)
}
