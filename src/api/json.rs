//! JSON request body extractor

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap},
};

use crate::error::AppError;

/// Raw body of a request whose content type is JSON.
///
/// Rejects any other content type with [`AppError::UnsupportedContentType`].
/// Parsing is left to the caller so that lookups can run before the body is
/// decoded.
pub struct JsonBody(pub Bytes);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json_content_type(req.headers()) {
            return Err(AppError::UnsupportedContentType);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Internal(rejection.body_text()))?;

        Ok(JsonBody(bytes))
    }
}

/// `application/json` or any `application/*+json` media type, parameters ignored
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
