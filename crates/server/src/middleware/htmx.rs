//! htmx request detection.

use axum::{extract::FromRequestParts, http::request::Parts};

/// Header htmx sets on every request it issues.
pub const HX_REQUEST_HEADER: &str = "hx-request";

/// Whether the request came from htmx.
///
/// Any non-empty `HX-Request` value counts; such requests get the page
/// fragment instead of the full layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HxRequest(pub bool);

impl<S> FromRequestParts<S> for HxRequest
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_htmx = parts
            .headers
            .get(HX_REQUEST_HEADER)
            .is_some_and(|v| !v.is_empty());
        Ok(Self(is_htmx))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> bool {
        let (mut parts, ()) = request.into_parts();
        HxRequest::from_request_parts(&mut parts, &())
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_detects_header() {
        let request = Request::builder()
            .header("HX-Request", "true")
            .body(())
            .unwrap();
        assert!(extract(request).await);
    }

    #[tokio::test]
    async fn test_missing_or_empty_header() {
        assert!(!extract(Request::builder().body(()).unwrap()).await);

        let empty = Request::builder().header("HX-Request", "").body(()).unwrap();
        assert!(!extract(empty).await);
    }
}
