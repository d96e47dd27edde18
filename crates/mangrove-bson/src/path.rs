//! Identifier-aware path extractor.
//!
//! [`IdPath`] wraps axum's `Path` extractor with one policy change: any
//! extraction failure produces a **404 Not Found** instead of a client
//! error. A syntactically invalid identifier in the URL names a resource
//! that cannot exist, so routes behave uniformly as "404 on bad id".

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use mangrove_core::MangroveError;
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// Path extractor that treats invalid segments as missing resources.
///
/// `IdPath<T>` deserializes path parameters exactly like `Path<T>`, but a
/// segment that fails to parse rejects the request with 404 rather than
/// 400. The common single-parameter case is `IdPath<Oid>`:
///
/// ```rust,no_run
/// use axum::{routing::get, Router};
/// use mangrove_bson::{IdPath, Oid};
///
/// async fn show_task(IdPath(task_id): IdPath<Oid>) -> String {
///     format!("task {task_id}")
/// }
///
/// let app: Router = Router::new().route("/tasks/:task_id", get(show_task));
/// ```
///
/// Multi-parameter routes deserialize into a struct, with every field
/// covered by the same not-found policy:
///
/// ```rust
/// use mangrove_bson::Oid;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct AttachmentPath {
///     task_id: Oid,
///     attachment_id: Oid,
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPath<T>(pub T);

impl<T> IdPath<T> {
    /// Consumes the extractor and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for IdPath<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Rejection for [`IdPath`]: always a 404.
#[derive(Debug)]
pub struct IdPathRejection(());

impl IntoResponse for IdPathRejection {
    fn into_response(self) -> Response {
        MangroveError::not_found("resource").into_response()
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for IdPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = IdPathRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(uri = %parts.uri, %rejection, "invalid path identifier");
                Err(IdPathRejection(()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Oid;
    use axum::{routing::get, Router};
    use http::{Request, StatusCode};
    use serde::Deserialize;
    use tower::ServiceExt;

    async fn show(IdPath(id): IdPath<Oid>) -> String {
        id.to_string()
    }

    fn app() -> Router {
        Router::new().route("/tasks/:task_id", get(show))
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        let response = app
            .oneshot(Request::get(uri).body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_valid_id_reaches_handler() {
        let status = get_status(app(), "/tasks/5cf29abb5167a14c9e6e12c4").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_id_is_not_found() {
        for uri in [
            "/tasks/abc",
            "/tasks/tasks",
            "/tasks/5cf29abb5167a14c9e6e12cg",
        ] {
            let status = get_status(app(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "uri {uri}");
        }
    }

    #[tokio::test]
    async fn test_handler_sees_round_tripped_id() {
        let response = app()
            .oneshot(
                Request::get("/tasks/5cf29abb5167a14c9e6e12c4")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"5cf29abb5167a14c9e6e12c4");
    }

    #[tokio::test]
    async fn test_multi_parameter_struct() {
        #[derive(Deserialize)]
        struct Pair {
            a: Oid,
            b: Oid,
        }

        async fn both(IdPath(pair): IdPath<Pair>) -> String {
            format!("{}/{}", pair.a, pair.b)
        }

        let app: Router = Router::new().route("/x/:a/:b", get(both));

        let ok = get_status(
            app.clone(),
            "/x/5cf29abb5167a14c9e6e12c4/5cf29abb5167a14c9e6e12c5",
        )
        .await;
        assert_eq!(ok, StatusCode::OK);

        let bad = get_status(app, "/x/5cf29abb5167a14c9e6e12c4/nope").await;
        assert_eq!(bad, StatusCode::NOT_FOUND);
    }
}
