//! Extended-JSON request/response integration.
//!
//! [`ExtJson`] is the axum-facing side of the codec: used as a response it
//! serializes the value through [`JsonCodec`](crate::JsonCodec); used as an
//! extractor it decodes the request body, rejecting malformed or
//! mismatched bodies with a 400.

use axum::async_trait;
use axum::extract::{FromRef, FromRequest, FromRequestParts, Request};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::request::Parts;
use mangrove_core::MangroveError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Deref;

use crate::JsonCodec;

/// Extended-JSON body.
///
/// As a handler return value, serializes in relaxed mode; use
/// [`JsonCodec::respond`] when the mode comes from application settings.
///
/// ```rust,no_run
/// use bson::doc;
/// use mangrove_bson::ExtJson;
///
/// async fn cart() -> ExtJson<bson::Document> {
///     ExtJson(doc! {"item": "egg", "count": 12})
/// }
/// ```
///
/// As an extractor, decodes the body as extended JSON (both relaxed and
/// canonical forms are accepted):
///
/// ```rust,no_run
/// use mangrove_bson::{ExtJson, Oid};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Lookup {
///     id: Oid,
/// }
///
/// async fn find(ExtJson(lookup): ExtJson<Lookup>) -> String {
///     lookup.id.to_string()
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtJson<T>(pub T);

impl<T> ExtJson<T> {
    /// Consumes the wrapper and returns the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ExtJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl JsonCodec {
    /// Builds a JSON response for `value` in this codec's mode.
    ///
    /// Encoding failures surface as the 500 response-contract error.
    pub fn respond<T: Serialize>(&self, value: &T) -> Response {
        match self.encode(value) {
            Ok(json) => axum::Json(json).into_response(),
            Err(error) => error.into_response(),
        }
    }
}

impl<T: Serialize> IntoResponse for ExtJson<T> {
    fn into_response(self) -> Response {
        JsonCodec::default().respond(&self.0)
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ExtJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MangroveError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;
        let value = JsonCodec::default().decode_slice(&bytes)?;
        Ok(Self(value))
    }
}

// The codec itself can be extracted wherever the app state carries one,
// so handlers reply in the configured mode without touching globals.
#[async_trait]
impl<S> FromRequestParts<S> for JsonCodec
where
    Self: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::{get, post};
    use axum::Router;
    use bson::doc;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_response_renders_extended_json() {
        let app: Router = Router::new().route(
            "/",
            get(|| async {
                ExtJson(doc! {
                    "_id": bson::oid::ObjectId::parse_str("5cf29abb5167a14c9e6e12c4").unwrap(),
                    "item": "egg",
                })
            }),
        );

        let response = app
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            json!({"_id": {"$oid": "5cf29abb5167a14c9e6e12c4"}, "item": "egg"})
        );
    }

    #[tokio::test]
    async fn test_extractor_decodes_extended_json() {
        #[derive(Deserialize)]
        struct Lookup {
            id: crate::Oid,
        }

        let app: Router = Router::new().route(
            "/",
            post(|ExtJson(lookup): ExtJson<Lookup>| async move { lookup.id.to_string() }),
        );

        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header(http::header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"id": {"$oid": "5cf29abb5167a14c9e6e12c4"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"5cf29abb5167a14c9e6e12c4");
    }

    #[tokio::test]
    async fn test_extractor_rejects_malformed_body() {
        #[derive(Deserialize)]
        #[allow(dead_code)]
        struct Lookup {
            id: crate::Oid,
        }

        let app: Router = Router::new().route(
            "/",
            post(|ExtJson(_lookup): ExtJson<Lookup>| async move { "" }),
        );

        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .body(Body::from("{broken"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_respond_uses_codec_mode() {
        let codec = JsonCodec::new(mangrove_core::JsonMode::Canonical);
        let response = codec.respond(&doc! {"count": 12_i32});
        assert_eq!(
            body_json(response).await,
            json!({"count": {"$numberInt": "12"}})
        );
    }
}
