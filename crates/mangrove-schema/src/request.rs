//! Request-side validation extractors.
//!
//! [`Validated`] (JSON bodies) and [`ValidatedForm`] (urlencoded forms)
//! deserialize the request body into the declared model before the handler
//! runs. A body that cannot be converted rejects the request with a 400
//! carrying the validation detail; values are never silently coerced.
//!
//! When [`SchemaConfig::convert_casing`] is on, wire keys are decamelized
//! before the model is constructed, so handlers always see snake_case
//! fields.

use axum::async_trait;
use axum::extract::{FromRef, FromRequest, Request};
use bytes::Bytes;
use mangrove_core::MangroveError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::ops::Deref;

use crate::{casing, SchemaConfig};

/// JSON-body validation extractor.
///
/// ```rust,no_run
/// use axum::{routing::post, Router};
/// use mangrove_schema::{SchemaConfig, Validated};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Thing {
///     id: String,
///     val: String,
/// }
///
/// async fn create(Validated(thing): Validated<Thing>) -> String {
///     thing.id
/// }
///
/// let app: Router = Router::new()
///     .route("/", post(create))
///     .with_state(SchemaConfig::default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<T>(pub T);

impl<T> Validated<T> {
    /// Consumes the extractor and returns the inner model.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    SchemaConfig: FromRef<S>,
{
    type Rejection = MangroveError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let config = SchemaConfig::from_ref(state);
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;

        let mut value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;
        if config.convert_casing {
            value = casing::decamelize(value);
        }

        let model: T = serde_json::from_value(value)
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;
        Ok(Self(model))
    }
}

/// Form-body validation extractor.
///
/// Reads `application/x-www-form-urlencoded` data, optionally decamelizes
/// the field names, and deserializes into the declared model with the
/// usual urlencoded type coercion (string fields, numbers, booleans).
/// Nested models cannot be represented in a flat form and fail validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm<T>(pub T);

impl<T> ValidatedForm<T> {
    /// Consumes the extractor and returns the inner model.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ValidatedForm<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    SchemaConfig: FromRef<S>,
{
    type Rejection = MangroveError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let config = SchemaConfig::from_ref(state);
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;

        let mut pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&bytes)
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;
        if config.convert_casing {
            for (key, _) in &mut pairs {
                *key = casing::decamelize_key(key);
            }
        }

        // Re-encode so serde_urlencoded performs the string-to-type
        // coercion while building the model.
        let encoded = serde_urlencoded::to_string(&pairs)
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;
        let model: T = serde_urlencoded::from_str(&encoded)
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;
        Ok(Self(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::post;
    use axum::Router;
    use http::{header, Request as HttpRequest, StatusCode};
    use http_body_util::BodyExt;
    use serde::{Deserialize, Serialize};
    use tower::ServiceExt;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Thing {
        id: String,
        val: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Snaky {
        item_name: String,
        unit_count: u32,
    }

    fn json_app(config: SchemaConfig) -> Router {
        Router::new()
            .route(
                "/",
                post(|Validated(thing): Validated<Thing>| async move { thing.id }),
            )
            .with_state(config)
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, Bytes) {
        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes)
    }

    #[tokio::test]
    async fn test_valid_body_reaches_handler() {
        let (status, body) = post_json(
            json_app(SchemaConfig::default()),
            r#"{"id": "Hello", "val": "World"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"Hello");
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let (status, body) =
            post_json(json_app(SchemaConfig::default()), r#"{"name": "bob"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["error"], "REQUEST_VALIDATION_FAILED");
        // The underlying validation detail is attached for diagnostics.
        assert!(envelope["message"].as_str().unwrap().contains("id"));
    }

    #[tokio::test]
    async fn test_wrong_type_is_bad_request() {
        let (status, _) = post_json(
            json_app(SchemaConfig::default()),
            r#"{"id": 5, "val": "World"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, _) = post_json(json_app(SchemaConfig::default()), "{broken").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_casing_conversion_on_request() {
        let app = Router::new()
            .route(
                "/",
                post(|Validated(model): Validated<Snaky>| async move {
                    format!("{}x{}", model.item_name, model.unit_count)
                }),
            )
            .with_state(SchemaConfig {
                convert_casing: true,
            });

        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"itemName": "egg", "unitCount": 12}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"eggx12");
    }

    #[tokio::test]
    async fn test_form_validation() {
        let app = Router::new()
            .route(
                "/",
                post(|ValidatedForm(model): ValidatedForm<Snaky>| async move {
                    format!("{}x{}", model.item_name, model.unit_count)
                }),
            )
            .with_state(SchemaConfig::default());

        let response = app
            .clone()
            .oneshot(
                HttpRequest::post("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("item_name=egg&unit_count=12"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Missing field fails with 400.
        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("item_name=egg"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_form_casing_conversion() {
        let app = Router::new()
            .route(
                "/",
                post(|ValidatedForm(model): ValidatedForm<Snaky>| async move {
                    model.item_name
                }),
            )
            .with_state(SchemaConfig {
                convert_casing: true,
            });

        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("itemName=egg&unitCount=12"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
