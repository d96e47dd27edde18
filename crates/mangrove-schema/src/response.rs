//! Response-side validation.
//!
//! [`ResponseRules`] is the explicit registration list attached to a route:
//! it maps status codes to response models (plus an optional header model).
//! [`ValidateResponse`] is the tower layer that inspects handler responses
//! against those rules.
//!
//! A response whose status is registered is buffered, converted into the
//! model (a plain JSON object convertible to the model and a serialized
//! model instance are both accepted), re-serialized in normalized form,
//! and camelized when casing conversion is on. A response that cannot be
//! converted is replaced with a 500: a mismatched response model is a
//! handler bug, not client input. Responses with unregistered status codes
//! pass through untouched.

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use http::{header, HeaderValue};
use http_body_util::BodyExt;
use mangrove_core::MangroveError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::{casing, SchemaConfig};

type BodyValidator = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;
type HeaderValidator =
    Arc<dyn Fn(&http::HeaderMap) -> Result<Vec<(String, String)>, String> + Send + Sync>;

#[derive(Clone)]
struct Rule {
    model_name: &'static str,
    body: BodyValidator,
    headers: Option<HeaderRule>,
}

#[derive(Clone)]
struct HeaderRule {
    model_name: &'static str,
    validate: HeaderValidator,
}

/// Per-route registration of response models by status code.
///
/// # Example
///
/// ```
/// use mangrove_schema::ResponseRules;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Thing {
///     id: String,
///     val: String,
/// }
///
/// let rules = ResponseRules::new().status::<Thing>(200);
/// assert!(rules.model_name(200).unwrap().contains("Thing"));
/// assert_eq!(rules.model_name(201), None);
/// ```
#[derive(Clone, Default)]
pub struct ResponseRules {
    rules: HashMap<u16, Rule>,
}

impl fmt::Debug for ResponseRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (status, rule) in &self.rules {
            map.entry(status, &rule.model_name);
        }
        map.finish()
    }
}

impl ResponseRules {
    /// Creates an empty registration list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` as the response model for `status`.
    #[must_use]
    pub fn status<T>(mut self, status: u16) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.rules.insert(
            status,
            Rule {
                model_name: type_name::<T>(),
                body: body_validator::<T>(),
                headers: None,
            },
        );
        self
    }

    /// Registers `T` as the response model and `H` as the header model for
    /// `status`.
    ///
    /// Header fields map to headers by snake_case ↔ kebab-case renaming
    /// (`x_count` ↔ `x-count`); after validation the model's fields are
    /// written back onto the response headers.
    #[must_use]
    pub fn status_with_headers<T, H>(mut self, status: u16) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
        H: Serialize + DeserializeOwned + 'static,
    {
        self.rules.insert(
            status,
            Rule {
                model_name: type_name::<T>(),
                body: body_validator::<T>(),
                headers: Some(HeaderRule {
                    model_name: type_name::<H>(),
                    validate: header_validator::<H>(),
                }),
            },
        );
        self
    }

    /// Returns the registered model's type name for `status`, if any.
    ///
    /// This is the introspection hook for documentation generators.
    #[must_use]
    pub fn model_name(&self, status: u16) -> Option<&'static str> {
        self.rules.get(&status).map(|rule| rule.model_name)
    }

    fn get(&self, status: u16) -> Option<&Rule> {
        self.rules.get(&status)
    }
}

/// Tower layer applying [`ResponseRules`] to a route's responses.
///
/// ```rust,no_run
/// use axum::{routing::post, Json, Router};
/// use mangrove_schema::{ResponseRules, SchemaConfig, ValidateResponse};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Serialize, Deserialize)]
/// # struct Thing { id: String, val: String }
/// # async fn create() -> Json<serde_json::Value> { todo!() }
///
/// let app: Router = Router::new().route(
///     "/",
///     post(create).layer(ValidateResponse::new(
///         ResponseRules::new().status::<Thing>(200),
///         SchemaConfig::default(),
///     )),
/// );
/// ```
#[derive(Clone)]
pub struct ValidateResponse {
    rules: Arc<ResponseRules>,
    config: SchemaConfig,
}

impl fmt::Debug for ValidateResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateResponse")
            .field("rules", &self.rules)
            .field("config", &self.config)
            .finish()
    }
}

impl ValidateResponse {
    /// Creates the layer from a registration list and pipeline config.
    #[must_use]
    pub fn new(rules: ResponseRules, config: SchemaConfig) -> Self {
        Self {
            rules: Arc::new(rules),
            config,
        }
    }
}

impl<S> Layer<S> for ValidateResponse {
    type Service = ValidateResponseService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidateResponseService {
            inner,
            rules: Arc::clone(&self.rules),
            config: self.config,
        }
    }
}

/// Service produced by [`ValidateResponse`].
#[derive(Clone)]
pub struct ValidateResponseService<S> {
    inner: S,
    rules: Arc<ResponseRules>,
    config: SchemaConfig,
}

impl<S> Service<Request> for ValidateResponseService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let rules = Arc::clone(&self.rules);
        let config = self.config;
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(req).await?;
            Ok(apply_rules(response, &rules, config).await)
        })
    }
}

async fn apply_rules(response: Response, rules: &ResponseRules, config: SchemaConfig) -> Response {
    let Some(rule) = rules.get(response.status().as_u16()) else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return violation(rule, format!("failed to read response body: {e}")),
    };
    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => return violation(rule, format!("response body is not JSON: {e}")),
    };

    let normalized = match (rule.body)(value) {
        Ok(value) => value,
        Err(detail) => return violation(rule, detail),
    };
    let normalized = if config.convert_casing {
        casing::camelize(normalized)
    } else {
        normalized
    };

    if let Some(header_rule) = &rule.headers {
        let updates = match (header_rule.validate)(&parts.headers) {
            Ok(updates) => updates,
            Err(detail) => {
                return violation(
                    rule,
                    format!("headers do not match {}: {detail}", header_rule.model_name),
                )
            }
        };
        for (name, value) in updates {
            match (
                header::HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    parts.headers.insert(name, value);
                }
                _ => return violation(rule, format!("invalid response header '{name}'")),
            }
        }
    }

    let body = match serde_json::to_vec(&normalized) {
        Ok(body) => body,
        Err(e) => return violation(rule, e.to_string()),
    };
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    Response::from_parts(parts, Body::from(body))
}

fn violation(rule: &Rule, detail: String) -> Response {
    tracing::error!(model = rule.model_name, %detail, "response contract violation");
    MangroveError::response_contract(detail).into_response()
}

fn body_validator<T>() -> BodyValidator
where
    T: Serialize + DeserializeOwned + 'static,
{
    Arc::new(|value| {
        let model: T = serde_json::from_value(value).map_err(|e| e.to_string())?;
        serde_json::to_value(&model).map_err(|e| e.to_string())
    })
}

fn header_validator<H>() -> HeaderValidator
where
    H: Serialize + DeserializeOwned + 'static,
{
    Arc::new(|headers| {
        let mut object = serde_json::Map::new();
        for (name, value) in headers {
            let key = name.as_str().to_ascii_lowercase().replace('-', "_");
            let text = value.to_str().map_err(|e| e.to_string())?.to_string();
            // Repeated headers collapse into a comma-joined value.
            match object.get_mut(&key) {
                Some(Value::String(existing)) => {
                    existing.push_str(", ");
                    existing.push_str(&text);
                }
                _ => {
                    object.insert(key, Value::String(text));
                }
            }
        }

        let model: H = serde_json::from_value(Value::Object(object)).map_err(|e| e.to_string())?;
        let rendered = serde_json::to_value(&model).map_err(|e| e.to_string())?;
        let Value::Object(fields) = rendered else {
            return Err("header model must serialize to an object".to_string());
        };

        Ok(fields
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(text) => text,
                    Value::Null => return None,
                    other => other.to_string(),
                };
                Some((key.replace('_', "-"), text))
            })
            .collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use http::{Request as HttpRequest, StatusCode};
    use serde::Deserialize;
    use serde_json::json;
    use tower::ServiceExt;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Thing {
        id: String,
        val: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Paging {
        item_count: u32,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct CountHeader {
        x_count: String,
    }

    fn layered(
        handler_body: Value,
        rules: ResponseRules,
        config: SchemaConfig,
    ) -> Router {
        Router::new().route(
            "/",
            get(move || {
                let body = handler_body.clone();
                async move { Json(body) }
            })
            .layer(ValidateResponse::new(rules, config)),
        )
    }

    async fn fetch(app: Router) -> (StatusCode, http::HeaderMap, Value) {
        let response = app
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, value)
    }

    #[tokio::test]
    async fn test_matching_mapping_is_normalized() {
        // The handler returns a compatible mapping with one stray key; the
        // normalized form carries exactly the model's fields.
        let app = layered(
            json!({"id": "Hello", "val": "World", "stray": true}),
            ResponseRules::new().status::<Thing>(200),
            SchemaConfig::default(),
        );

        let (status, headers, body) = fetch(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(body, json!({"id": "Hello", "val": "World"}));
    }

    #[tokio::test]
    async fn test_incompatible_mapping_is_internal_error() {
        let app = layered(
            json!({"name": "bob"}),
            ResponseRules::new().status::<Thing>(200),
            SchemaConfig::default(),
        );

        let (status, _, body) = fetch(app).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "RESPONSE_CONTRACT_VIOLATION");
    }

    #[tokio::test]
    async fn test_unregistered_status_passes_through() {
        let app = Router::new().route(
            "/",
            post(|| async { (StatusCode::CREATED, "created, not json") }).layer(
                ValidateResponse::new(
                    ResponseRules::new().status::<Thing>(200),
                    SchemaConfig::default(),
                ),
            ),
        );

        let response = app
            .oneshot(HttpRequest::post("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"created, not json");
    }

    #[tokio::test]
    async fn test_registered_non_200_status_is_validated() {
        let app = Router::new().route(
            "/",
            get(|| async { (StatusCode::CREATED, Json(json!({"id": "a", "val": "b"}))) })
                .layer(ValidateResponse::new(
                    ResponseRules::new().status::<Thing>(201),
                    SchemaConfig::default(),
                )),
        );

        let (status, _, body) = fetch(app).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"id": "a", "val": "b"}));
    }

    #[tokio::test]
    async fn test_casing_conversion_on_response() {
        let app = layered(
            json!({"item_count": 3}),
            ResponseRules::new().status::<Paging>(200),
            SchemaConfig {
                convert_casing: true,
            },
        );

        let (status, _, body) = fetch(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"itemCount": 3}));
    }

    #[tokio::test]
    async fn test_header_model_validates_and_rewrites() {
        let app = Router::new().route(
            "/",
            get(|| async {
                (
                    [("x-count", "7")],
                    Json(json!({"id": "a", "val": "b"})),
                )
            })
            .layer(ValidateResponse::new(
                ResponseRules::new().status_with_headers::<Thing, CountHeader>(200),
                SchemaConfig::default(),
            )),
        );

        let (status, headers, _) = fetch(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["x-count"], "7");
    }

    #[tokio::test]
    async fn test_missing_declared_header_is_internal_error() {
        let app = layered(
            json!({"id": "a", "val": "b"}),
            ResponseRules::new().status_with_headers::<Thing, CountHeader>(200),
            SchemaConfig::default(),
        );

        let (status, _, body) = fetch(app).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "RESPONSE_CONTRACT_VIOLATION");
    }

    #[tokio::test]
    async fn test_non_json_body_for_registered_status_is_internal_error() {
        let app = Router::new().route(
            "/",
            get(|| async { "plain text" }).layer(ValidateResponse::new(
                ResponseRules::new().status::<Thing>(200),
                SchemaConfig::default(),
            )),
        );

        let (status, _, body) = fetch(app).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "RESPONSE_CONTRACT_VIOLATION");
    }
}
