//! # Mangrove
//!
//! **MongoDB integration for axum applications.**
//!
//! Mangrove wires axum to the MongoDB driver without reimplementing either
//! side. It provides:
//!
//! - [`Oid`] / [`IdPath`] – a path converter for 24-hex-character document
//!   identifiers where an invalid segment behaves like a missing resource
//!   (404, not 400)
//! - [`JsonCodec`] / [`ExtJson`] – extended JSON in responses and request
//!   bodies, relaxed or canonical per configuration
//! - [`Mongo`] – connection configuration resolved up front, with the
//!   client constructed once from the application's startup hook
//! - [`Coll`] – collection wrappers with `find_one_or_404`
//! - [`GridFs`] – file storage helpers with checksum ETags and
//!   conditional-GET handling
//! - [`Validated`] / [`ResponseRules`] – request/response schema validation
//!   with optional snake_case ↔ camelCase wire conversion
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use mangrove::prelude::*;
//!
//! async fn show_task(
//!     mongo: Mongo,
//!     IdPath(task_id): IdPath<Oid>,
//! ) -> MangroveResult<ExtJson<Document>> {
//!     let task = mongo
//!         .documents("tasks")?
//!         .find_one_or_404(doc! {"_id": task_id})
//!         .await?;
//!     Ok(ExtJson(task))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = MongoSettings::from_env()?;
//!     let parts = mangrove::init(&settings).await?;
//!
//!     let app = Router::new()
//!         .route("/tasks/:task_id", get(show_task))
//!         .with_state(parts.mongo.clone());
//!
//!     // Connect from the startup path, before serving any request.
//!     parts.mongo.connect()?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

// Re-export the collaborator crates for convenience.
pub use bson;
pub use mongodb;

// Shared types
pub use mangrove_core::{
    ErrorCategory, ErrorEnvelope, JsonMode, JsonSettings, MangroveError, MangroveResult,
    MongoSettings,
};

// Identifier converter and JSON codec
pub use mangrove_bson::{ExtJson, IdPath, IdPathRejection, JsonCodec, Oid};

// Connection, wrappers, and file storage
pub use mangrove_client::{
    collection, Coll, FileResponse, GridFs, Mongo, MongoConfig, SaveOptions, SendOptions,
};

// Schema validation pipeline
pub use mangrove_schema::{
    casing, ResponseRules, SchemaConfig, Validated, ValidatedForm, ValidateResponse,
};

/// The components built from one [`MongoSettings`], honoring its enable
/// flags.
///
/// `codec` and `schema` are `None` when the corresponding flag is off.
/// The identifier converter needs no installation step in axum (routes
/// opt in by using [`IdPath`]), so its flag is carried on the settings
/// only.
#[derive(Debug, Clone)]
pub struct MongoParts {
    /// Connection handle; unconfigured until [`Mongo::connect`].
    pub mongo: Mongo,
    /// Extended-JSON codec in the configured mode.
    pub codec: Option<JsonCodec>,
    /// Validation pipeline configuration.
    pub schema: Option<SchemaConfig>,
}

/// Resolves the connection and builds the enabled components in one call.
///
/// No network connection is made here; call [`Mongo::connect`] on the
/// returned handle from the application's startup path.
///
/// # Errors
///
/// Returns a configuration error when the settings are invalid or no URI
/// is available.
pub async fn init(settings: &MongoSettings) -> MangroveResult<MongoParts> {
    settings.validate()?;
    let mongo = Mongo::resolve(settings, None).await?;
    Ok(MongoParts {
        mongo,
        codec: settings
            .json_provider
            .then(|| JsonCodec::from_settings(settings)),
        schema: settings
            .schema
            .then(|| SchemaConfig::from_settings(settings)),
    })
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use mangrove::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{init, MongoParts};

    pub use mangrove_core::{JsonMode, MangroveError, MangroveResult, MongoSettings};

    pub use mangrove_bson::{ExtJson, IdPath, JsonCodec, Oid};

    pub use mangrove_client::{
        collection, Coll, GridFs, Mongo, MongoConfig, SaveOptions, SendOptions,
    };

    pub use mangrove_schema::{
        ResponseRules, SchemaConfig, Validated, ValidatedForm, ValidateResponse,
    };

    pub use bson::{doc, Bson, DateTime, Document};
}
