//! Deferred connection setup.
//!
//! [`Mongo`] is a two-state machine: **unconfigured** after
//! [`Mongo::resolve`], **connected** after [`Mongo::connect`]. The client
//! is constructed in `connect`, which applications invoke from their
//! startup hook just before serving, not at configuration time. The host
//! framework guarantees startup hooks complete before any request is
//! dispatched; this type relies on that ordering rather than re-enforcing
//! it per request.
//!
//! `connect` is idempotent by design: the transition happens exactly once
//! per application lifetime, and the default database handle is created in
//! the same step, never per-request.

use std::fmt;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use bson::Document;
use http::request::Parts;
use mangrove_core::{MangroveError, MangroveResult, MongoSettings};
use mongodb::{Client, Database};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use crate::{collection, Coll, GridFs, MongoConfig};

/// Handle to the MongoDB connection for one application.
///
/// Cloning is cheap; all clones share the same connection state.
///
/// # Example
///
/// ```rust,no_run
/// use mangrove_client::Mongo;
/// use mangrove_core::MongoSettings;
///
/// # async fn run() -> mangrove_core::MangroveResult<()> {
/// let settings = MongoSettings::from_env()?;
/// let mongo = Mongo::resolve(&settings, None).await?;
///
/// // ... build the router, then, from the startup path:
/// mongo.connect()?;
/// let tasks = mongo.documents("tasks")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Mongo {
    inner: Arc<Inner>,
}

struct Inner {
    config: MongoConfig,
    state: RwLock<State>,
}

enum State {
    Unconfigured,
    Connected {
        client: Client,
        db: Option<Database>,
    },
}

impl fmt::Debug for Mongo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mongo")
            .field("database", &self.inner.config.database())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Mongo {
    /// Resolves the connection configuration (see [`MongoConfig::resolve`]).
    ///
    /// No client is constructed yet; the handle starts unconfigured.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no URI is available or the URI
    /// does not parse.
    pub async fn resolve(settings: &MongoSettings, uri: Option<&str>) -> MangroveResult<Self> {
        let config = MongoConfig::resolve(settings, uri).await?;
        Ok(Self::from_config(config))
    }

    /// Creates an unconfigured handle from an already-resolved configuration.
    #[must_use]
    pub fn from_config(config: MongoConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: RwLock::new(State::Unconfigured),
            }),
        }
    }

    /// Returns the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &MongoConfig {
        &self.inner.config
    }

    /// Constructs the client and, when the URI named one, the default
    /// database handle.
    ///
    /// Call this from the application's startup hook. Calling it again is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns a driver error when the client cannot be constructed from
    /// the resolved options.
    pub fn connect(&self) -> MangroveResult<()> {
        let mut state = self.inner.state.write();
        if matches!(*state, State::Connected { .. }) {
            return Ok(());
        }

        let client = Client::with_options(self.inner.config.client_options())?;
        let db = self
            .inner
            .config
            .database()
            .map(|name| client.database(name));

        tracing::info!(
            database = self.inner.config.database(),
            "MongoDB client connected"
        );

        *state = State::Connected { client, db };
        Ok(())
    }

    /// Returns whether [`connect`](Self::connect) has run.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.inner.state.read(), State::Connected { .. })
    }

    /// Returns the connected client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before [`connect`](Self::connect).
    pub fn client(&self) -> MangroveResult<Client> {
        match &*self.inner.state.read() {
            State::Connected { client, .. } => Ok(client.clone()),
            State::Unconfigured => Err(not_connected()),
        }
    }

    /// Returns the default database handle.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before [`connect`](Self::connect), or
    /// when the URI carried no database segment and no manual override has
    /// been set.
    pub fn db(&self) -> MangroveResult<Database> {
        match &*self.inner.state.read() {
            State::Connected { db: Some(db), .. } => Ok(db.clone()),
            State::Connected { db: None, .. } => Err(MangroveError::config(
                "the connection URI did not name a database; call set_default_database() first",
            )),
            State::Unconfigured => Err(not_connected()),
        }
    }

    /// Manually selects the default database.
    ///
    /// Intended for URIs without a database segment; the resolved
    /// configuration itself stays immutable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before [`connect`](Self::connect).
    pub fn set_default_database(&self, name: &str) -> MangroveResult<()> {
        let mut state = self.inner.state.write();
        match &mut *state {
            State::Connected { client, db } => {
                *db = Some(client.database(name));
                Ok(())
            }
            State::Unconfigured => Err(not_connected()),
        }
    }

    /// Returns a wrapped typed collection from the default database.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no default database is available.
    pub fn collection<T>(&self, name: &str) -> MangroveResult<Coll<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        Ok(collection(&self.db()?, name))
    }

    /// Returns a wrapped raw-document collection from the default database.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no default database is available.
    pub fn documents(&self, name: &str) -> MangroveResult<Coll<Document>> {
        self.collection(name)
    }

    /// Returns the GridFS helper for the default bucket (`"fs"`).
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no default database is available.
    pub fn gridfs(&self) -> MangroveResult<GridFs> {
        self.gridfs_bucket(GridFs::DEFAULT_BUCKET)
    }

    /// Returns the GridFS helper for the named bucket.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no default database is available.
    pub fn gridfs_bucket(&self, base: &str) -> MangroveResult<GridFs> {
        Ok(GridFs::new(&self.db()?, base))
    }
}

fn not_connected() -> MangroveError {
    MangroveError::config(
        "MongoDB client is not connected; call connect() from the application's startup hook",
    )
}

// Handlers take `Mongo` directly wherever the app state carries one.
#[async_trait]
impl<S> FromRequestParts<S> for Mongo
where
    Self: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}
