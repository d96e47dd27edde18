//! Connection configuration.
//!
//! [`MongoConfig`] is resolved once, before the application starts serving.
//! It parses the connection URI through the driver and fixes the default
//! database name at that point; the name is never re-derived afterwards.

use mangrove_core::{MangroveError, MangroveResult, MongoSettings};
use mongodb::options::ClientOptions;

/// Resolved connection configuration.
///
/// Immutable after creation. Constructed by [`MongoConfig::resolve`], which
/// takes the URI from its explicit argument or, failing that, from the
/// application settings.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    uri: String,
    database: Option<String>,
    options: ClientOptions,
}

impl MongoConfig {
    /// Resolves the configuration from settings and an optional URI override.
    ///
    /// The URI is parsed by the driver's connection-string machinery; the
    /// database name is taken from the URI's default-database segment, if
    /// present, exactly once.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no URI is supplied either way, or
    /// when the URI does not parse.
    pub async fn resolve(settings: &MongoSettings, uri: Option<&str>) -> MangroveResult<Self> {
        let uri = match uri {
            Some(uri) => uri.to_string(),
            None => settings.uri.clone().ok_or_else(|| {
                MangroveError::config(
                    "no MongoDB URI: pass one explicitly or set `uri` in the settings",
                )
            })?,
        };

        let options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| MangroveError::config(format!("invalid MongoDB URI: {e}")))?;
        let database = options.default_database.clone();

        Ok(Self {
            uri,
            database,
            options,
        })
    }

    /// Returns the connection URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the database name carried by the URI, if any.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns the parsed client options for constructing the client.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        self.options.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_with_database_segment() {
        let config = MongoConfig::resolve(
            &MongoSettings::default(),
            Some("mongodb://localhost:27017/appdb"),
        )
        .await
        .unwrap();
        assert_eq!(config.database(), Some("appdb"));
        assert_eq!(config.uri(), "mongodb://localhost:27017/appdb");
    }

    #[tokio::test]
    async fn test_resolve_without_database_segment() {
        let config = MongoConfig::resolve(
            &MongoSettings::default(),
            Some("mongodb://localhost:27017"),
        )
        .await
        .unwrap();
        assert_eq!(config.database(), None);
    }

    #[tokio::test]
    async fn test_resolve_uri_from_settings() {
        let settings = MongoSettings {
            uri: Some("mongodb://localhost:27017/fromsettings".to_string()),
            ..MongoSettings::default()
        };
        let config = MongoConfig::resolve(&settings, None).await.unwrap();
        assert_eq!(config.database(), Some("fromsettings"));
    }

    #[tokio::test]
    async fn test_explicit_uri_wins_over_settings() {
        let settings = MongoSettings {
            uri: Some("mongodb://localhost:27017/fromsettings".to_string()),
            ..MongoSettings::default()
        };
        let config = MongoConfig::resolve(&settings, Some("mongodb://localhost:27017/explicit"))
            .await
            .unwrap();
        assert_eq!(config.database(), Some("explicit"));
    }

    #[tokio::test]
    async fn test_resolve_without_any_uri_fails() {
        let err = MongoConfig::resolve(&MongoSettings::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.category(), mangrove_core::ErrorCategory::Config);
        assert!(err.to_string().contains("no MongoDB URI"));
    }

    #[tokio::test]
    async fn test_resolve_rejects_unparseable_uri() {
        let err = MongoConfig::resolve(&MongoSettings::default(), Some("mongodb://"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), mangrove_core::ErrorCategory::Config);
    }
}
