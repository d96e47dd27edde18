//! Integration settings.
//!
//! [`MongoSettings`] collects the configuration keys this layer consumes
//! from the host application: the connection URI, the enable flags for the
//! individual components, the wire-casing flag, and the JSON encoding mode.
//!
//! Settings are plain serde types so applications can embed them in their
//! own configuration files; [`MongoSettings::from_env`] offers a
//! `MONGO_*` environment loader for twelve-factor deployments.
//!
//! Components never look these values up ambiently. The settings struct is
//! read once at wiring time and the relevant pieces are handed to each
//! component explicitly.

use serde::{Deserialize, Serialize};

use crate::{MangroveError, MangroveResult};

/// Extended-JSON representation mode.
///
/// Relaxed extended JSON renders numbers and dates in their natural JSON
/// shapes where possible; canonical extended JSON is fully type-preserving
/// at the cost of wrapper objects (`{"$numberLong": "5"}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonMode {
    /// Relaxed extended JSON (the documented default).
    #[default]
    Relaxed,
    /// Canonical extended JSON.
    Canonical,
}

/// JSON codec settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonSettings {
    /// Encoding mode for database-native values.
    pub mode: JsonMode,
}

/// Configuration keys consumed from the host application.
///
/// # Example
///
/// ```
/// use mangrove_core::{JsonMode, MongoSettings};
///
/// let settings: MongoSettings = toml::from_str(
///     r#"
///     uri = "mongodb://localhost:27017/appdb"
///     convert_casing = true
///
///     [json]
///     mode = "canonical"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(settings.json.mode, JsonMode::Canonical);
/// assert!(settings.convert_casing);
/// assert!(settings.schema);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MongoSettings {
    /// MongoDB connection URI. Resolution fails without one.
    pub uri: Option<String>,

    /// Install the identifier path converter.
    pub id_converter: bool,

    /// Install the extended-JSON codec.
    pub json_provider: bool,

    /// Enable the schema validation pipeline.
    pub schema: bool,

    /// Convert between camelCase wire keys and snake_case model fields.
    pub convert_casing: bool,

    /// JSON codec settings.
    pub json: JsonSettings,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: None,
            id_converter: true,
            json_provider: true,
            schema: true,
            convert_casing: false,
            json: JsonSettings::default(),
        }
    }
}

impl MongoSettings {
    /// Loads settings from `MONGO_*` environment variables.
    ///
    /// Recognized variables: `MONGO_URI`, `MONGO_ID_CONVERTER`,
    /// `MONGO_JSON_PROVIDER`, `MONGO_SCHEMA`, `MONGO_CONVERT_CASING`,
    /// `MONGO_JSON_MODE`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable is present but cannot be
    /// parsed (booleans accept `1/0`, `true/false`, `yes/no`, `on/off`).
    pub fn from_env() -> MangroveResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    ///
    /// This is the injectable core of [`from_env`](Self::from_env), used
    /// directly in tests and by applications that source variables from
    /// something other than the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a present value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MangroveResult<Self> {
        let mut settings = Self::default();

        if let Some(uri) = lookup("MONGO_URI") {
            settings.uri = Some(uri);
        }
        if let Some(raw) = lookup("MONGO_ID_CONVERTER") {
            settings.id_converter = parse_bool("MONGO_ID_CONVERTER", &raw)?;
        }
        if let Some(raw) = lookup("MONGO_JSON_PROVIDER") {
            settings.json_provider = parse_bool("MONGO_JSON_PROVIDER", &raw)?;
        }
        if let Some(raw) = lookup("MONGO_SCHEMA") {
            settings.schema = parse_bool("MONGO_SCHEMA", &raw)?;
        }
        if let Some(raw) = lookup("MONGO_CONVERT_CASING") {
            settings.convert_casing = parse_bool("MONGO_CONVERT_CASING", &raw)?;
        }
        if let Some(raw) = lookup("MONGO_JSON_MODE") {
            settings.json.mode = match raw.to_ascii_lowercase().as_str() {
                "relaxed" => JsonMode::Relaxed,
                "canonical" => JsonMode::Canonical,
                other => {
                    return Err(MangroveError::config(format!(
                        "MONGO_JSON_MODE must be 'relaxed' or 'canonical', got '{other}'"
                    )))
                }
            };
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on malformed TOML, unknown keys, or
    /// values that fail [`validate`](Self::validate).
    pub fn from_toml_str(raw: &str) -> MangroveResult<Self> {
        let settings: Self = toml::from_str(raw)
            .map_err(|e| MangroveError::config(format!("invalid settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URI is present but does not use
    /// a MongoDB scheme.
    pub fn validate(&self) -> MangroveResult<()> {
        if let Some(uri) = &self.uri {
            if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
                return Err(MangroveError::config(format!(
                    "uri must use the mongodb:// or mongodb+srv:// scheme, got '{uri}'"
                )));
            }
        }
        Ok(())
    }
}

fn parse_bool(var: &str, raw: &str) -> MangroveResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MangroveError::config(format!(
            "{var} must be a boolean, got '{other}'"
        ))),
    }
}
