//! Extended-JSON codec.
//!
//! [`JsonCodec`] turns response values into JSON that can carry
//! database-native scalars (identifiers, dates, binary, regular
//! expressions) and decodes such JSON back, using the driver's
//! extended-JSON machinery. The encoding mode comes from application
//! settings and is threaded explicitly; nothing is looked up ambiently.
//!
//! Encoding goes value → BSON → extended JSON, so any `Serialize` type is
//! covered by one path: plain types render as plain JSON, native scalars
//! as their extended-JSON forms. Decoding is the strict inverse.

use bson::Bson;
use mangrove_core::{JsonMode, MangroveError, MangroveResult, MongoSettings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encoder/decoder for extended JSON.
///
/// # Example
///
/// ```
/// use bson::oid::ObjectId;
/// use mangrove_bson::JsonCodec;
/// use serde_json::json;
///
/// let codec = JsonCodec::default();
/// let id = ObjectId::parse_str("5cf29abb5167a14c9e6e12c4").unwrap();
///
/// let encoded = codec.encode(&id).unwrap();
/// assert_eq!(encoded, json!({"$oid": "5cf29abb5167a14c9e6e12c4"}));
///
/// let decoded: ObjectId = codec.decode(encoded).unwrap();
/// assert_eq!(decoded, id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonCodec {
    mode: JsonMode,
}

impl JsonCodec {
    /// Creates a codec with the given encoding mode.
    #[must_use]
    pub fn new(mode: JsonMode) -> Self {
        Self { mode }
    }

    /// Builds the codec configured by the application settings.
    #[must_use]
    pub fn from_settings(settings: &MongoSettings) -> Self {
        Self::new(settings.json.mode)
    }

    /// Returns the encoding mode.
    #[must_use]
    pub fn mode(&self) -> JsonMode {
        self.mode
    }

    /// Renders a BSON value as extended JSON.
    #[must_use]
    pub fn encode_bson(&self, value: Bson) -> Value {
        match self.mode {
            JsonMode::Relaxed => value.into_relaxed_extjson(),
            JsonMode::Canonical => value.into_canonical_extjson(),
        }
    }

    /// Serializes any value into an extended-JSON [`Value`].
    ///
    /// # Errors
    ///
    /// Returns a response-contract error when the value cannot be
    /// represented as BSON (a handler bug, surfaced as HTTP 500).
    pub fn encode<T: Serialize>(&self, value: &T) -> MangroveResult<Value> {
        let bson = bson::to_bson(value).map_err(|e| {
            MangroveError::response_contract(format!("value is not BSON-serializable: {e}"))
        })?;
        Ok(self.encode_bson(bson))
    }

    /// Parses an extended-JSON value back into BSON.
    ///
    /// Both relaxed and canonical representations are accepted.
    ///
    /// # Errors
    ///
    /// Returns a request-validation error on extended-JSON that does not
    /// parse (surfaced as HTTP 400 on the request path).
    pub fn decode_bson(&self, value: Value) -> MangroveResult<Bson> {
        Bson::try_from(value).map_err(|e| {
            MangroveError::request_validation(format!("invalid extended JSON: {e}"))
        })
    }

    /// Deserializes an extended-JSON value into `T`.
    ///
    /// # Errors
    ///
    /// Returns a request-validation error when the JSON does not parse as
    /// extended JSON or does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self, value: Value) -> MangroveResult<T> {
        let bson = self.decode_bson(value)?;
        bson::from_bson(bson)
            .map_err(|e| MangroveError::request_validation(e.to_string()))
    }

    /// Deserializes `T` from raw extended-JSON text.
    ///
    /// # Errors
    ///
    /// Returns a request-validation error on malformed JSON or a value
    /// that does not match `T`.
    pub fn decode_slice<T: DeserializeOwned>(&self, raw: &[u8]) -> MangroveResult<T> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| MangroveError::request_validation(e.to_string()))?;
        self.decode(value)
    }
}
