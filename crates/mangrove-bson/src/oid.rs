//! The wire-facing document identifier type.
//!
//! [`Oid`] wraps the driver's `ObjectId` and pins down its external form:
//! a 24-character hex string in URLs and form fields, the extended-JSON
//! `{"$oid": "..."}` object in JSON bodies, and a native `ObjectId` when
//! serialized to BSON for storage.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use bson::oid::ObjectId;
use bson::Bson;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A MongoDB document identifier.
///
/// `Oid` is a thin newtype over [`ObjectId`]. Parsing from text fails on
/// anything that is not a structurally valid 24-hex-character identifier;
/// formatting never fails.
///
/// # Example
///
/// ```
/// use mangrove_bson::Oid;
///
/// let oid: Oid = "5cf29abb5167a14c9e6e12c4".parse().unwrap();
/// assert_eq!(oid.to_string(), "5cf29abb5167a14c9e6e12c4");
///
/// assert!("tasks".parse::<Oid>().is_err());
/// assert!("5cf29abb5167a14c9e6e12cg".parse::<Oid>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Oid(pub ObjectId);

impl Oid {
    /// Generates a new unique identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Consumes the wrapper and returns the inner [`ObjectId`].
    #[must_use]
    pub fn into_inner(self) -> ObjectId {
        self.0
    }
}

impl Default for Oid {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Oid {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for Oid {
    type Err = bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s).map(Self)
    }
}

impl From<ObjectId> for Oid {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<Oid> for ObjectId {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl From<Oid> for Bson {
    fn from(oid: Oid) -> Self {
        Bson::ObjectId(oid.0)
    }
}

// Serialization delegates to ObjectId so that documents persisted through
// the driver store a native ObjectId, while serde_json produces the
// extended-JSON {"$oid": "..."} object.
impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OidVisitor)
    }
}

struct OidVisitor;

impl<'de> Visitor<'de> for OidVisitor {
    type Value = Oid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 24-character hex string or an extended-JSON $oid object")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        ObjectId::parse_str(value).map(Oid).map_err(E::custom)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut oid = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "$oid" {
                let hex: String = map.next_value()?;
                oid = Some(ObjectId::parse_str(&hex).map_err(de::Error::custom)?);
            } else {
                return Err(de::Error::unknown_field(&key, &["$oid"]));
            }
        }
        oid.map(Oid)
            .ok_or_else(|| de::Error::missing_field("$oid"))
    }
}
