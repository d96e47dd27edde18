//! # Mangrove BSON
//!
//! The wire-format side of the Mangrove MongoDB integration:
//!
//! | Type | Role |
//! |------|------|
//! | [`Oid`] | Document identifier with a fixed external form |
//! | [`IdPath<T>`] | Path extractor with the "404 on bad id" policy |
//! | [`JsonCodec`] | Extended-JSON encoder/decoder (relaxed or canonical) |
//! | [`ExtJson<T>`] | Request extractor / response body using the codec |
//!
//! The codec and the identifier type are pure and usable without axum;
//! the extractors plug into axum routes.

mod codec;
mod extjson;
mod oid;
mod path;

pub use codec::JsonCodec;
pub use extjson::ExtJson;
pub use oid::Oid;
pub use path::{IdPath, IdPathRejection};
