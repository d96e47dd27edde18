//! # Mangrove Client
//!
//! The database-facing side of the Mangrove MongoDB integration:
//!
//! | Type | Role |
//! |------|------|
//! | [`MongoConfig`] | Resolved connection configuration (URI + database name) |
//! | [`Mongo`] | Deferred, once-per-application connection setup |
//! | [`Coll<T>`] | Collection wrapper with `find_one_or_404` |
//! | [`GridFs`] | GridFS save/send helpers with checksum-based caching |
//!
//! Configuration is resolved up front; the client itself is constructed by
//! [`Mongo::connect`] from the application's startup hook, so nothing
//! touches the network while the process is still being set up.

mod client;
mod config;
mod gridfs;
mod wrappers;

pub use client::Mongo;
pub use config::MongoConfig;
pub use gridfs::{FileResponse, GridFs, SaveOptions, SendOptions};
pub use wrappers::{collection, Coll};
