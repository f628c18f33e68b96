//! blobdb - A strict, checksum-verified chunked blob storage engine
//!
//! Splits binary payloads into ordered, bounded-size chunks persisted in a
//! relational store, tracked by a header carrying the declared length and a
//! CRC-32 checksum, and reassembles them losslessly on export.

pub mod blob;
pub mod observability;
pub mod store;
