//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Nothing database-internal (password hashes, raw `_id` documents) leaks
//!   into a response.

pub mod admin;
pub mod event;
pub mod id;
pub mod member;
pub mod results;
pub mod vote;
