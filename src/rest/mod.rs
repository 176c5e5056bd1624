//! rest
//!
//! Transport layer: the [`Connection`] contract every gCTS operation
//! runs through, the wire model, a reqwest-backed implementation, and a
//! scripted mock for deterministic tests.
//!
//! # Modules
//!
//! - `connection`: [`Connection`] trait, [`Request`]/[`Response`] model,
//!   [`HttpError`]
//! - `http`: [`RestConnection`], the reqwest implementation
//! - `mock`: [`MockConnection`] for tests

mod connection;
mod http;
mod mock;

pub use connection::{Connection, HttpError, Method, Request, Response};
pub use http::RestConnection;
pub use mock::MockConnection;
