//! gcts-client - A Rust client for the gCTS Git-transport management service
//!
//! gCTS exposes server-side, Git-backed repository mirrors over HTTP/JSON.
//! This crate lets a caller create, inspect, configure, branch, commit to,
//! and synchronize such a repository, and manage system-wide and per-user
//! VCS configuration and credentials.
//!
//! # Architecture
//!
//! The codebase is split into two layers:
//!
//! - [`rest`] - Transport contract ([`rest::Connection`]), the wire model
//!   ([`rest::Request`] / [`rest::Response`]), a reqwest-backed
//!   implementation, and a scripted mock for tests
//! - [`gcts`] - The domain layer: the [`gcts::Repository`] resource with
//!   its cached remote snapshot, the configuration merge engine, the
//!   error-classification pipeline, the simple-operations facade, and
//!   scoped temporary-state helpers
//!
//! # Correctness invariants
//!
//! 1. A `Repository` owns an optional cached snapshot of server data;
//!    every operation that can change server state wipes it
//! 2. HTTP failures are classified into typed errors at the point they
//!    are first observed, never deeper in the call stack
//! 3. Local precondition violations fail before any network call
//! 4. The configuration view preserves first-occurrence key order

pub mod gcts;
pub mod rest;
