//! HTTP integration tests.
//!
//! Starts the router over the in-memory store and exercises it with reqwest.

mod support;

mod auth;
