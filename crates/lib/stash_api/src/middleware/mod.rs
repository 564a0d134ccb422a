//! Middleware for the HTTP API.

pub mod auth;
