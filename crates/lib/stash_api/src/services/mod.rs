//! Business services behind the request handlers.

pub mod auth;
pub mod cookies;
