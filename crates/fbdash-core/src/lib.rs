//! Core FBDASH library (session, query cache, API gateway, config).

pub mod api;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod nav;
pub mod session;
