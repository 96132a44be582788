//! Middleware for the development auth server

mod request_log;

pub use request_log::request_tracing;
