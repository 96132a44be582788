//! Erebrus wallet sign-in
//!
//! Client side of the wallet challenge-response sign-in, plus a small
//! development server implementing the same contract.

pub mod auth;
pub mod config;
pub mod devserver;
pub mod error;
pub mod middleware;
pub mod models;
pub mod session;
pub mod wallet;
