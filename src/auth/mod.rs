//! Wallet sign-in for Erebrus
//!
//! Challenge-response authentication driven from the client side:
//! - Challenge client for the challenge and token endpoints
//! - State machine reacting to wallet address changes and sign-in requests
//! - Navigation control projection

mod client;
mod machine;
mod nav;

pub use client::{parse_challenge, parse_token, ChallengeApi, HttpChallengeClient};
pub use machine::{AuthMachine, AuthSnapshot, AuthState, ChallengeTicket, SignInOutcome};
pub use nav::{AuthControl, NavControls};
