//! Which sign-in control the navigation bar shows

use super::machine::{AuthSnapshot, AuthState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthControl {
    /// No wallet connected
    ConnectWallet,
    /// Wallet connected, not signed in
    SignIn,
    /// Sign-in in progress
    Pending,
    /// Signed in; shows the account widget
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavControls {
    pub auth: AuthControl,
    pub show_switch_network: bool,
}

impl NavControls {
    pub fn from_snapshot(snapshot: &AuthSnapshot, network_mismatched: bool) -> Self {
        let auth = match (&snapshot.address, snapshot.state) {
            (None, _) => AuthControl::ConnectWallet,
            (Some(_), AuthState::SignedIn) => AuthControl::Account,
            (Some(_), AuthState::Signing | AuthState::Verifying) => AuthControl::Pending,
            (Some(_), AuthState::SignedOut | AuthState::AwaitingChallenge) => AuthControl::SignIn,
        };

        Self {
            auth,
            show_switch_network: network_mismatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WalletAddress;

    fn snapshot(address: Option<&str>, state: AuthState) -> AuthSnapshot {
        AuthSnapshot {
            state,
            address: address.map(WalletAddress::from),
            has_challenge: false,
        }
    }

    #[test]
    fn test_controls_per_state() {
        let cases = [
            (None, AuthState::SignedOut, AuthControl::ConnectWallet),
            (Some("0xA1"), AuthState::SignedOut, AuthControl::SignIn),
            (Some("0xA1"), AuthState::AwaitingChallenge, AuthControl::SignIn),
            (Some("0xA1"), AuthState::Signing, AuthControl::Pending),
            (Some("0xA1"), AuthState::Verifying, AuthControl::Pending),
            (Some("0xA1"), AuthState::SignedIn, AuthControl::Account),
        ];

        for (address, state, expected) in cases {
            let controls = NavControls::from_snapshot(&snapshot(address, state), false);
            assert_eq!(controls.auth, expected, "state {:?}", state);
        }
    }

    #[test]
    fn test_switch_network_visibility() {
        let controls =
            NavControls::from_snapshot(&snapshot(Some("0xA1"), AuthState::SignedIn), true);
        assert!(controls.show_switch_network);
        assert_eq!(controls.auth, AuthControl::Account);
    }
}
