//! Erebrus sign-in tool
//!
//! `serve` runs the development auth server; `sign-in` connects a local
//! wallet and runs one sign-in against `AUTH_API_URL`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use ed25519_dalek::SigningKey;
use tokio::signal;

use erebrus_auth::auth::{AuthMachine, HttpChallengeClient, NavControls, SignInOutcome};
use erebrus_auth::config::Config;
use erebrus_auth::devserver::{self, DevServerSettings, DevServerState};
use erebrus_auth::session::SessionStore;
use erebrus_auth::wallet::{LocalWallet, NetworkGuard, Wallet};

const USAGE: &str = "usage: erebrus-auth [serve|sign-in]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::debug!(environment = config.environment.as_str(), "Configuration loaded");

    let mode = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    match mode.as_str() {
        "serve" => run_server(config).await,
        "sign-in" => run_sign_in(config).await,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Dev auth server listening on {}", addr);
    tracing::info!("Challenge endpoint at http://{}/{}", addr, config.challenge_path);
    tracing::info!("Token endpoint at http://{}/{}", addr, config.token_path);

    let state = DevServerState::new(DevServerSettings::from_config(&config));
    devserver::serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn run_sign_in(config: Config) -> anyhow::Result<()> {
    let wallet = Arc::new(match &config.local_wallet_key {
        Some(seed) => LocalWallet::new(parse_seed(seed)?, config.required_chain_id),
        None => LocalWallet::generate(config.required_chain_id),
    });
    wallet.connect();

    let guard = NetworkGuard::new(config.required_chain_id);
    if guard.is_mismatched(wallet.as_ref()) {
        guard.switch(wallet.as_ref()).await?;
    }

    let api = Arc::new(HttpChallengeClient::from_config(&config)?);
    let store = SessionStore::from_config(&config);
    let machine = AuthMachine::new(api, wallet.clone(), store);

    machine.on_address_changed(wallet.address()).await;

    match machine.sign_in().await {
        SignInOutcome::SignedIn(token) => println!("signed in, token {}", token.fingerprint()),
        SignInOutcome::AlreadySignedIn => println!("already signed in"),
        SignInOutcome::NoWallet => println!("no wallet connected"),
        SignInOutcome::Superseded => println!("sign-in superseded"),
        SignInOutcome::Failed(e) => println!("sign-in failed [{}]: {}", e.error_code(), e),
    }

    let snapshot = machine.snapshot().await;
    let controls = NavControls::from_snapshot(&snapshot, guard.is_mismatched(wallet.as_ref()));
    println!(
        "address {} state {} control {:?}",
        snapshot
            .address
            .as_ref()
            .map(|a| a.as_str())
            .unwrap_or("-"),
        snapshot.state.as_str(),
        controls.auth
    );
    Ok(())
}

fn parse_seed(seed: &str) -> anyhow::Result<SigningKey> {
    let bytes = hex::decode(seed.trim_start_matches("0x")).context("LOCAL_WALLET_KEY is not hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("LOCAL_WALLET_KEY must be 32 bytes"))?;
    Ok(SigningKey::from_bytes(&bytes))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
