// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use relational_signing_agent::callback::CallbackDispatcher;
use relational_signing_agent::chain::ChainClient;
use relational_signing_agent::codec::CodecAdapter;
use relational_signing_agent::config::{AgentConfig, SECRET_STORE_SCOPE};
use relational_signing_agent::identity::Identity;
use relational_signing_agent::logging;
use relational_signing_agent::orchestrator::SigningOrchestrator;
use relational_signing_agent::request::RequestResolver;
use relational_signing_agent::session::{RedbSecretStore, SessionStore};
use relational_signing_agent::signer::Signer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    logging::init(config.log_format);

    let identity = Identity::new(config.signer_account, config.signer_key.clone())
        .expect("Failed to derive signer public key");
    let chain = ChainClient::new(&config.chain_rpc_url, config.http_timeout)
        .expect("Failed to create chain client");
    info!(
        account = %identity.account(),
        public_key = %identity.public_key(),
        rpc = %chain.rpc_url(),
        "Relational signing agent starting"
    );

    let resolver = RequestResolver::new(Arc::new(chain), CodecAdapter::default())
        .with_expire_seconds(config.expire_seconds);
    let signer = Signer::from_identity(&identity)
        .expect("Failed to load signing key")
        .with_link_name(config.link_name.clone());
    let dispatcher =
        CallbackDispatcher::new(config.http_timeout).expect("Failed to create callback client");

    std::fs::create_dir_all(&config.data_dir).expect("Failed to create data directory");
    let store = RedbSecretStore::open(&config.secret_store_path(), SECRET_STORE_SCOPE)
        .expect("Failed to open secret store");

    let orchestrator = SigningOrchestrator::new(
        config.orchestrator.clone(),
        identity,
        resolver,
        signer,
        Arc::new(dispatcher),
        SessionStore::new(Arc::new(store)),
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
            shutdown.cancel();
        });
    }

    if let Some(mut inbound) = orchestrator.take_inbound_messages() {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = inbound.recv() => match message {
                        Some(message) => info!(
                            from = %message.from,
                            nonce = message.nonce,
                            ciphertext_len = message.ciphertext.len(),
                            "Sealed message received"
                        ),
                        None => break,
                    },
                    _ = shutdown.cancelled() => break,
                }
            }
        });
    }

    match orchestrator.initialize().await {
        Ok(Some(channel)) => info!(channel = %channel, "Session restored"),
        Ok(None) => {}
        Err(e) => warn!(kind = e.kind(), error = %e, "Session restore failed"),
    }

    // One request URI per line
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let uri = line.trim();
                    if !uri.is_empty() {
                        orchestrator.handle_incoming_request(uri);
                    }
                }
                Ok(None) => {
                    info!("Input closed, listening until shutdown");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    stdin_open = false;
                }
            },
        }
    }

    info!("Relational signing agent stopped");
}
