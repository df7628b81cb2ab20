// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signing Orchestrator
//!
//! Owns the resolve, sign, deliver and save pipeline together with the one
//! active channel listener.
//!
//! ## Triggers
//!
//! [`SigningOrchestrator::handle_incoming_request`] never runs the pipeline
//! directly. Each call replaces the pending request and restarts its timer;
//! only the latest request survives the debounce window, and it then waits
//! a further settle delay before running. A request that becomes due while
//! another pipeline is running is dropped and reported.
//!
//! An async mutex keeps a single pipeline in flight. Runs started through
//! `process_request` wait for it rather than being dropped.
//!
//! ## Results
//!
//! Failures never reach the caller of the trigger. They are logged and
//! published as [`PipelineReport`]s on a broadcast channel.
//! [`SigningOrchestrator::process_request`] runs the pipeline immediately
//! and returns the typed result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::callback::CallbackDelivery;
use crate::channel::{channel_id_from_callback, ChannelConfig, ChannelListener, SealedMessage};
use crate::config::{DEFAULT_DEBOUNCE, DEFAULT_SETTLE};
use crate::error::AgentError;
use crate::identity::Identity;
use crate::request::{Callback, RequestResolver, ResolvedRequest};
use crate::session::{SessionRecord, SessionStore};
use crate::signer::Signer;

const INBOUND_CAPACITY: usize = 32;
const REPORT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Window in which repeated triggers collapse to the latest one.
    pub debounce: Duration,
    /// Extra delay after the debounce window before the pipeline starts.
    pub settle: Duration,
    /// Re-arm the channel listener with the freshly signed request's channel.
    pub rearm_after_sign: bool,
    pub channel: ChannelConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            settle: DEFAULT_SETTLE,
            rearm_after_sign: false,
            channel: ChannelConfig::default(),
        }
    }
}

/// Outcome of one completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSession {
    pub transaction_id: String,
    pub callback: Callback,
    pub record: SessionRecord,
    /// Set when the callback could not be delivered. The session is saved regardless.
    pub delivery_error: Option<AgentError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineReport {
    Completed(SignedSession),
    Failed { uri: String, error: AgentError },
    /// Became due while another pipeline was running.
    Dropped { uri: String },
}

#[derive(Default)]
struct PendingSlot {
    generation: u64,
    cancel: Option<CancellationToken>,
}

pub struct SigningOrchestrator {
    config: OrchestratorConfig,
    identity: Identity,
    resolver: RequestResolver,
    signer: Signer,
    dispatcher: Arc<dyn CallbackDelivery>,
    session: SessionStore,
    listener: Mutex<Option<ChannelListener>>,
    inbound_tx: mpsc::Sender<SealedMessage>,
    inbound_rx: Mutex<Option<mpsc::Receiver<SealedMessage>>>,
    pending: Mutex<PendingSlot>,
    /// Held for the whole of every pipeline run.
    in_flight: AsyncMutex<()>,
    reports: broadcast::Sender<PipelineReport>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SigningOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        identity: Identity,
        resolver: RequestResolver,
        signer: Signer,
        dispatcher: Arc<dyn CallbackDelivery>,
        session: SessionStore,
    ) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        Arc::new(Self {
            config,
            identity,
            resolver,
            signer,
            dispatcher,
            session,
            listener: Mutex::new(None),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            pending: Mutex::new(PendingSlot::default()),
            in_flight: AsyncMutex::new(()),
            reports,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Restore the saved session's channel listener. No signature is produced.
    ///
    /// Returns the armed channel id, or `None` when no session is saved.
    pub async fn initialize(&self) -> Result<Option<String>, AgentError> {
        let Some(record) = self.session.load().await? else {
            info!("No saved session");
            return Ok(None);
        };
        info!(actor = %record.actor, network = %record.network, "Restoring session");

        tokio::time::sleep(self.config.settle).await;
        let resolved = self
            .resolver
            .resolve(record.payload.as_str(), self.identity.authorization())
            .await?;
        let channel_id = self.arm_listener(&resolved.callback_url)?;
        Ok(Some(channel_id))
    }

    /// Schedule `uri` for signing. Returns immediately.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn handle_incoming_request(self: &Arc<Self>, uri: impl Into<String>) {
        let uri = uri.into();
        let (generation, cancel) = {
            let mut slot = lock(&self.pending);
            if let Some(previous) = slot.cancel.take() {
                previous.cancel();
                debug!("Superseded pending request");
            }
            slot.generation += 1;
            let cancel = CancellationToken::new();
            slot.cancel = Some(cancel.clone());
            (slot.generation, cancel)
        };

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_when_due(generation, cancel, uri).await });
    }

    async fn run_when_due(&self, generation: u64, cancel: CancellationToken, uri: String) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.debounce + self.config.settle) => {}
            _ = cancel.cancelled() => return,
        }
        {
            let mut slot = lock(&self.pending);
            if slot.generation != generation {
                return;
            }
            slot.cancel = None;
        }

        let Ok(_running) = self.in_flight.try_lock() else {
            warn!("Signing pipeline busy, dropping request");
            self.publish(PipelineReport::Dropped { uri });
            return;
        };

        let report = match self.run_pipeline(&uri).await {
            Ok(signed) => PipelineReport::Completed(signed),
            Err(error) => {
                warn!(kind = error.kind(), error = %error, "Signing pipeline failed");
                PipelineReport::Failed { uri, error }
            }
        };
        self.publish(report);
    }

    /// Resolve, sign, deliver and save `uri` without debouncing.
    ///
    /// Waits for any pipeline already in flight to finish first.
    pub async fn process_request(&self, uri: &str) -> Result<SignedSession, AgentError> {
        let _running = self.in_flight.lock().await;
        self.run_pipeline(uri).await
    }

    /// Caller must hold `in_flight`.
    async fn run_pipeline(&self, uri: &str) -> Result<SignedSession, AgentError> {
        let run_id = Uuid::new_v4();
        async {
            let ResolvedRequest {
                resolved,
                callback_url,
                abis,
            } = self
                .resolver
                .resolve(uri, self.identity.authorization())
                .await?;

            let callback = self.signer.sign(&resolved, &abis).await?;

            let delivery_error = match self.dispatcher.deliver(&callback).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(error = %e, "Callback delivery failed, saving session anyway");
                    Some(AgentError::from(e))
                }
            };

            let record = SessionRecord::from_signed(&resolved, &callback);
            self.session.save(&record).await?;

            if self.config.rearm_after_sign {
                if let Err(e) = self.arm_listener(&callback_url) {
                    warn!(error = %e, "Could not re-arm channel listener");
                }
            }

            let transaction_id = resolved.transaction_id().to_string();
            info!(tx_id = %transaction_id, "Signing request completed");
            Ok(SignedSession {
                transaction_id,
                callback,
                record,
                delivery_error,
            })
        }
        .instrument(info_span!("signing_pipeline", %run_id))
        .await
    }

    /// Replace the active listener with one on `callback_url`'s channel.
    fn arm_listener(&self, callback_url: &str) -> Result<String, AgentError> {
        let channel_id = channel_id_from_callback(callback_url)?;
        let listener =
            ChannelListener::spawn(&self.config.channel, &channel_id, self.inbound_tx.clone())?;

        // Dropping the previous handle stops its connection
        let previous = lock(&self.listener).replace(listener);
        if let Some(previous) = previous {
            debug!(channel = previous.channel_id(), "Replacing channel listener");
        }
        info!(channel = %channel_id, "Channel listener armed");
        Ok(channel_id)
    }

    pub fn active_channel_id(&self) -> Option<String> {
        lock(&self.listener)
            .as_ref()
            .map(|listener| listener.channel_id().to_string())
    }

    /// Messages received on any listener this orchestrator arms. Available once.
    pub fn take_inbound_messages(&self) -> Option<mpsc::Receiver<SealedMessage>> {
        lock(&self.inbound_rx).take()
    }

    pub fn subscribe_reports(&self) -> broadcast::Receiver<PipelineReport> {
        self.reports.subscribe()
    }

    fn publish(&self, report: PipelineReport) {
        // No subscribers is fine
        let _ = self.reports.send(report);
    }
}
