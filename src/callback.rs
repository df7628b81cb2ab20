// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Callback delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::request::{Callback, CallbackPayload};

/// Placeholders recognised in callback URL templates, as `{{name}}`.
pub const CALLBACK_PARAMS: [&str; 9] = ["bn", "ex", "rbn", "req", "rid", "sa", "sig", "sp", "tx"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid callback URL: {0}")]
    InvalidUrl(String),

    #[error("Callback request failed: {0}")]
    Request(String),

    #[error("Callback returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Replace every `{{param}}` whose field is present in `payload`.
/// Placeholders for absent fields are left as they are.
pub fn substitute_placeholders(template: &str, payload: &CallbackPayload) -> String {
    CALLBACK_PARAMS
        .iter()
        .fold(template.to_string(), |url, param| match payload.field(param) {
            Some(value) => url.replace(&format!("{{{{{param}}}}}"), value),
            None => url,
        })
}

#[async_trait]
pub trait CallbackDelivery: Send + Sync {
    async fn deliver(&self, callback: &Callback) -> Result<(), DeliveryError>;
}

/// POSTs the payload as JSON to the substituted URL. One attempt, no retry.
#[derive(Debug, Clone)]
pub struct CallbackDispatcher {
    http: Client,
}

impl CallbackDispatcher {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CallbackDelivery for CallbackDispatcher {
    async fn deliver(&self, callback: &Callback) -> Result<(), DeliveryError> {
        let url = substitute_placeholders(&callback.url, &callback.payload);
        let parsed: url::Url = url
            .parse()
            .map_err(|e: url::ParseError| DeliveryError::InvalidUrl(format!("{url}: {e}")))?;

        let response = self
            .http
            .post(parsed)
            .json(&callback.payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, background = callback.background, "callback rejected");
            return Err(DeliveryError::Status { status, body });
        }

        info!(tx_id = %callback.payload.tx, "callback delivered");
        Ok(())
    }
}
