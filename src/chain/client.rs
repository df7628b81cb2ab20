// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! nodeos HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{BlockInfo, ChainClientError, ChainInfo, ChainOracle};
use crate::eosio::{AbiDef, Name};

#[derive(Debug, Deserialize)]
struct GetAbiResponse {
    #[serde(default)]
    abi: Option<AbiDef>,
}

#[derive(Debug, Clone)]
pub struct ChainClient {
    rpc_url: String,
    http: Client,
}

impl ChainClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, ChainClientError> {
        let parsed: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ChainClientError::InvalidRpcUrl(format!(
                "unsupported scheme `{}`",
                parsed.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainClientError::RpcError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ChainClientError> {
        debug!(path, "chain rpc call");
        let response = self
            .http
            .post(format!("{}{}", self.rpc_url, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainClientError::RpcError(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChainClientError::RpcError(format!(
                "POST {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ChainClientError::InvalidResponse(format!("POST {path} invalid JSON: {e}")))
    }
}

#[async_trait]
impl ChainOracle for ChainClient {
    async fn get_info(&self) -> Result<ChainInfo, ChainClientError> {
        self.call("/v1/chain/get_info", json!({})).await
    }

    async fn get_block(&self, block_num: u32) -> Result<BlockInfo, ChainClientError> {
        self.call(
            "/v1/chain/get_block",
            json!({ "block_num_or_id": block_num.to_string() }),
        )
        .await
    }

    async fn get_abi(&self, account: Name) -> Result<AbiDef, ChainClientError> {
        let response: GetAbiResponse = self
            .call("/v1/chain/get_abi", json!({ "account_name": account }))
            .await?;
        response.abi.ok_or(ChainClientError::AbiNotFound(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    const CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";

    async fn start_node() -> String {
        let app = Router::new()
            .route(
                "/v1/chain/get_info",
                post(|| async {
                    Json(json!({
                        "server_version": "abc",
                        "chain_id": CHAIN_ID,
                        "head_block_num": 100,
                        "head_block_time": "2020-01-01T00:00:00.000",
                        "last_irreversible_block_num": 90
                    }))
                }),
            )
            .route(
                "/v1/chain/get_block",
                post(|Json(body): Json<Value>| async move {
                    let num: u32 = body["block_num_or_id"].as_str().unwrap().parse().unwrap();
                    Json(json!({
                        "block_num": num,
                        "timestamp": "2020-01-01T00:00:00.000",
                        "ref_block_prefix": 12345,
                        "producer": "eosio"
                    }))
                }),
            )
            .route(
                "/v1/chain/get_abi",
                post(|Json(body): Json<Value>| async move {
                    if body["account_name"] == "eosio.token" {
                        Json(json!({ "account_name": "eosio.token", "abi": { "version": "eosio::abi/1.1" } }))
                    } else {
                        Json(json!({ "account_name": body["account_name"] }))
                    }
                }),
            )
            .route(
                "/v1/chain/broken",
                post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(url: &str) -> ChainClient {
        ChainClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetches_info_and_block() {
        let url = start_node().await;
        let client = client(&url);

        let info = client.get_info().await.unwrap();
        assert_eq!(info.head_block_num, 100);
        assert_eq!(info.chain_id.to_string(), CHAIN_ID);

        let block = client.get_block(info.head_block_num).await.unwrap();
        assert_eq!(block.block_num, 100);
        assert_eq!(block.ref_block_prefix, 12345);
    }

    #[tokio::test]
    async fn missing_abi_is_an_error() {
        let url = start_node().await;
        let client = client(&url);

        let abi = client.get_abi(Name::new("eosio.token").unwrap()).await.unwrap();
        assert_eq!(abi.version, "eosio::abi/1.1");

        let err = client.get_abi(Name::new("nobody").unwrap()).await.unwrap_err();
        assert!(matches!(err, ChainClientError::AbiNotFound(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_rpc_error() {
        let url = start_node().await;
        let err = client(&url)
            .call::<Value>("/v1/chain/broken", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainClientError::RpcError(msg) if msg.contains("500")));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(ChainClient::new("ftp://node", Duration::from_secs(1)).is_err());
        assert!(ChainClient::new("not a url", Duration::from_secs(1)).is_err());
    }
}
