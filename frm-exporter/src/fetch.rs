// FRM Exporter - FRM web server client
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP client for the FICSIT Remote Monitoring web server.
//!
//! Every FRM endpoint returns a JSON array; this module fetches and decodes
//! it. Failures stop here: collectors log them and skip the cycle.

use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client for one or more FRM web servers.
#[derive(Debug, Clone)]
pub struct FrmClient {
    client: reqwest::Client,
}

impl FrmClient {
    /// Create a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::ClientInit)?;
        Ok(Self { client })
    }

    /// Fetch `endpoint` from the FRM server at `address` and decode it.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        address: &str,
        endpoint: &str,
    ) -> Result<T, FetchError> {
        let url = endpoint_url(address, endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

/// Join a base address and an endpoint path.
pub fn endpoint_url(address: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        address.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Fetch errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
