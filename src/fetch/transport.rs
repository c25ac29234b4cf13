//! Transport collaborator
//!
//! The engine hands a `FetchRequest` to a transport and receives exactly one
//! `TransferResponse` once the body is fully on disk (or the attempt has
//! failed). The default implementation runs blocking ureq transfers on the
//! tokio blocking pool; `file://` URLs are served by a local copy and
//! reported with status 0.

use crate::config::NetworkConfig;
use crate::fetch::{FetchRequest, TransferResponse, STATUS_LOCAL_FILE};
use async_trait::async_trait;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use ureq::http::HeaderMap;

/// Runs conditional transfers for the cache engine.
///
/// Implementations must never treat a non-2xx status as fatal themselves;
/// classification belongs to the cache entry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run one transfer to completion, streaming the body into
    /// `request.dest`, and report the outcome.
    async fn fetch(&self, request: &FetchRequest) -> TransferResponse;
}

/// HTTP transport backed by a shared ureq agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(network: &NetworkConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(network.user_agent.clone())
            .timeout_global(Some(Duration::from_secs(network.timeout_secs)))
            .build()
            .new_agent();
        Self { agent }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn fetch(&self, request: &FetchRequest) -> TransferResponse {
        if let Some(path) = request.url.strip_prefix("file://") {
            return fetch_local(Path::new(path), &request.dest);
        }

        let agent = self.agent.clone();
        let request = request.clone();
        match tokio::task::spawn_blocking(move || fetch_blocking(&agent, &request)).await {
            Ok(response) => response,
            Err(e) => TransferResponse {
                transport_error: Some(format!("transfer task failed: {e}")),
                ..Default::default()
            },
        }
    }
}

fn fetch_blocking(agent: &ureq::Agent, request: &FetchRequest) -> TransferResponse {
    debug!("GET {}", request.url);

    let mut call = agent.get(&request.url);
    if let Some(etag) = &request.if_none_match {
        call = call.header("If-None-Match", etag);
    }
    if let Some(modified) = &request.if_modified_since {
        call = call.header("If-Modified-Since", modified);
    }

    let mut response = match call.call() {
        Ok(response) => response,
        Err(e) => {
            return TransferResponse {
                transport_error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    let status = response.status().as_u16();
    let etag = header_value(response.headers(), "etag");
    let last_modified = header_value(response.headers(), "last-modified");
    let cache_control = header_value(response.headers(), "cache-control");

    // Only a 200 carries a body worth keeping.
    if status == 200 {
        let copied = File::create(&request.dest).and_then(|mut file| {
            let mut reader = response.body_mut().as_reader();
            std::io::copy(&mut reader, &mut file)
        });
        if let Err(e) = copied {
            return TransferResponse {
                status,
                transport_error: Some(format!("writing body to {}: {e}", request.dest.display())),
                etag,
                last_modified,
                cache_control,
            };
        }
    }

    TransferResponse {
        status,
        transport_error: None,
        etag,
        last_modified,
        cache_control,
    }
}

fn fetch_local(src: &Path, dest: &Path) -> TransferResponse {
    debug!("Copying local file {}", src.display());
    match std::fs::copy(src, dest) {
        Ok(_) => TransferResponse {
            status: STATUS_LOCAL_FILE,
            ..Default::default()
        },
        Err(e) => TransferResponse {
            transport_error: Some(format!("reading {}: {e}", src.display())),
            ..Default::default()
        },
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
