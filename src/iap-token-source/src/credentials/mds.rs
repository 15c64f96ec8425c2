// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Obtain IAP ID tokens from the [Metadata Service].
//!
//! Google Cloud environments such as [Google Compute Engine (GCE)][gce-link],
//! [Google Kubernetes Engine (GKE)][gke-link], or [Cloud Run] provide a
//! metadata service. This is a local service to the VM (or pod) which, among
//! other things, mints ID tokens for the [default service account] of the
//! VM.
//!
//! The default host name of the metadata service is `metadata.google.internal`.
//! If you would like to use a different hostname, you can set it using the
//! `GCE_METADATA_HOST` environment variable.
//!
//! The metadata service returns a bare JWT. The token source treats it as
//! valid for 30 minutes.
//!
//! [Cloud Run]: https://cloud.google.com/run
//! [default service account]: https://cloud.google.com/iam/docs/service-account-types#default
//! [gce-link]: https://cloud.google.com/products/compute
//! [gke-link]: https://cloud.google.com/kubernetes-engine
//! [Metadata Service]: https://cloud.google.com/compute/docs/metadata/overview

use crate::Result;
use crate::constants::{
    DEFAULT_TOKEN_TYPE, METADATA_FLAVOR, METADATA_FLAVOR_VALUE, METADATA_IDENTITY_PATH,
    METADATA_PROBE_TIMEOUT, METADATA_ROOT, METADATA_TOKEN_LIFETIME,
};
use crate::credentials::loader::Environment;
use crate::errors::{self, Error};
use crate::token::{Token, TokenProvider};
use http::HeaderValue;
use reqwest::Client;
use tokio::time::Instant;

/// Returns the metadata service root URL.
///
/// The `GCE_METADATA_HOST` override wins over an endpoint set in the builder.
pub(crate) fn metadata_root(env: &Environment, endpoint: Option<&str>) -> String {
    if let Some(host) = env.metadata_host.as_deref().filter(|h| !h.is_empty()) {
        return format!("http://{host}");
    }
    endpoint.unwrap_or(METADATA_ROOT).to_string()
}

/// Returns true if the process runs on Google Cloud.
///
/// Setting `GCE_METADATA_HOST` is enough. Otherwise the metadata service must
/// answer with a `Metadata-Flavor: Google` header within a short timeout.
pub(crate) async fn on_gce(env: &Environment, endpoint: Option<&str>) -> bool {
    if env.metadata_host.as_deref().is_some_and(|h| !h.is_empty()) {
        return true;
    }
    let root = metadata_root(env, endpoint);
    let probe = Client::new()
        .get(&root)
        .header(METADATA_FLAVOR, HeaderValue::from_static(METADATA_FLAVOR_VALUE))
        .send();
    match tokio::time::timeout(METADATA_PROBE_TIMEOUT, probe).await {
        Ok(Ok(response)) => response
            .headers()
            .get(METADATA_FLAVOR)
            .is_some_and(|v| v == METADATA_FLAVOR_VALUE),
        Ok(Err(e)) => {
            tracing::debug!("metadata service probe at {root} failed: {e}");
            false
        }
        Err(_) => {
            tracing::debug!("metadata service probe at {root} timed out");
            false
        }
    }
}

/// Fetches ID tokens for the default service account.
#[derive(Debug)]
pub(crate) struct MdsTokenProvider {
    client: Client,
    endpoint: String,
    target_audience: String,
}

impl MdsTokenProvider {
    pub(crate) fn new(endpoint: String, target_audience: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            target_audience,
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for MdsTokenProvider {
    async fn token(&self) -> Result<Token> {
        let url = format!("{}{METADATA_IDENTITY_PATH}", self.endpoint);
        let issued = Instant::now();
        let response = self
            .client
            .get(&url)
            .header(
                METADATA_FLAVOR,
                HeaderValue::from_static(METADATA_FLAVOR_VALUE),
            )
            .query(&[("audience", self.target_audience.as_str())])
            .send()
            .await
            .map_err(|e| errors::from_http_error(e, "failed to get token from metadata service"))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            errors::from_http_error(e, "failed to read token from metadata service")
        })?;
        if !status.is_success() {
            return Err(Error::network(
                errors::is_retryable(status),
                format!("failed to get token from metadata service at {url}, status={status}, body=<{body}>"),
            ));
        }
        if body.is_empty() {
            return Err(Error::network(
                false,
                format!("empty token from metadata service at {url}"),
            ));
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            lifetime = ?METADATA_TOKEN_LIFETIME,
            "fetched ID token from the metadata service"
        );
        Ok(Token {
            access_token: body,
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            expires_at: issued + METADATA_TOKEN_LIFETIME,
        })
    }
}
