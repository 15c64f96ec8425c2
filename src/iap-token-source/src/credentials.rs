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

pub mod loader;
pub(crate) mod mds;
pub(crate) mod service_account;

use crate::Result;
use crate::errors::Error;
use crate::token::{Token, TokenProvider};
use crate::token_cache::TokenCache;
use crate::transport::{PostForm, ReqwestTransport};
use http::HeaderMap;
use http::header::AUTHORIZATION;
use loader::{Environment, Explicit, Resolved};
use mds::MdsTokenProvider;
use serde_json::Value;
use service_account::ServiceAccountTokenProvider;
use std::path::PathBuf;
use std::sync::Arc;

/// How a [TokenSource] obtains its tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Signs assertions with a service account key and exchanges them at the
    /// token endpoint.
    ServiceAccount,
    /// Fetches tokens for the default service account from the metadata
    /// service.
    Metadata,
}

/// A source of ID tokens for one IAP-protected audience.
///
/// Tokens are cached and refreshed shortly before they expire. Concurrent
/// callers share a single refresh.
///
/// `TokenSource` is cheap to clone. Clones share the cached token.
///
/// # Example
/// ```no_run
/// # use iap_token_source::credentials::TokenSource;
/// # tokio_test::block_on(async {
/// let token_source = TokenSource::builder("my-client-id.apps.googleusercontent.com")
///     .with_credentials_file("/path/to/service-account.json")
///     .build()
///     .await?;
/// let headers = token_source.headers().await?;
/// # Ok::<(), anyhow::Error>(())
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct TokenSource {
    audience: String,
    flow: Flow,
    inner: Arc<dyn TokenProvider>,
}

impl TokenSource {
    /// Creates a [Builder] for token sources targeting `audience`.
    ///
    /// The audience is the OAuth client ID of the IAP-protected resource.
    pub fn builder<S: Into<String>>(audience: S) -> Builder {
        Builder::new(audience)
    }

    /// Returns a valid token, refreshing it if needed.
    pub async fn token(&self) -> Result<Token> {
        self.inner.token().await
    }

    /// Returns the headers to authenticate a request with the current token.
    ///
    /// The `authorization` header is marked as sensitive.
    pub async fn headers(&self) -> Result<HeaderMap> {
        let token = self.token().await?;
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(AUTHORIZATION, token.header_value()?);
        Ok(headers)
    }

    /// The audience of the tokens.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// How this token source obtains tokens.
    pub fn flow(&self) -> Flow {
        self.flow
    }
}

/// Creates [TokenSource] instances.
///
/// Without explicit credentials, the builder locates them as described in
/// the [loader] module.
pub struct Builder {
    audience: String,
    service_account: Option<Value>,
    service_account_bytes: Option<Vec<u8>>,
    credentials_file: Option<PathBuf>,
    transport: Option<Arc<dyn PostForm>>,
    environment: Option<Environment>,
    metadata_endpoint: Option<String>,
}

impl Builder {
    fn new<S: Into<String>>(audience: S) -> Self {
        Self {
            audience: audience.into(),
            service_account: None,
            service_account_bytes: None,
            credentials_file: None,
            transport: None,
            environment: None,
            metadata_endpoint: None,
        }
    }

    /// Uses the given service account key, in its JSON form.
    ///
    /// This is useful when the key is obtained from Secret Manager or a
    /// similar service.
    pub fn with_service_account(mut self, service_account_key: Value) -> Self {
        self.service_account = Some(service_account_key);
        self.service_account_bytes = None;
        self
    }

    /// Uses the given service account key, as the raw contents of a key file.
    ///
    /// Contents that are not a valid service account key are reported by
    /// [build][Builder::build].
    pub fn with_service_account_bytes<B: Into<Vec<u8>>>(mut self, contents: B) -> Self {
        self.service_account_bytes = Some(contents.into());
        self.service_account = None;
        self
    }

    /// Loads the service account key from `path`.
    pub fn with_credentials_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// Sends token exchange requests using `transport`.
    ///
    /// Defaults to a [ReqwestTransport]. The transport is not used in the
    /// metadata flow.
    pub fn with_transport<T: PostForm + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Locates credentials using `environment` instead of the process
    /// environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the root URL of the metadata service.
    ///
    /// A trailing slash is significant, so specify the base URL without a
    /// trailing slash. If not set, the token source uses
    /// `http://metadata.google.internal`. The `GCE_METADATA_HOST` environment
    /// variable overrides this setting.
    pub fn with_metadata_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.metadata_endpoint = Some(endpoint.into());
        self
    }

    /// Returns a [TokenSource] with the configured settings.
    ///
    /// With a service account key, this fetches the first token, so
    /// invalid keys and rejected assertions are reported here.
    pub async fn build(self) -> Result<TokenSource> {
        if self.audience.is_empty() {
            return Err(Error::configuration("the audience must not be empty"));
        }
        let environment = self.environment.unwrap_or_else(Environment::from_process);
        let explicit = Explicit {
            json: self.service_account,
            bytes: self.service_account_bytes.as_deref(),
            file: self.credentials_file.as_deref(),
            metadata_endpoint: self.metadata_endpoint.as_deref(),
        };
        match loader::resolve(explicit, &environment).await? {
            Resolved::ServiceAccount(key) => {
                let transport: Arc<dyn PostForm> = match self.transport {
                    Some(t) => t,
                    None => Arc::new(ReqwestTransport::default()),
                };
                let provider =
                    ServiceAccountTokenProvider::new(key, self.audience.clone(), transport)?;
                let token = provider.token().await?;
                Ok(TokenSource {
                    audience: self.audience,
                    flow: Flow::ServiceAccount,
                    inner: Arc::new(TokenCache::with_token(provider, token)),
                })
            }
            Resolved::Metadata => {
                let endpoint =
                    mds::metadata_root(&environment, self.metadata_endpoint.as_deref());
                let provider = MdsTokenProvider::new(endpoint, self.audience.clone());
                Ok(TokenSource {
                    audience: self.audience,
                    flow: Flow::Metadata,
                    inner: Arc::new(TokenCache::new(provider)),
                })
            }
        }
    }
}
