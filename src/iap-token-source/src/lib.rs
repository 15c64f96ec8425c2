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

//! OAuth2 identity tokens for services behind [Identity-Aware Proxy].
//!
//! Services protected by Identity-Aware Proxy (IAP) require an OIDC ID token,
//! minted for the IAP OAuth client ID, on every request. This crate obtains
//! such tokens on behalf of a [service account], caches them, and refreshes
//! them shortly before they expire.
//!
//! Two flows are supported:
//!
//! * With a [service account key], the crate signs a JWT assertion with the
//!   key and exchanges it for an ID token at the Google OAuth2 token endpoint.
//! * When no key is found and the application runs on Google Cloud, the crate
//!   fetches ID tokens for the default service account from the
//!   [metadata service].
//!
//! The key is located using (in order) an explicit JSON blob, an explicit
//! file, the `GOOGLE_APPLICATION_CREDENTIALS` environment variable, and the
//! well-known `gcloud` application default credentials file.
//!
//! # Example
//!
//! ```no_run
//! # use iap_token_source::credentials::TokenSource;
//! # tokio_test::block_on(async {
//! let token_source = TokenSource::builder("my-client-id.apps.googleusercontent.com")
//!     .build()
//!     .await?;
//! let token = token_source.token().await?;
//!
//! let client = reqwest::Client::new();
//! client
//!     .get("https://my-iap-protected.example.com/")
//!     .header(http::header::AUTHORIZATION, token.authorization())
//!     .send()
//!     .await?;
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```
//!
//! [Identity-Aware Proxy]: https://cloud.google.com/iap/docs/concepts-overview
//! [metadata service]: https://cloud.google.com/compute/docs/metadata/overview
//! [service account]: https://cloud.google.com/iam/docs/service-account-overview
//! [service account key]: https://cloud.google.com/iam/docs/keys-create-delete#creating

pub mod errors;

/// Types and functions to create and use IAP token sources.
pub mod credentials;

/// Types and functions to work with ID tokens.
pub mod token;

/// The pluggable HTTP transport used by the token exchange.
pub mod transport;

/// The token cache
pub(crate) mod token_cache;

pub(crate) mod constants;
pub(crate) mod signer;

/// A `Result` alias where the `Err` case is `iap_token_source::errors::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;
