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

//! Types and functions to work with IAP [ID tokens].
//!
//! [ID tokens]: https://cloud.google.com/iap/docs/authentication-howto

use crate::Result;
use crate::errors::Error;
use http::HeaderValue;
use tokio::time::Instant;

/// Represents an ID token accepted by Identity-Aware Proxy.
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The actual token string.
    ///
    /// This is the value used in `Authorization:` header.
    pub access_token: String,

    /// The type of the token.
    ///
    /// The token endpoint and the metadata service return `"Bearer"` tokens.
    pub token_type: String,

    /// The instant after which the token must not be used.
    ///
    /// Note that the `Instant` is not valid across processes. It is
    /// recommended to let the token source refresh tokens within a process
    /// instead of handling expirations yourself.
    pub expires_at: Instant,
}

impl Token {
    /// Formats the token as the value of an `Authorization` header.
    ///
    /// ```
    /// # use iap_token_source::token::Token;
    /// let token = Token {
    ///     access_token: "hello-world".to_string(),
    ///     token_type: "Bearer".to_string(),
    ///     expires_at: tokio::time::Instant::now(),
    /// };
    /// assert_eq!(token.authorization(), "Bearer hello-world");
    /// ```
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// The `Authorization` header value, marked as sensitive.
    pub(crate) fn header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&self.authorization())
            .map_err(|e| Error::token_response(false, e))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[censored]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Fetches a fresh token every time it is called.
#[async_trait::async_trait]
pub(crate) trait TokenProvider: std::fmt::Debug + Send + Sync {
    async fn token(&self) -> Result<Token>;
}
