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

//! The HTTP transport used to exchange signed assertions for ID tokens.
//!
//! Applications that need to control the HTTP client (custom proxies, root
//! certificates, or timeouts) can wrap their own client in a type that
//! implements [PostForm] and pass it to
//! [Builder::with_transport][crate::credentials::Builder::with_transport].

use crate::Result;
use crate::errors;
use bytes::Bytes;
use http::StatusCode;

/// The response to a form POST.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The raw response body.
    pub body: Bytes,
}

/// Sends `application/x-www-form-urlencoded` POST requests.
///
/// Implementations should return an [Error::is_network] error when the
/// request cannot be sent, and an [HttpResponse] for any response received,
/// including unsuccessful ones. The token source interprets the status code.
///
/// [Error::is_network]: crate::errors::Error::is_network
#[async_trait::async_trait]
pub trait PostForm: std::fmt::Debug + Send + Sync {
    /// Posts `form` to `url`.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse>;
}

/// The default transport, based on [reqwest].
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport using the given client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PostForm for ReqwestTransport {
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| errors::from_http_error(e, &format!("failed to POST to {url}")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                errors::from_http_error(e, &format!("failed to read response from {url}"))
            })?;
        Ok(HttpResponse { status, body })
    }
}
