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

//! Errors created while building or using a token source.

use http::StatusCode;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
type ArcError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for [TokenSource] and its builder.
///
/// The error is cheap to clone. When several tasks wait on the same token
/// refresh, all of them receive a copy of the same error.
///
/// Applications rarely need to create instances of this error type. The
/// exception might be when testing application code, where the application is
/// mocking the token source behavior.
///
/// [TokenSource]: crate::credentials::TokenSource
#[derive(thiserror::Error, Clone, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// No credentials could be located, a credentials file could not be read,
    /// or the builder was misconfigured.
    pub fn is_configuration(&self) -> bool {
        matches!(self.0, ErrorKind::Configuration(_))
    }

    /// The service account key is malformed, has the wrong type, or lacks a
    /// required field.
    pub fn is_credential_format(&self) -> bool {
        matches!(self.0, ErrorKind::CredentialFormat(_))
    }

    /// The private key could not be parsed or used to sign the assertion.
    pub fn is_signing(&self) -> bool {
        matches!(self.0, ErrorKind::Signing(_))
    }

    /// The token endpoint or the metadata service could not be reached, or
    /// the metadata service did not return a token.
    pub fn is_network(&self) -> bool {
        matches!(self.0, ErrorKind::Network { .. })
    }

    /// The token endpoint rejected the request or returned a response that
    /// does not contain an ID token.
    pub fn is_token_response(&self) -> bool {
        matches!(self.0, ErrorKind::TokenResponse { .. })
    }

    /// Returns `true` if a future attempt may succeed.
    ///
    /// The token source never retries on its own. Applications that retry
    /// should use [Exponential backoff].
    ///
    /// [Exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff
    pub fn is_transient(&self) -> bool {
        match &self.0 {
            ErrorKind::Network { transient, .. } | ErrorKind::TokenResponse { transient, .. } => {
                *transient
            }
            _ => false,
        }
    }

    pub(crate) fn configuration<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Configuration(Arc::from(source.into())))
    }

    pub(crate) fn credential_format<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::CredentialFormat(Arc::from(source.into())))
    }

    pub(crate) fn signing<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Signing(Arc::from(source.into())))
    }

    pub(crate) fn network<T>(transient: bool, source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Network {
            transient,
            source: Arc::from(source.into()),
        })
    }

    pub(crate) fn token_response<T>(transient: bool, source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::TokenResponse {
            transient,
            source: Arc::from(source.into()),
        })
    }
}

#[derive(thiserror::Error, Clone, Debug)]
enum ErrorKind {
    #[error("cannot determine the credentials source: {0}")]
    Configuration(#[source] ArcError),
    #[error("invalid service account credentials: {0}")]
    CredentialFormat(#[source] ArcError),
    #[error("cannot sign the JWT assertion: {0}")]
    Signing(#[source] ArcError),
    #[error("cannot fetch the ID token, {}: {source}", retry_message(.transient))]
    Network {
        transient: bool,
        #[source]
        source: ArcError,
    },
    #[error("invalid token response, {}: {source}", retry_message(.transient))]
    TokenResponse {
        transient: bool,
        #[source]
        source: ArcError,
    },
}

const RETRYABLE_MSG: &str = "but future attempts may succeed";
const NON_RETRYABLE_MSG: &str = "and future attempts will not succeed";

fn retry_message(transient: &bool) -> &'static str {
    if *transient {
        RETRYABLE_MSG
    } else {
        NON_RETRYABLE_MSG
    }
}

pub(crate) fn is_retryable(c: StatusCode) -> bool {
    match c {
        // Internal server errors do not indicate that there is anything wrong
        // with our request, so we retry them.
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => true,
        _ => false,
    }
}

/// Converts a failure to send a request into a [Error::is_network] error.
pub(crate) fn from_http_error(err: reqwest::Error, msg: &str) -> Error {
    let transient = !err.is_builder() && !err.is_decode();
    Error::network(transient, format!("{msg}: {err}"))
}

/// Converts an unsuccessful response into a [Error::is_token_response] error.
pub(crate) fn from_http_response(status: StatusCode, body: &[u8], msg: &str) -> Error {
    let body = String::from_utf8_lossy(body);
    Error::token_response(
        is_retryable(status),
        format!("{msg}, status={status}, body=<{body}>"),
    )
}
