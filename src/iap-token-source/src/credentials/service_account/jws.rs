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

use crate::Result;
use crate::errors::Error;
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use std::time::Duration;
use time::OffsetDateTime;

// Services reject assertions with `iat` in the future. Unfortunately all
// machines have some amount of clock skew, and it is possible that
// the machine creating this assertion has a clock a few milliseconds
// or seconds ahead of the machines receiving the assertion.
// Create the assertion with a 10 second margin to avoid most clock
// skew problems.
pub(crate) const CLOCK_SKEW_FUDGE: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_ASSERTION_TIMEOUT: Duration = Duration::from_secs(3600);

/// The claims of the assertion exchanged for an ID token.
///
/// `aud` is the token endpoint. The audience of the ID token travels in the
/// private `target_audience` claim.
#[derive(Serialize)]
pub(crate) struct JwsClaims {
    pub iss: String,
    pub aud: String,
    #[serde(with = "time::serde::timestamp")]
    pub exp: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub iat: OffsetDateTime,
    pub target_audience: String,
}

impl JwsClaims {
    /// Claims for an assertion issued at `now`, adjusted for clock skew.
    pub fn new(iss: &str, aud: &str, target_audience: &str, now: OffsetDateTime) -> Self {
        let iat = now - CLOCK_SKEW_FUDGE;
        Self {
            iss: iss.to_string(),
            aud: aud.to_string(),
            exp: iat + DEFAULT_ASSERTION_TIMEOUT,
            iat,
            target_audience: target_audience.to_string(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        if self.exp < self.iat {
            return Err(Error::signing(format!(
                "expiration time {:?}, must be later than issued time {:?}",
                self.exp, self.iat
            )));
        }
        let json = serde_json::to_string(&self).map_err(Error::signing)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}

/// The header that describes who, what, and how a token was created.
#[derive(Serialize, Debug)]
pub(crate) struct JwsHeader<'a> {
    pub alg: &'a str,
    pub typ: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<&'a str>,
}

impl<'a> JwsHeader<'a> {
    /// An RS256 header, naming the key only when its id is known.
    pub fn rs256(kid: &'a str) -> Self {
        Self {
            alg: "RS256",
            typ: "JWT",
            kid: (!kid.is_empty()).then_some(kid),
        }
    }

    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(&self).map_err(Error::signing)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}
