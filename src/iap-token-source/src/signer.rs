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

//! Signs JWT assertions with a service account private key.

use crate::Result;
use crate::errors::Error;
use rustls::crypto::{CryptoProvider, KeyProvider};
use rustls::sign::SigningKey;
use rustls::{SignatureAlgorithm, SignatureScheme};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer};
use std::sync::Arc;

/// An RSA private key, ready to produce RS256 signatures.
#[derive(Clone)]
pub(crate) struct AssertionSigner {
    key: Arc<dyn SigningKey>,
}

impl std::fmt::Debug for AssertionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionSigner")
            .field("key", &"[censored]")
            .finish()
    }
}

impl AssertionSigner {
    /// Parses a PEM encoded RSA key, in PKCS#8 or PKCS#1 form.
    pub(crate) fn new(private_key: &str) -> Result<Self> {
        let der = parse_pem(private_key)?;
        let key = key_provider()?
            .load_private_key(der)
            .map_err(Error::signing)?;
        if key.algorithm() != SignatureAlgorithm::RSA {
            return Err(Error::signing(format!(
                "expected an RSA private key, found {:?}",
                key.algorithm()
            )));
        }
        let signer = Self { key };
        // Fail early if the provider cannot produce RS256 signatures.
        signer.choose_signer()?;
        Ok(signer)
    }

    /// Returns the RS256 (RSASSA-PKCS1-v1_5 with SHA-256) signature of
    /// `content`.
    pub(crate) fn sign(&self, content: &[u8]) -> Result<Vec<u8>> {
        self.choose_signer()?.sign(content).map_err(Error::signing)
    }

    fn choose_signer(&self) -> Result<Box<dyn rustls::sign::Signer>> {
        self.key
            .choose_scheme(&[SignatureScheme::RSA_PKCS1_SHA256])
            .ok_or_else(|| {
                Error::signing("unable to choose RSA_PKCS1_SHA256 signing scheme for the key")
            })
    }
}

fn parse_pem(private_key: &str) -> Result<PrivateKeyDer<'static>> {
    if let Ok(der) = PrivatePkcs8KeyDer::from_pem_slice(private_key.as_bytes()) {
        return Ok(PrivateKeyDer::Pkcs8(der));
    }
    PrivatePkcs1KeyDer::from_pem_slice(private_key.as_bytes())
        .map(PrivateKeyDer::Pkcs1)
        .map_err(|e| {
            Error::signing(format!(
                "expected a PEM encoded key in PKCS#8 or PKCS#1 form: {e}"
            ))
        })
}

#[cfg(feature = "default-rustls-provider")]
fn key_provider() -> Result<&'static dyn KeyProvider> {
    Ok(CryptoProvider::get_default().map_or_else(
        || rustls::crypto::aws_lc_rs::default_provider().key_provider,
        |p| p.key_provider,
    ))
}

#[cfg(not(feature = "default-rustls-provider"))]
fn key_provider() -> Result<&'static dyn KeyProvider> {
    CryptoProvider::get_default()
        .map(|p| p.key_provider)
        .ok_or_else(|| {
            Error::signing(
                "no rustls crypto provider is installed, call `rustls::crypto::CryptoProvider::install_default()`",
            )
        })
}
