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

//! Locates the service account key used by a token source.
//!
//! The key is loaded from, in order:
//!
//! 1. The JSON blob given to [Builder::with_service_account].
//! 2. The file given to [Builder::with_credentials_file].
//! 3. The file named by the `GOOGLE_APPLICATION_CREDENTIALS` environment
//!    variable.
//! 4. The well-known file created by `gcloud auth application-default login`,
//!    that is `$HOME/.config/gcloud/application_default_credentials.json`, or
//!    `%APPDATA%\gcloud\application_default_credentials.json` on Windows.
//!
//! If none of these is found and the application runs on Google Cloud, the
//! token source uses the metadata service.
//!
//! [Builder::with_service_account]: crate::credentials::Builder::with_service_account
//! [Builder::with_credentials_file]: crate::credentials::Builder::with_credentials_file

use crate::Result;
use crate::constants::{GCE_METADATA_HOST_VAR, GOOGLE_APPLICATION_CREDENTIALS_VAR};
use crate::credentials::mds;
use crate::credentials::service_account::ServiceAccountKey;
use crate::errors::Error;
use serde_json::Value;
use std::path::{Path, PathBuf};

const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

/// The environment lookups used to locate credentials.
///
/// Applications rarely need this type. [Environment::from_process] captures
/// the environment of the current process, and is used by default. Tests can
/// create an `Environment` directly to avoid changing the process
/// environment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    /// The value of `GOOGLE_APPLICATION_CREDENTIALS`, if set and not empty.
    pub credentials_file: Option<PathBuf>,
    /// The path of the well-known gcloud credentials file, if it can be
    /// determined.
    pub well_known_file: Option<PathBuf>,
    /// The value of `GCE_METADATA_HOST`, if set and not empty.
    pub metadata_host: Option<String>,
}

impl Environment {
    /// Captures the environment of the current process.
    pub fn from_process() -> Self {
        Self {
            credentials_file: non_empty_var(GOOGLE_APPLICATION_CREDENTIALS_VAR).map(PathBuf::from),
            well_known_file: well_known_file(),
            metadata_host: non_empty_var(GCE_METADATA_HOST_VAR),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn well_known_file() -> Option<PathBuf> {
    let mut path = if cfg!(windows) {
        PathBuf::from(non_empty_var("APPDATA")?)
    } else {
        let mut home = PathBuf::from(non_empty_var("HOME")?);
        home.push(".config");
        home
    };
    path.push("gcloud");
    path.push(WELL_KNOWN_FILE);
    Some(path)
}

/// Where the token source gets its tokens from.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolved {
    ServiceAccount(ServiceAccountKey),
    Metadata,
}

/// The credential sources configured on the builder.
#[derive(Debug, Default)]
pub(crate) struct Explicit<'a> {
    pub json: Option<Value>,
    pub bytes: Option<&'a [u8]>,
    pub file: Option<&'a Path>,
    pub metadata_endpoint: Option<&'a str>,
}

pub(crate) async fn resolve(explicit: Explicit<'_>, env: &Environment) -> Result<Resolved> {
    if let Some(json) = explicit.json {
        tracing::debug!("using the service account key set in the builder");
        return ServiceAccountKey::from_value(json, "the builder").map(Resolved::ServiceAccount);
    }
    if let Some(bytes) = explicit.bytes {
        tracing::debug!("using the service account key bytes set in the builder");
        return parse_key(bytes, "the builder").map(Resolved::ServiceAccount);
    }
    if let Some(path) = explicit.file {
        tracing::debug!("using the credentials file {} set in the builder", path.display());
        return load_file(path, "the builder").await;
    }
    if let Some(path) = &env.credentials_file {
        tracing::debug!(
            "using the credentials file {} set in {GOOGLE_APPLICATION_CREDENTIALS_VAR}",
            path.display()
        );
        return load_file(path, GOOGLE_APPLICATION_CREDENTIALS_VAR).await;
    }
    if let Some(path) = &env.well_known_file {
        match tokio::fs::read(path).await {
            Ok(contents) => {
                tracing::debug!("using the well-known credentials file {}", path.display());
                return parse_key(&contents, &path.display().to_string())
                    .map(Resolved::ServiceAccount);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::configuration(format!(
                    "cannot read the well-known credentials file {}: {e}",
                    path.display()
                )));
            }
        }
    }
    if mds::on_gce(env, explicit.metadata_endpoint).await {
        tracing::debug!("using the metadata service");
        return Ok(Resolved::Metadata);
    }
    Err(Error::configuration("unable to determine credentials source"))
}

async fn load_file(path: &Path, origin: &str) -> Result<Resolved> {
    let contents = tokio::fs::read(path).await.map_err(|e| {
        Error::configuration(format!(
            "cannot read the credentials file {} set in {origin}: {e}",
            path.display()
        ))
    })?;
    parse_key(&contents, &path.display().to_string()).map(Resolved::ServiceAccount)
}

fn parse_key(contents: &[u8], origin: &str) -> Result<ServiceAccountKey> {
    let value = serde_json::from_slice::<Value>(contents).map_err(|e| {
        Error::credential_format(format!("cannot parse the credentials from {origin}: {e}"))
    })?;
    ServiceAccountKey::from_value(value, origin)
}
