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

use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;

/// Command-line options for the sample.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = super::DESCRIPTION)]
pub struct Args {
    /// The OAuth client ID of the IAP-protected resource.
    pub client_id: String,

    /// The URL to GET.
    pub url: String,

    /// A service account key file.
    ///
    /// If not set, the key is located using `GOOGLE_APPLICATION_CREDENTIALS`
    /// and the gcloud well-known file. The metadata service is used when no
    /// key is found and the program runs on Google Cloud.
    #[arg(long, env = "IAP_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Log token source activity.
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Validates the arguments after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.client_id.is_empty() {
            bail!("the client id must not be empty")
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            bail!("expected an http or https URL, got {}", self.url)
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn validate_success() -> anyhow::Result<()> {
        let args = Args::try_parse_from([
            "program",
            "--credentials-file=/tmp/key.json",
            "client-id",
            "https://example.com/",
        ])?;
        assert_eq!(args.client_id, "client-id");
        assert_eq!(args.url, "https://example.com/");
        assert_eq!(args.credentials_file, Some(PathBuf::from("/tmp/key.json")));
        assert!(!args.verbose);
        let got = args.validate();
        assert!(got.is_ok(), "{got:?} {args:?}");
        Ok(())
    }

    #[test_case(&["program", "", "https://example.com/"]; "empty client id")]
    #[test_case(&["program", "client-id", "example.com"]; "not a url")]
    fn validate(input: &[&str]) -> anyhow::Result<()> {
        let args = Args::try_parse_from(input)?;
        let got = args.validate();
        assert!(got.is_err(), "{got:?} {args:?}");
        Ok(())
    }

    #[test]
    fn missing_url() {
        let got = Args::try_parse_from(["program", "client-id"]);
        assert!(got.is_err(), "{got:?}");
    }
}
