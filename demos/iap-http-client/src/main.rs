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

//! Calls an HTTP service protected by Identity-Aware Proxy.

mod args;

use args::Args;
use clap::Parser;
use iap_token_source::credentials::TokenSource;

const DESCRIPTION: &str = concat!(
    "This program sends a GET request to a service protected by",
    " Identity-Aware Proxy, using an ID token for the given OAuth client ID.",
    " It prints the response body to stdout."
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    args.validate()?;
    enable_tracing(&args);

    let mut builder = TokenSource::builder(&args.client_id);
    if let Some(path) = &args.credentials_file {
        builder = builder.with_credentials_file(path);
    }
    let token_source = builder.build().await?;
    tracing::info!(flow = ?token_source.flow(), "created IAP token source");

    let token = token_source.token().await?;
    let response = reqwest::Client::new()
        .get(&args.url)
        .header(http::header::AUTHORIZATION, token.authorization())
        .send()
        .await?;
    tracing::info!("{} {}", response.status(), args.url);
    let body = response.text().await?;
    println!("{body}");
    Ok(())
}

fn enable_tracing(args: &Args) {
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::fmt()
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting global subscriber succeeds");
}
