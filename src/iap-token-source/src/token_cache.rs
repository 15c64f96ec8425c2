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
use crate::constants::REFRESH_MARGIN;
use crate::token::{Token, TokenProvider};
use std::sync::Arc;
use tokio::sync::Mutex;
// Using tokio's wrapper makes the cache testable without relying on clock times.
use tokio::time::Instant;

#[derive(Debug)]
pub(crate) struct TokenCache<T>
where
    T: TokenProvider,
{
    // The cached token, or the last seen error.
    state: Arc<Mutex<State>>,

    // Serializes refreshes. If the lock is held, there is a refresh.
    refresh_in_progress: Arc<Mutex<()>>,

    // The token provider. This thing does the refreshing.
    inner: Arc<T>,
}

#[derive(Debug)]
struct State {
    token: Option<Result<Token>>,
    // Incremented every time a refresh completes.
    generation: u64,
}

// A token is usable if it does not expire within the refresh margin.
fn usable(token: &Token) -> bool {
    Instant::now() + REFRESH_MARGIN < token.expires_at
}

// We manually implement the `Clone` trait because the Rust compiler will
// squawk if `T` is not `Clone`, even though we only hold an `Arc<T>`.
impl<T: TokenProvider> Clone for TokenCache<T> {
    fn clone(&self) -> TokenCache<T> {
        TokenCache {
            state: self.state.clone(),
            refresh_in_progress: self.refresh_in_progress.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T: TokenProvider> TokenCache<T> {
    pub fn new(inner: T) -> TokenCache<T> {
        Self::with_state(inner, None)
    }

    /// Creates a cache already holding `token`.
    pub fn with_token(inner: T, token: Token) -> TokenCache<T> {
        Self::with_state(inner, Some(Ok(token)))
    }

    fn with_state(inner: T, token: Option<Result<Token>>) -> TokenCache<T> {
        TokenCache {
            state: Arc::new(Mutex::new(State {
                token,
                generation: 0,
            })),
            refresh_in_progress: Arc::new(Mutex::new(())),
            inner: Arc::new(inner),
        }
    }

    async fn refresh(&self, seen: u64) -> Result<Token> {
        let _guard = self.refresh_in_progress.lock().await;

        // Another caller may have completed a refresh while we waited on the
        // lock. Share its outcome instead of starting a new exchange.
        {
            let state = self.state.lock().await;
            if state.generation != seen {
                match &state.token {
                    Some(Ok(t)) if usable(t) => return Ok(t.clone()),
                    Some(Err(e)) => return Err(e.clone()),
                    _ => {}
                }
            }
        }

        tracing::debug!("refreshing cached token");
        let result = self.inner.token().await;
        if let Err(e) = &result {
            tracing::warn!("token refresh failed: {e}");
        }

        let mut state = self.state.lock().await;
        state.token = Some(result.clone());
        state.generation += 1;
        result
    }
}

#[async_trait::async_trait]
impl<T: TokenProvider + 'static> TokenProvider for TokenCache<T> {
    async fn token(&self) -> Result<Token> {
        let seen = {
            let state = self.state.lock().await;
            if let Some(Ok(token)) = &state.token {
                if usable(token) {
                    return Ok(token.clone());
                }
            }
            state.generation
        };
        self.refresh(seen).await
    }
}
