use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::client::debounce::Debouncer;
use crate::models::{SearchForm, SearchIntent, UniversalResults};

/// Issue order of a dispatched query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Querying,
    Error(String),
}

/// Client-side view of the search box: which results are on screen and
/// whether a query is outstanding.
///
/// Responses are applied last-write-wins by dispatch order: a response whose
/// ticket is older than the last applied one is discarded, so a slow early
/// query can never overwrite the results of a later one.
#[derive(Debug)]
pub struct SearchSession {
    issued: u64,
    applied: u64,
    state: SessionState,
    results: Option<UniversalResults>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self {
            issued: 0,
            applied: 0,
            state: SessionState::Idle,
            results: None,
        }
    }
}

impl SearchSession {
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.state = SessionState::Querying;
        Ticket(self.issued)
    }

    /// Apply a response. Returns `false` when the response was stale.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<UniversalResults, String>) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        let newest = ticket.0 == self.issued;

        match outcome {
            Ok(results) => {
                self.results = Some(results);
                if newest {
                    self.state = SessionState::Idle;
                }
            }
            Err(error) => {
                if newest {
                    self.state = SessionState::Error(error);
                }
            }
        }
        true
    }

    /// Empty the box: results go away and anything in flight becomes stale.
    pub fn clear(&mut self) {
        self.issued += 1;
        self.applied = self.issued;
        self.state = SessionState::Idle;
        self.results = None;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SessionState::Querying
    }

    pub fn results(&self) -> Option<&UniversalResults> {
        self.results.as_ref()
    }
}

/// HTTP client for the `POST /api/search` endpoint.
#[derive(Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SearchClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:9000`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/search", base_url.trim_end_matches('/')),
        }
    }

    pub async fn search(&self, query: &str, intent: SearchIntent) -> Result<UniversalResults> {
        let form = SearchForm {
            q: query.to_string(),
            intent,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .context("Failed to call search endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Search endpoint returned {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse search response")
    }
}

/// Debounced keystrokes in, session updates out. In-flight requests are
/// never cancelled; their responses go through [`SearchSession::complete`].
pub struct SearchDispatcher {
    input: Debouncer<String>,
    session: Arc<Mutex<SearchSession>>,
}

impl SearchDispatcher {
    pub fn spawn(client: SearchClient, window: Duration, intent: SearchIntent) -> Self {
        let (input, mut queries) = Debouncer::<String>::spawn(window);
        let session = Arc::new(Mutex::new(SearchSession::default()));

        let shared = session.clone();
        tokio::spawn(async move {
            while let Some(query) = queries.recv().await {
                if query.trim().is_empty() {
                    shared.lock().clear();
                    continue;
                }

                let ticket = shared.lock().begin();
                let client = client.clone();
                let shared = shared.clone();
                tokio::spawn(async move {
                    let outcome = client
                        .search(&query, intent)
                        .await
                        .map_err(|e| format!("{e:#}"));
                    if !shared.lock().complete(ticket, outcome) {
                        tracing::debug!("Discarded stale response for {query:?}");
                    }
                });
            }
        });

        Self { input, session }
    }

    /// Feed the current contents of the search box.
    pub fn input(&self, text: &str) {
        self.input.push(text.to_string());
    }

    pub fn session(&self) -> Arc<Mutex<SearchSession>> {
        self.session.clone()
    }
}
