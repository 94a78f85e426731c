use crate::config::SearchConfig;
use crate::core::customer::{classify_query, CustomerResolver};
use crate::domain::model::Customer;
use crate::domain::ports::{CustomerQuery, IntakeApi};
use crate::utils::error::Result;
use std::time::Duration;
use tokio::time::Instant;

/// A running debounce timer. Only the newest one can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer {
    generation: u64,
    deadline: Instant,
}

impl DebounceTimer {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub async fn elapsed(self) -> Self {
        tokio::time::sleep_until(self.deadline).await;
        self
    }
}

/// A search that has been issued, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub query: CustomerQuery,
}

/// Debounced live search over customers.
///
/// Input restarts the debounce timer; a query shorter than the minimum clears
/// the results and never searches. Each issued search carries a sequence number
/// and only the response for the latest one is applied.
#[derive(Debug)]
pub struct LiveSearch {
    debounce: Duration,
    min_query_len: usize,
    text: String,
    timer_generation: u64,
    issued_seq: u64,
    results: Vec<Customer>,
    searching: bool,
    error: Option<String>,
}

impl LiveSearch {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            debounce: config.debounce(),
            min_query_len: config.min_query_len,
            text: String::new(),
            timer_generation: 0,
            issued_seq: 0,
            results: Vec::new(),
            searching: false,
            error: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn results(&self) -> &[Customer] {
        &self.results
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Records new input text and restarts the timer.
    pub fn input(&mut self, text: &str) -> Option<DebounceTimer> {
        self.text = text.to_string();
        self.timer_generation += 1;

        if self.text.trim().chars().count() < self.min_query_len {
            // Any search still in flight is now stale.
            self.issued_seq += 1;
            self.searching = false;
            self.results.clear();
            self.error = None;
            return None;
        }

        Some(DebounceTimer {
            generation: self.timer_generation,
            deadline: Instant::now() + self.debounce,
        })
    }

    /// Stops any pending timer without touching results.
    pub fn cancel(&mut self) {
        self.timer_generation += 1;
    }

    /// Called when a timer elapses. Returns the search to issue, or `None`
    /// when the timer was superseded by newer input.
    pub fn fire(&mut self, timer: DebounceTimer) -> Option<SearchRequest> {
        if timer.generation != self.timer_generation {
            tracing::trace!("Debounce timer {} superseded", timer.generation);
            return None;
        }

        self.issued_seq += 1;
        self.searching = true;
        Some(SearchRequest {
            seq: self.issued_seq,
            query: classify_query(&self.text),
        })
    }

    /// Applies a search response. Responses for anything but the latest
    /// issued search are discarded; returns whether it was applied.
    pub fn apply(&mut self, seq: u64, response: Result<Vec<Customer>>) -> bool {
        if seq != self.issued_seq {
            tracing::debug!(
                "Discarding stale search response {} (latest {})",
                seq,
                self.issued_seq
            );
            return false;
        }

        self.searching = false;
        match response {
            Ok(customers) => {
                self.results = customers;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!("Customer search failed: {}", e);
                self.results.clear();
                self.error = Some("Failed to search customers".to_string());
            }
        }
        true
    }

    /// Runs an issued search against the resolver and applies the response.
    pub async fn run<A: IntakeApi>(
        &mut self,
        resolver: &CustomerResolver<A>,
        request: SearchRequest,
    ) -> bool {
        let response = resolver.search(&request.query).await;
        self.apply(request.seq, response)
    }
}
