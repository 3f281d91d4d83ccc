//! Admission control.
//!
//! A linear token bucket per request signature. A bucket holds up to
//! `capacity` credits and refills completely over `refill_interval_ms`,
//! continuously rather than in steps. Each admitted request spends one credit.
//!
//! The gate runs as the outermost middleware, before routing and before the
//! request body is read, so a rejected request costs no decoding or filtering.

use crate::core::error::{RequestId, ServiceError};
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bucket count above which idle buckets are dropped.
const PRUNE_THRESHOLD: usize = 4096;

/// What to do with a request that exceeds its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Reject it with a throttling status.
    Reject,
    /// Log it and let it through.
    LogOnly,
}

/// Admission gate options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdmissionOptions {
    /// Whether the gate is active at all.
    pub enabled: bool,
    /// Reject or only log excess requests.
    pub mode: EnforcementMode,
    /// Give each client address its own bucket.
    pub track_clients: bool,
    /// Let the query string take part in the signature.
    pub include_query: bool,
    /// Credits per bucket.
    pub capacity: u32,
    /// Time for an empty bucket to refill completely.
    pub refill_interval_ms: u64,
    /// Name of the shared signature.
    pub instance: String,
}

impl Default for AdmissionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: EnforcementMode::Reject,
            track_clients: false,
            include_query: false,
            capacity: 1000,
            refill_interval_ms: 500,
            instance: "api".to_string(),
        }
    }
}

impl AdmissionOptions {
    /// Create options with the default budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable the gate.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the enforcement mode.
    pub fn with_mode(mut self, mode: EnforcementMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set capacity and refill interval.
    pub fn with_budget(mut self, capacity: u32, refill_interval: Duration) -> Self {
        self.capacity = capacity;
        self.refill_interval_ms = refill_interval.as_millis() as u64;
        self
    }

    /// Key buckets by client address.
    pub fn with_client_tracking(mut self, track: bool) -> Self {
        self.track_clients = track;
        self
    }

    /// Key buckets by query string.
    pub fn with_query(mut self, include: bool) -> Self {
        self.include_query = include;
        self
    }

    fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms.max(1))
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Let the request through.
    Admit,
    /// Turn the request away.
    Reject {
        /// Time until a credit is available again.
        retry_after: Duration,
    },
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    credits: f64,
    updated: Instant,
}

impl Bucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            credits: capacity,
            updated: now,
        }
    }

    fn refill(&mut self, capacity: f64, interval: Duration, now: Instant) {
        let elapsed = now.saturating_duration_since(self.updated);
        let earned = capacity * elapsed.as_secs_f64() / interval.as_secs_f64();
        self.credits = (self.credits + earned).min(capacity);
        self.updated = now;
    }
}

/// Token-bucket admission gate shared by all requests.
pub struct AdmissionGate {
    options: AdmissionOptions,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl AdmissionGate {
    /// Create a gate with the given options.
    pub fn new(options: AdmissionOptions) -> Self {
        Self {
            options,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// The options this gate was built with.
    pub fn options(&self) -> &AdmissionOptions {
        &self.options
    }

    /// Build the throttling signature of a request.
    pub fn signature(&self, client: Option<IpAddr>, query: Option<&str>) -> String {
        let mut signature = self.options.instance.clone();
        if self.options.track_clients {
            signature.push('|');
            match client {
                Some(ip) => signature.push_str(&ip.to_string()),
                None => signature.push('-'),
            }
        }
        if self.options.include_query {
            signature.push('?');
            signature.push_str(query.unwrap_or(""));
        }
        signature
    }

    /// Check a request and spend a credit if it is admitted.
    pub fn check(&self, signature: &str) -> Decision {
        self.check_at(signature, Instant::now())
    }

    fn check_at(&self, signature: &str, now: Instant) -> Decision {
        if !self.options.enabled {
            return Decision::Admit;
        }

        let decision = self.take_credit(signature, now);
        match (decision, self.options.mode) {
            (Decision::Reject { retry_after }, EnforcementMode::LogOnly) => {
                warn!(
                    "Admission budget exceeded for '{}' (retry after {:?}), admitting in log-only mode",
                    signature, retry_after
                );
                Decision::Admit
            }
            (decision, _) => decision,
        }
    }

    fn take_credit(&self, signature: &str, now: Instant) -> Decision {
        let capacity = self.options.capacity as f64;
        let interval = self.options.refill_interval();

        let mut buckets = self.buckets.lock();
        if buckets.len() > PRUNE_THRESHOLD {
            prune(&mut buckets, capacity, interval, now);
        }

        let bucket = buckets
            .entry(signature.to_string())
            .or_insert_with(|| Bucket::full(capacity, now));
        bucket.refill(capacity, interval, now);

        if bucket.credits >= 1.0 {
            bucket.credits -= 1.0;
            Decision::Admit
        } else {
            let missing = 1.0 - bucket.credits;
            let retry_after = if capacity > 0.0 {
                interval.mul_f64(missing / capacity)
            } else {
                interval
            };
            Decision::Reject { retry_after }
        }
    }

    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

/// Drop buckets that have refilled completely; they are equivalent to new ones.
fn prune(buckets: &mut HashMap<String, Bucket>, capacity: f64, interval: Duration, now: Instant) {
    buckets.retain(|_, bucket| {
        bucket.refill(capacity, interval, now);
        bucket.credits < capacity
    });
}

/// Middleware applying the gate to every request.
pub async fn admit(State(gate): State<Arc<AdmissionGate>>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let signature = gate.signature(client, request.uri().query());

    match gate.check(&signature) {
        Decision::Admit => next.run(request).await,
        Decision::Reject { retry_after } => {
            debug!(
                "[{}] Rejected {} {} under '{}'",
                RequestId::new(),
                request.method(),
                request.uri().path(),
                signature
            );
            ServiceError::Overloaded { retry_after }.into_response()
        }
    }
}
