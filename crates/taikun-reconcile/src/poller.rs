//! Generic reconciliation poller
//!
//! One loop serves every resource kind. It is parameterized by a
//! [`StatusProbe`] that reads the remote state and a classifier that maps
//! each snapshot to a [`Verdict`]:
//!
//! ```text
//! deadline = start + timeout
//! loop {
//!     cancelled?          -> Cancelled
//!     past deadline?      -> TimedOut
//!     probe()             -> Err: TransportError (never retried)
//!     not found           -> Deleted when waiting for deletion, else Failed
//!                            (or keep polling until first seen, on request)
//!     classify()          -> Ready / Failed end the wait, Continue sleeps
//! }
//! ```
//!
//! Probes are strictly sequential: tick N+1 starts only after tick N has
//! been classified.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use taikun_common::{Error, ResourceKind, Result, WaitIntent, WaitSettings};

use crate::classify::Verdict;
use crate::probe::{Observation, StatusProbe};

/// One wait, immutable for its duration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciliationRequest {
    /// Kind of the target
    pub kind: ResourceKind,
    /// Identifies the target within its kind, used in logs and reasons
    pub key: String,
    /// Delay between probes
    pub poll_interval: Duration,
    /// Deadline measured from the start of the wait
    pub timeout: Duration,
    /// Whether absence is the goal
    pub wait_for_deletion: bool,
    /// Treat absence as "not created yet" until the resource is first seen
    pub await_appearance: bool,
}

impl ReconciliationRequest {
    /// Request from resolved settings
    pub fn new(
        kind: ResourceKind,
        key: impl Into<String>,
        settings: WaitSettings,
        intent: WaitIntent,
    ) -> Self {
        Self {
            kind,
            key: key.into(),
            poll_interval: settings.interval,
            timeout: settings.timeout,
            wait_for_deletion: intent == WaitIntent::Deleted,
            await_appearance: false,
        }
    }

    /// Keep polling while a just-created resource is not listed yet
    pub fn awaiting_appearance(mut self, await_appearance: bool) -> Self {
        self.await_appearance = await_appearance;
        self
    }

    /// Reject requests that could never terminate sensibly
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::validation_for_field(
                "interval",
                format!("poll interval for {} must be greater than zero", self.key),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::validation_for_field(
                "timeout",
                format!("timeout for {} must be greater than zero", self.key),
            ));
        }
        Ok(())
    }
}

/// How a wait ended
#[derive(Debug)]
pub enum Outcome {
    /// The resource reached its ready state
    Ready,
    /// The resource is gone, as requested
    Deleted,
    /// The backend reported a terminal failure, or the resource is missing
    Failed(String),
    /// The deadline passed while the resource was still converging
    TimedOut,
    /// A probe could not complete
    TransportError(Error),
    /// The caller aborted the wait
    Cancelled,
}

/// Coarse presentation state of an [`Outcome`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeState {
    /// The resource may still converge
    Pending,
    /// The goal was reached
    Done,
    /// The goal cannot be reached
    Failed,
}

impl OutcomeState {
    /// Lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeState::Pending => "pending",
            OutcomeState::Done => "done",
            OutcomeState::Failed => "failed",
        }
    }
}

impl Outcome {
    /// Whether the wait reached its goal
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Ready | Outcome::Deleted)
    }

    /// Presentation state; a timeout or cancellation leaves the resource pending
    pub fn state(&self) -> OutcomeState {
        match self {
            Outcome::Ready | Outcome::Deleted => OutcomeState::Done,
            Outcome::TimedOut | Outcome::Cancelled => OutcomeState::Pending,
            Outcome::Failed(_) | Outcome::TransportError(_) => OutcomeState::Failed,
        }
    }

    /// Snake-case name
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Ready => "ready",
            Outcome::Deleted => "deleted",
            Outcome::Failed(_) => "failed",
            Outcome::TimedOut => "timed_out",
            Outcome::TransportError(_) => "transport_error",
            Outcome::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
            Outcome::TransportError(err) => write!(f, "{}", err),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of one wait
#[derive(Debug)]
pub struct Reconciliation<O> {
    /// How the wait ended
    pub outcome: Outcome,
    /// Number of probe calls made
    pub probes: u32,
    /// Last snapshot observed, if any probe succeeded
    pub last: Option<O>,
    /// Time spent waiting
    pub elapsed: Duration,
}

/// Diagnostic record emitted once per successful probe
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Kind of the target
    pub kind: ResourceKind,
    /// Target key
    pub key: String,
    /// 1-based probe number
    pub attempt: u32,
    /// Whether the resource exists
    pub found: bool,
    /// Observed status
    pub status: String,
    /// Observed health
    pub health: Option<String>,
    /// Time since the wait started
    pub elapsed: Duration,
}

/// Receives per-tick diagnostics
pub trait TickSink: Send + Sync {
    /// Record one tick
    fn record(&self, tick: &Tick);
}

/// Default sink: one tracing event per tick
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TickSink for TracingSink {
    fn record(&self, tick: &Tick) {
        info!(
            kind = %tick.kind,
            resource = %tick.key,
            attempt = tick.attempt,
            found = tick.found,
            status = %tick.status,
            health = ?tick.health,
            elapsed_secs = tick.elapsed.as_secs(),
            "Reconciliation tick"
        );
    }
}

/// Drives waits
#[derive(Clone)]
pub struct Poller {
    sink: Arc<dyn TickSink>,
    cancel: Option<CancellationToken>,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl Poller {
    /// Poller reporting ticks to `sink`
    pub fn new(sink: Arc<dyn TickSink>) -> Self {
        Self { sink, cancel: None }
    }

    /// Abort waits when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Sleep for `interval`; false if cancelled first
    async fn pause(&self, interval: Duration) -> bool {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => false,
                    _ = tokio::time::sleep(interval) => true,
                }
            }
            None => {
                tokio::time::sleep(interval).await;
                true
            }
        }
    }

    /// Poll `probe` until `classify` reports a terminal verdict, the resource
    /// disappears, the deadline passes, or the wait is cancelled.
    ///
    /// `Err` only when the request itself is invalid; everything the remote
    /// side does is reported through [`Outcome`].
    pub async fn run<P, C>(
        &self,
        request: &ReconciliationRequest,
        probe: &P,
        classify: C,
    ) -> Result<Reconciliation<P::Output>>
    where
        P: StatusProbe + ?Sized,
        C: Fn(&P::Output) -> Verdict + Send + Sync,
    {
        request.validate()?;

        let start = Instant::now();
        let mut probes = 0u32;
        let mut last = None;
        let mut seen = false;

        debug!(
            resource = %request.key,
            interval_secs = request.poll_interval.as_secs(),
            timeout_secs = request.timeout.as_secs(),
            wait_for_deletion = request.wait_for_deletion,
            "Starting reconciliation"
        );

        let outcome = loop {
            if self.is_cancelled() {
                break Outcome::Cancelled;
            }
            if start.elapsed() > request.timeout {
                break Outcome::TimedOut;
            }

            probes += 1;
            let observation = match probe.probe().await {
                Ok(observation) => observation,
                Err(e) => {
                    warn!(resource = %request.key, attempt = probes, error = %e, "Probe failed");
                    break Outcome::TransportError(e);
                }
            };
            self.sink.record(&Tick {
                kind: request.kind,
                key: request.key.clone(),
                attempt: probes,
                found: observation.found(),
                status: observation.status().to_string(),
                health: observation.health().map(str::to_string),
                elapsed: start.elapsed(),
            });

            let verdict = match (observation.found(), request.wait_for_deletion) {
                (false, true) => break Outcome::Deleted,
                (false, false) if request.await_appearance && !seen => Verdict::Continue,
                (false, false) => {
                    break Outcome::Failed(format!("resource not found: {}", request.key))
                }
                // Still present; whatever its status, keep waiting for it to go
                (true, true) => Verdict::Continue,
                (true, false) => classify(&observation),
            };
            if observation.found() {
                seen = true;
                last = Some(observation);
            }

            match verdict {
                Verdict::Ready => break Outcome::Ready,
                Verdict::Failed(reason) => break Outcome::Failed(reason),
                Verdict::Continue => {}
            }

            if !self.pause(request.poll_interval).await {
                break Outcome::Cancelled;
            }
        };

        let elapsed = start.elapsed();
        info!(
            resource = %request.key,
            outcome = outcome.label(),
            probes,
            elapsed_secs = elapsed.as_secs(),
            "Reconciliation finished"
        );

        Ok(Reconciliation {
            outcome,
            probes,
            last,
            elapsed,
        })
    }
}
