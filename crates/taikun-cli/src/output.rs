//! JSON result documents
//!
//! Every command prints exactly one JSON document on stdout. Waits render as
//! `{ "state", "outcome", "message", "probes", ... }` where `state` is one of
//! `done`, `failed` or `pending`, so callers never have to parse a message
//! to tell a timeout from a failure.

use std::process::ExitCode;

use serde_json::{json, Map, Value};

use taikun_reconcile::poller::{Outcome, OutcomeState, Reconciliation};
use taikun_reconcile::ProbeResult;

use crate::commands::CommandErrorExt;
use crate::Result;

/// A rendered command result
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Coarse state, drives the exit code
    pub state: OutcomeState,
    /// Document printed on stdout
    pub document: Value,
}

impl Report {
    /// Successful result
    pub fn done(document: Value) -> Self {
        Self::new(OutcomeState::Done, document)
    }

    /// Failed result
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(OutcomeState::Failed, json!({ "message": message }))
    }

    /// Result in `state`; the state is also written into the document
    pub fn new(state: OutcomeState, document: Value) -> Self {
        let mut report = Self { state, document };
        report.set("state", json!(state.as_str()));
        report
    }

    /// Render a finished wait on `resource`
    pub fn from_reconciliation(resource: &str, result: &Reconciliation<ProbeResult>) -> Self {
        let last = result.last.as_ref().map(|snapshot| {
            json!({
                "status": snapshot.status,
                "health": snapshot.health,
            })
        });
        let document = json!({
            "resource": resource,
            "outcome": result.outcome.label(),
            "message": outcome_message(resource, result),
            "probes": result.probes,
            "elapsedSecs": result.elapsed.as_secs(),
            "last": last,
        });
        Self::new(result.outcome.state(), document)
    }

    /// Add or replace a top-level field
    pub fn set(&mut self, key: &str, value: Value) {
        if !self.document.is_object() {
            self.document = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.document {
            map.insert(key.to_string(), value);
        }
    }

    /// Builder form of [`Report::set`]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.set(key, value);
        self
    }

    /// Pretty-printed document
    pub fn render(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.document).cmd_err()
    }

    /// 0 when done, 1 when failed, 2 when still pending
    pub fn exit_status(&self) -> u8 {
        match self.state {
            OutcomeState::Done => 0,
            OutcomeState::Failed => 1,
            OutcomeState::Pending => 2,
        }
    }

    /// Process exit code for [`Report::exit_status`]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

fn outcome_message(resource: &str, result: &Reconciliation<ProbeResult>) -> String {
    match &result.outcome {
        Outcome::Ready => format!("{} is ready", resource),
        Outcome::Deleted => format!("{} is deleted", resource),
        Outcome::Failed(reason) => format!("{} failed: {}", resource, reason),
        Outcome::TimedOut => format!(
            "timed out waiting for {} after {}s; it may still converge",
            resource,
            result.elapsed.as_secs()
        ),
        Outcome::TransportError(err) => err.to_string(),
        Outcome::Cancelled => format!("wait for {} was cancelled", resource),
    }
}
