//! Shared test fixtures

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use taikun_common::Result;

use crate::client::{ApiRequest, ApiResponse, ControlPlane, MockControlPlane};

/// Mock that answers every request with the same JSON body
pub fn responding(status: u16, body: Value) -> Arc<dyn ControlPlane> {
    let mut mock = MockControlPlane::new();
    mock.expect_execute()
        .returning(move |_| Ok(ApiResponse::json_body(status, &body)));
    Arc::new(mock)
}

/// Mock that answers requests in order from `script`, and checks each
/// request with `check`. Panics if more requests arrive than scripted.
pub fn scripted<F>(script: Vec<Result<ApiResponse>>, check: F) -> Arc<dyn ControlPlane>
where
    F: Fn(&ApiRequest) + Send + Sync + 'static,
{
    let queue = Arc::new(Mutex::new(VecDeque::from(script)));
    let mut mock = MockControlPlane::new();
    mock.expect_execute().returning(move |request| {
        check(request);
        queue
            .lock()
            .unwrap()
            .pop_front()
            .expect("more requests than scripted responses")
    });
    Arc::new(mock)
}
