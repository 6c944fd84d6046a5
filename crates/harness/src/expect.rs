//! Negative-path oracle: assert that an operation fails the expected way.
//!
//! A structured error code is matched first. When the manager sends none,
//! the error text is searched for a fragment of the expected message. The
//! fragments below are copied from manager output and break silently when
//! that wording changes upstream; a mismatch reports both texts so the drift
//! is easy to spot.

use vigil_net::NetError;

use crate::error::{ApiError, HarnessError, Result};

/// How an expected failure is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedError {
    /// Structured `error_code`, when the manager emits one for this case.
    pub code: Option<&'static str>,
    /// Fragment of the human-readable message.
    pub message: &'static str,
}

/// Write sent to a manager that is not the cluster leader.
pub const NOT_ACTIVE_MANAGER: ExpectedError =
    ExpectedError { code: None, message: "It is not the active manager" };

/// `brokers-add` against a broker that is already clustered.
pub const BROKER_ALREADY_JOINED: ExpectedError =
    ExpectedError { code: None, message: "already in the cluster" };

/// `brokers-remove` for a name the cluster does not know.
pub const BROKER_NOT_FOUND: ExpectedError =
    ExpectedError { code: None, message: "not found in the cluster" };

pub const NOT_FOUND: ExpectedError =
    ExpectedError { code: Some("not_found_error"), message: "not found" };

/// Stale `version` on an optimistic update, or a duplicate id.
pub const CONFLICT: ExpectedError =
    ExpectedError { code: Some("conflict_error"), message: "conflict" };

pub const UNAUTHORIZED: ExpectedError =
    ExpectedError { code: Some("unauthorized_error"), message: "unauthorized" };

/// The error code and text a failure carries.
fn describe(err: &HarnessError) -> (Option<&str>, String) {
    match err {
        HarnessError::Api(api @ ApiError::Status { message, .. }) => {
            (api.error_code(), message.clone())
        }
        HarnessError::Net(NetError::Remote { stderr, .. }) => (None, stderr.clone()),
        other => (None, other.to_string()),
    }
}

/// Check that `result` failed as `expected` describes.
pub fn expect_error<T>(
    operation: &str,
    result: Result<T>,
    expected: &ExpectedError,
) -> Result<()> {
    let err = match result {
        Ok(_) => {
            return Err(HarnessError::UnexpectedSuccess {
                operation: operation.to_owned(),
                expected: expected.message.to_owned(),
            });
        }
        Err(e) => e,
    };
    let (code, message) = describe(&err);
    if let (Some(want), Some(got)) = (expected.code, code)
        && want == got
    {
        return Ok(());
    }
    if message.to_lowercase().contains(&expected.message.to_lowercase()) {
        return Ok(());
    }
    Err(HarnessError::UnexpectedError {
        operation: operation.to_owned(),
        expected: expected.message.to_owned(),
        actual: message,
    })
}
