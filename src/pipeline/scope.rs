// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

//! Cancellation scopes
//!
//! A [`Scope`] ties in-flight runs to the lifetime of whoever started them.
//! Each run registers a child token, so cancelling the scope reaches every run
//! still in flight while cancelling one run leaves its siblings alone.

use tokio_util::sync::{CancellationToken, DropGuard};

/// Registration point for pipeline runs
#[derive(Debug, Clone, Default)]
pub struct Scope {
    token: CancellationToken,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A nested scope, cancelled along with this one
    pub fn child(&self) -> Scope {
        Scope {
            token: self.token.child_token(),
        }
    }

    /// Cancel every run registered with this scope or its children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the scope when the returned guard is dropped
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Token for a single run
    pub(crate) fn register(&self) -> CancellationToken {
        self.token.child_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reaches_children() {
        let scope = Scope::new();
        let child = scope.child();
        let run = child.register();

        scope.cancel();

        assert!(child.is_cancelled());
        assert!(run.is_cancelled());
    }

    #[test]
    fn test_run_cancel_does_not_leak_upwards() {
        let scope = Scope::new();
        let first = scope.register();
        let second = scope.register();

        first.cancel();

        assert!(!scope.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_drop_guard_cancels() {
        let scope = Scope::new();
        {
            let _guard = scope.cancel_on_drop();
            assert!(!scope.is_cancelled());
        }
        assert!(scope.is_cancelled());
    }

    #[test]
    fn test_cancelled_future_wakes_waiter() {
        let scope = Scope::new();
        let run = scope.register();

        let mut waiter = tokio_test::task::spawn(run.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        scope.cancel();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }
}
