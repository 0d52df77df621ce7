// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{any::Any, fmt};

/// A payload captured from a panic.
pub type PanicPayload = Box<dyn Any + Send + 'static>;

/// The outcome of a test function, as returned by [`run`](crate::run).
///
/// The fields are independent of each other: for example, a test can both fail and be skipped.
#[derive(Default)]
pub struct Record {
    /// True if the test was marked as failed, e.g. by
    /// [`TestContext::error`](crate::TestContext::error).
    pub failed: bool,

    /// True if the test was marked as skipped, e.g. by
    /// [`TestContext::skip`](crate::TestContext::skip).
    pub skipped: bool,

    /// True if the test function was ended early by a terminating operation, e.g.
    /// [`TestContext::fatal`](crate::TestContext::fatal) or
    /// [`TestContext::skip_now`](crate::TestContext::skip_now).
    pub exited_early: bool,

    /// The payload of a panic that escaped the test function or one of its cleanups.
    ///
    /// This is only ever set by [`run`](crate::run).
    pub panic_value: Option<PanicPayload>,
}

impl Record {
    /// Returns true if the test neither failed, was skipped, nor panicked.
    pub fn passed(&self) -> bool {
        !self.failed && !self.skipped && self.panic_value.is_none()
    }

    /// Returns the panic payload downcast to `T`, if there is one of that type.
    pub fn panic_value_as<T: Any>(&self) -> Option<&T> {
        self.panic_value.as_ref()?.downcast_ref::<T>()
    }

    /// Returns the panic message, if the test panicked with a string payload.
    ///
    /// This is the case for `panic!` invocations, with or without format arguments.
    pub fn panic_message(&self) -> Option<&str> {
        self.panic_value.as_deref().and_then(payload_message)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("failed", &self.failed)
            .field("skipped", &self.skipped)
            .field("exited_early", &self.exited_early)
            .field(
                "panic_value",
                &self.panic_value.as_deref().map(PayloadDebug),
            )
            .finish()
    }
}

pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        Some(s)
    } else {
        payload.downcast_ref::<String>().map(String::as_str)
    }
}

struct PayloadDebug<'a>(&'a (dyn Any + Send));

impl fmt::Debug for PayloadDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match payload_message(self.0) {
            Some(message) => write!(f, "{message:?}"),
            None => f.write_str("Box<dyn Any>"),
        }
    }
}
