// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ending a test early.

use std::{any::Any, panic};

/// The unwind payload used to end a test early.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct EarlyExit;

/// Stops the current thread's test function.
///
/// This unwinds the current thread with an [`EarlyExit`] payload: destructors of live values still
/// run on the way out, and [`run`](crate::run) recognizes the payload at the thread boundary so
/// that it isn't reported as a panic. Unwinding through [`std::panic::resume_unwind`] skips the
/// panic hook, so nothing is printed.
///
/// Code that catches unwinds itself should hand `EarlyExit` payloads back to
/// [`resume_unwind`](std::panic::resume_unwind).
///
/// This requires `panic = "unwind"`. With `panic = "abort"`, ending a test early aborts the
/// process.
pub fn exit_current_unit() -> ! {
    panic::resume_unwind(Box::new(EarlyExit))
}

/// Returns true if `payload` was produced by [`exit_current_unit`].
pub fn is_early_exit(payload: &(dyn Any + Send)) -> bool {
    payload.is::<EarlyExit>()
}
