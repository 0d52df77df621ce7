// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catching terminating operations called from the wrong thread.
//!
//! [`fail_now`](TestContext::fail_now), [`fatal`](TestContext::fatal) and
//! [`fatalf`](TestContext::fatalf) end the test function by unwinding the thread they're called
//! on. Called from a thread the test spawned, for example a server's request handler, they end
//! that thread instead and the test carries on as if nothing happened.
//!
//! [`strict_fail_now`] turns this mistake into a loud [`InvalidFailNowError`] panic.

use crate::{
    context::{JoinedArgs, TestContext},
    double::TestDouble,
    errors::{FailNowMethod, InvalidFailNowError},
    unit_id::UnitId,
};
use std::{
    panic::{self, Location},
    sync::Arc,
};
use tracing::{debug, error};

/// Wraps `tb` so that calling [`fail_now`](TestContext::fail_now),
/// [`fatal`](TestContext::fatal) or [`fatalf`](TestContext::fatalf) from a thread other than the
/// current one panics with an [`InvalidFailNowError`].
///
/// The error records the location `strict_fail_now` was called from and the name of the test. On
/// the current thread, the three operations are forwarded to `tb` unchanged. All other operations,
/// including [`skip_now`](TestContext::skip_now), are forwarded without checks.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use testcontext_mock::{InvalidFailNowError, TestContext, TestDouble, strict_fail_now};
///
/// let tb = TestDouble::new();
/// let strict = strict_fail_now(&tb);
///
/// let payload = thread::scope(|s| s.spawn(|| strict.fatal(&[&"from a handler"])).join())
///     .expect_err("fatal on another thread panics");
/// let error = payload
///     .downcast::<InvalidFailNowError>()
///     .expect("payload is InvalidFailNowError");
/// assert_eq!(error.args(), ["from a handler"]);
/// assert!(!tb.failed());
/// ```
#[track_caller]
pub fn strict_fail_now(tb: &dyn TestContext) -> TestDouble<'_> {
    let owner = Arc::new(Owner::new(tb, Location::caller()));
    debug!(
        owner = %owner.unit,
        test_name = %owner.test_name,
        location = %owner.location,
        "guarding terminating operations"
    );

    let mut strict = TestDouble::with_delegate(tb);

    let fail_now_owner = owner.clone();
    strict.set_fail_now_fn(move || {
        if !fail_now_owner.is_current() {
            fail_now_owner.raise(FailNowMethod::FailNow, None, Vec::new());
        }
        tb.fail_now();
    });

    let fatal_owner = owner.clone();
    strict.set_fatal_fn(move |args| {
        if !fatal_owner.is_current() {
            fatal_owner.raise(FailNowMethod::Fatal, None, JoinedArgs(args).to_strings());
        }
        tb.fatal(args);
    });

    strict.set_fatalf_fn(move |args| {
        if !owner.is_current() {
            owner.raise(FailNowMethod::Fatalf, Some(args.to_string()), Vec::new());
        }
        tb.fatalf(args);
    });

    strict
}

/// The thread that owns a test, and where that was established.
struct Owner {
    unit: UnitId,
    location: &'static Location<'static>,
    test_name: String,
}

impl Owner {
    fn new(tb: &dyn TestContext, location: &'static Location<'static>) -> Self {
        Self {
            unit: UnitId::current(),
            location,
            test_name: tb.name(),
        }
    }

    fn is_current(&self) -> bool {
        UnitId::current() == self.unit
    }

    fn raise(&self, method: FailNowMethod, format: Option<String>, args: Vec<String>) -> ! {
        let err = InvalidFailNowError::new(
            self.location.file(),
            self.location.line(),
            &self.test_name,
            method,
            format,
            args,
        );
        // Panic hooks only print string payloads.
        error!(owner = %self.unit, current = %UnitId::current(), "{err}");
        panic::panic_any(err)
    }
}
