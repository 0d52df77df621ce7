// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running test functions against a fresh [`TestDouble`].

use crate::{
    double::TestDouble,
    errors::RunError,
    exit::is_early_exit,
    record::{PanicPayload, Record},
};
use std::{
    panic::{self, AssertUnwindSafe},
    thread,
};
use tracing::{debug, debug_span};

/// Runs `f` against a new [`TestDouble`] on a dedicated thread, and returns how it ended.
///
/// `f` is written like a test function: it can fail or skip through the double, end early with a
/// terminating operation, or panic. `run` blocks until the thread has finished, including any
/// cleanups registered with the double, so the returned [`Record`] is final.
///
/// The double's lifetime is tied to the caller's scope, so overrides set up inside `f` may borrow
/// local variables.
///
/// This is shorthand for `Runner::new().run(f)`.
///
/// # Panics
///
/// Panics if the thread can't be spawned. Use [`Runner::run`] to handle that case.
///
/// # Examples
///
/// ```
/// use testcontext_mock::{TestContext, run};
///
/// let record = run(|tb| {
///     tb.fatal(&[&"giving up"]);
///     unreachable!("fatal ends the test function");
/// });
///
/// assert!(record.failed);
/// assert!(record.exited_early);
/// assert!(record.panic_value.is_none());
/// ```
pub fn run<'env, F>(f: F) -> Record
where
    F: FnOnce(&mut TestDouble<'env>) + Send,
{
    match Runner::new().run(f) {
        Ok(record) => record,
        Err(error) => panic!("{error}: {}", error_source(&error)),
    }
}

fn error_source(error: &RunError) -> String {
    std::error::Error::source(error).map_or_else(String::new, |source| source.to_string())
}

/// Configures the thread that test functions are run on.
///
/// # Examples
///
/// ```
/// use testcontext_mock::{Runner, TestContext};
///
/// let mut runner = Runner::new();
/// runner.set_thread_name("my-test");
///
/// let record = runner
///     .run(|tb| {
///         assert_eq!(std::thread::current().name(), Some("my-test"));
///         tb.skip_now();
///     })
///     .expect("thread spawned");
/// assert!(record.skipped);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Runner {
    thread_name: Option<String>,
    stack_size: Option<usize>,
}

impl Runner {
    /// Creates a new runner with default thread settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name of the thread test functions run on.
    pub fn set_thread_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Sets the stack size, in bytes, of the thread test functions run on.
    pub fn set_stack_size(&mut self, stack_size: usize) -> &mut Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Runs `f` against a new [`TestDouble`] on a dedicated thread, and returns how it ended.
    ///
    /// See [`run`] for details.
    pub fn run<'env, F>(&self, f: F) -> Result<Record, RunError>
    where
        F: FnOnce(&mut TestDouble<'env>) + Send,
    {
        let span = debug_span!("run", thread_name = self.thread_name.as_deref());
        let _enter = span.enter();

        let mut builder = thread::Builder::new();
        if let Some(name) = &self.thread_name {
            builder = builder.name(name.clone());
        }
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let mut tb = TestDouble::new();
        let tb_ref = &mut tb;
        let panic_value = thread::scope(|scope| {
            let handle = builder
                .spawn_scoped(scope, move || run_on_current_thread(tb_ref, f))
                .map_err(RunError::Spawn)?;
            // Unwinds escaping run_on_current_thread are reported as panics.
            Ok::<_, RunError>(handle.join().unwrap_or_else(Some))
        })?;

        // The thread has been joined, so every update it made to the double is visible.
        let mut record = tb.snapshot();
        record.panic_value = panic_value;
        debug!(
            failed = record.failed,
            skipped = record.skipped,
            exited_early = record.exited_early,
            panicked = record.panic_value.is_some(),
            "test function finished"
        );
        Ok(record)
    }
}

fn run_on_current_thread<'env, F>(tb: &mut TestDouble<'env>, f: F) -> Option<PanicPayload>
where
    F: FnOnce(&mut TestDouble<'env>),
{
    let mut panic_value = panic::catch_unwind(AssertUnwindSafe(|| f(&mut *tb)))
        .err()
        .and_then(into_panic_value);

    // Cleanups run whether f returned, exited early or panicked. The first panic wins.
    loop {
        match panic::catch_unwind(AssertUnwindSafe(|| tb.run_cleanups())) {
            Ok(()) => break,
            Err(payload) => {
                if let Some(payload) = into_panic_value(payload) {
                    debug!("cleanup panicked");
                    if panic_value.is_none() {
                        panic_value = Some(payload);
                    }
                }
            }
        }
    }

    panic_value
}

fn into_panic_value(payload: PanicPayload) -> Option<PanicPayload> {
    if is_early_exit(&*payload) {
        None
    } else {
        Some(payload)
    }
}
