// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test double.

use crate::{
    context::{CleanupFn, JoinedArgs, TestContext},
    exit::exit_current_unit,
    record::{Record, payload_message},
};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};
use tracing::{debug, info};

type ArgsFn<'a> = Box<dyn Fn(&[&dyn fmt::Display]) + Send + Sync + 'a>;
type FormatFn<'a> = Box<dyn Fn(fmt::Arguments<'_>) + Send + Sync + 'a>;
type UnitFn<'a> = Box<dyn Fn() + Send + Sync + 'a>;
type BoolFn<'a> = Box<dyn Fn() -> bool + Send + Sync + 'a>;

#[derive(Default)]
struct Overrides<'a> {
    cleanup: Option<Box<dyn Fn(CleanupFn) + Send + Sync + 'a>>,
    error: Option<ArgsFn<'a>>,
    errorf: Option<FormatFn<'a>>,
    fail: Option<UnitFn<'a>>,
    fail_now: Option<UnitFn<'a>>,
    failed: Option<BoolFn<'a>>,
    fatal: Option<ArgsFn<'a>>,
    fatalf: Option<FormatFn<'a>>,
    helper: Option<UnitFn<'a>>,
    log: Option<ArgsFn<'a>>,
    logf: Option<FormatFn<'a>>,
    name: Option<Box<dyn Fn() -> String + Send + Sync + 'a>>,
    setenv: Option<Box<dyn Fn(&str, &str) + Send + Sync + 'a>>,
    skip: Option<ArgsFn<'a>>,
    skip_now: Option<UnitFn<'a>>,
    skipf: Option<FormatFn<'a>>,
    skipped: Option<BoolFn<'a>>,
    temp_dir: Option<Box<dyn Fn() -> Utf8PathBuf + Send + Sync + 'a>>,
}

impl Overrides<'_> {
    fn set_names(&self) -> Vec<&'static str> {
        let slots = [
            ("cleanup", self.cleanup.is_some()),
            ("error", self.error.is_some()),
            ("errorf", self.errorf.is_some()),
            ("fail", self.fail.is_some()),
            ("fail_now", self.fail_now.is_some()),
            ("failed", self.failed.is_some()),
            ("fatal", self.fatal.is_some()),
            ("fatalf", self.fatalf.is_some()),
            ("helper", self.helper.is_some()),
            ("log", self.log.is_some()),
            ("logf", self.logf.is_some()),
            ("name", self.name.is_some()),
            ("setenv", self.setenv.is_some()),
            ("skip", self.skip.is_some()),
            ("skip_now", self.skip_now.is_some()),
            ("skipf", self.skipf.is_some()),
            ("skipped", self.skipped.is_some()),
            ("temp_dir", self.temp_dir.is_some()),
        ];
        slots
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }
}

/// The flags tracked by a double while a test runs.
///
/// These are atomics so that a double can be shared with other threads. Calls from other threads
/// are exactly the kind of misuse [`strict_fail_now`](crate::strict_fail_now) is meant to catch,
/// and they should be reported rather than be data races.
#[derive(Debug, Default)]
struct RecordState {
    failed: AtomicBool,
    skipped: AtomicBool,
    exited_early: AtomicBool,
}

impl RecordState {
    fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    fn mark_failed_now(&self) {
        self.failed.store(true, Ordering::SeqCst);
        self.exited_early.store(true, Ordering::SeqCst);
    }

    fn mark_skipped(&self) {
        self.skipped.store(true, Ordering::SeqCst);
    }

    fn mark_skipped_now(&self) {
        self.skipped.store(true, Ordering::SeqCst);
        self.exited_early.store(true, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Record {
        Record {
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            exited_early: self.exited_early.load(Ordering::SeqCst),
            panic_value: None,
        }
    }
}

/// A [`TestContext`] whose behavior can be overridden one operation at a time.
///
/// Most tests obtain a double through [`run`](crate::run), which also reports how the test
/// function ended.
///
/// Every operation is resolved in three steps:
///
/// 1. If an override was set with the corresponding `set_*_fn` method, it is called. Terminating
///    operations then end the test function, even if the override returned.
/// 2. Otherwise, if the double wraps a delegate, the call is forwarded to it as-is. The delegate is
///    responsible for ending the test function if the operation is terminating.
/// 3. Otherwise, a built-in default applies: messages are logged via `tracing`, cleanups are
///    queued, and terminating operations end the test function.
///
/// Whichever step is taken, the double's own record is updated first, so the outcome reported by
/// [`run`](crate::run) doesn't depend on how the double is configured.
///
/// The lifetime `'a` bounds the delegate and any overrides, so overrides can borrow from the
/// enclosing scope.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use testcontext_mock::{TestContext, run};
///
/// let errors = AtomicUsize::new(0);
/// let record = run(|tb| {
///     tb.set_error_fn(|_| {
///         errors.fetch_add(1, Ordering::SeqCst);
///     });
///     tb.error(&[&"first"]);
///     tb.error(&[&"second"]);
/// });
///
/// assert_eq!(errors.load(Ordering::SeqCst), 2);
/// assert!(record.failed);
/// assert!(!record.exited_early);
/// ```
pub struct TestDouble<'a> {
    record: RecordState,
    overrides: Overrides<'a>,
    delegate: Option<&'a dyn TestContext>,
    cleanups: Mutex<Vec<CleanupFn>>,
    temp_dirs: Mutex<Vec<Utf8TempDir>>,
}

impl<'a> TestDouble<'a> {
    /// Creates a new double with no overrides and no delegate.
    pub fn new() -> Self {
        Self {
            record: RecordState::default(),
            overrides: Overrides::default(),
            delegate: None,
            cleanups: Mutex::new(Vec::new()),
            temp_dirs: Mutex::new(Vec::new()),
        }
    }

    /// Creates a new double that forwards operations without an override to `delegate`.
    pub fn with_delegate(delegate: &'a dyn TestContext) -> Self {
        let mut tb = Self::new();
        tb.delegate = Some(delegate);
        tb
    }

    /// Returns the delegate, if any.
    pub fn delegate(&self) -> Option<&'a dyn TestContext> {
        self.delegate
    }

    /// Returns the outcome recorded so far.
    ///
    /// The returned record never has a panic value: panics are only captured by
    /// [`run`](crate::run).
    pub fn snapshot(&self) -> Record {
        self.record.snapshot()
    }

    /// Runs the cleanups queued by [`TestContext::cleanup`], most recently registered first.
    ///
    /// Cleanups registered while this runs are run as well. If a cleanup unwinds, the remaining
    /// ones stay queued.
    ///
    /// Only cleanups handled by the built-in default are queued here: overridden or delegated
    /// cleanups are the responsibility of the override or delegate.
    pub fn run_cleanups(&self) {
        loop {
            // Release the lock before calling f, which may register more cleanups.
            let next = lock(&self.cleanups).pop();
            match next {
                Some(f) => f(),
                None => break,
            }
        }
    }

    /// Overrides [`TestContext::cleanup`].
    pub fn set_cleanup_fn(&mut self, f: impl Fn(CleanupFn) + Send + Sync + 'a) -> &mut Self {
        self.overrides.cleanup = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::error`].
    pub fn set_error_fn(
        &mut self,
        f: impl Fn(&[&dyn fmt::Display]) + Send + Sync + 'a,
    ) -> &mut Self {
        self.overrides.error = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::errorf`].
    pub fn set_errorf_fn(
        &mut self,
        f: impl Fn(fmt::Arguments<'_>) + Send + Sync + 'a,
    ) -> &mut Self {
        self.overrides.errorf = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::fail`].
    pub fn set_fail_fn(&mut self, f: impl Fn() + Send + Sync + 'a) -> &mut Self {
        self.overrides.fail = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::fail_now`].
    ///
    /// The test function ends after `f` returns.
    pub fn set_fail_now_fn(&mut self, f: impl Fn() + Send + Sync + 'a) -> &mut Self {
        self.overrides.fail_now = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::failed`].
    pub fn set_failed_fn(&mut self, f: impl Fn() -> bool + Send + Sync + 'a) -> &mut Self {
        self.overrides.failed = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::fatal`].
    ///
    /// The test function ends after `f` returns.
    pub fn set_fatal_fn(
        &mut self,
        f: impl Fn(&[&dyn fmt::Display]) + Send + Sync + 'a,
    ) -> &mut Self {
        self.overrides.fatal = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::fatalf`].
    ///
    /// The test function ends after `f` returns.
    pub fn set_fatalf_fn(
        &mut self,
        f: impl Fn(fmt::Arguments<'_>) + Send + Sync + 'a,
    ) -> &mut Self {
        self.overrides.fatalf = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::helper`].
    pub fn set_helper_fn(&mut self, f: impl Fn() + Send + Sync + 'a) -> &mut Self {
        self.overrides.helper = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::log`].
    pub fn set_log_fn(&mut self, f: impl Fn(&[&dyn fmt::Display]) + Send + Sync + 'a) -> &mut Self {
        self.overrides.log = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::logf`].
    pub fn set_logf_fn(&mut self, f: impl Fn(fmt::Arguments<'_>) + Send + Sync + 'a) -> &mut Self {
        self.overrides.logf = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::name`].
    pub fn set_name_fn(&mut self, f: impl Fn() -> String + Send + Sync + 'a) -> &mut Self {
        self.overrides.name = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::setenv`].
    pub fn set_setenv_fn(&mut self, f: impl Fn(&str, &str) + Send + Sync + 'a) -> &mut Self {
        self.overrides.setenv = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::skip`].
    pub fn set_skip_fn(
        &mut self,
        f: impl Fn(&[&dyn fmt::Display]) + Send + Sync + 'a,
    ) -> &mut Self {
        self.overrides.skip = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::skip_now`].
    ///
    /// The test function ends after `f` returns.
    pub fn set_skip_now_fn(&mut self, f: impl Fn() + Send + Sync + 'a) -> &mut Self {
        self.overrides.skip_now = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::skipf`].
    pub fn set_skipf_fn(
        &mut self,
        f: impl Fn(fmt::Arguments<'_>) + Send + Sync + 'a,
    ) -> &mut Self {
        self.overrides.skipf = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::skipped`].
    pub fn set_skipped_fn(&mut self, f: impl Fn() -> bool + Send + Sync + 'a) -> &mut Self {
        self.overrides.skipped = Some(Box::new(f));
        self
    }

    /// Overrides [`TestContext::temp_dir`].
    pub fn set_temp_dir_fn(
        &mut self,
        f: impl Fn() -> Utf8PathBuf + Send + Sync + 'a,
    ) -> &mut Self {
        self.overrides.temp_dir = Some(Box::new(f));
        self
    }

    fn create_temp_dir(&self) -> Utf8PathBuf {
        match camino_tempfile::Builder::new()
            .prefix("testcontext-mock-")
            .tempdir()
        {
            Ok(dir) => {
                let path = dir.path().to_owned();
                debug!(test = %self.name(), path = %path, "created temporary directory");
                lock(&self.temp_dirs).push(dir);
                path
            }
            Err(error) => {
                self.fatalf(format_args!("temp_dir: {error}"));
                // fatalf doesn't return here: there's no delegate on this path.
                Utf8PathBuf::new()
            }
        }
    }
}

impl Default for TestDouble<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TestDouble<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDouble")
            .field("record", &self.record)
            .field("overrides", &self.overrides.set_names())
            .field("has_delegate", &self.delegate.is_some())
            .field("pending_cleanups", &lock(&self.cleanups).len())
            .field(
                "temp_dirs",
                &lock(&self.temp_dirs)
                    .iter()
                    .map(|dir| dir.path())
                    .collect::<Vec<&Utf8Path>>(),
            )
            .finish()
    }
}

impl Drop for TestDouble<'_> {
    fn drop(&mut self) {
        // Drops during an early exit or a panic still drain the queue. A cleanup unwinding out of
        // drop while the thread is already unwinding would abort the process.
        let mut first_panic = None;
        loop {
            match panic::catch_unwind(AssertUnwindSafe(|| self.run_cleanups())) {
                Ok(()) => break,
                Err(payload) => {
                    if first_panic.is_none() {
                        first_panic = Some(payload);
                    }
                }
            }
        }

        if let Some(payload) = first_panic {
            if thread::panicking() {
                debug!(
                    panic = payload_message(&*payload).unwrap_or("Box<dyn Any>"),
                    "cleanup panicked while unwinding"
                );
            } else {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl TestContext for TestDouble<'_> {
    fn cleanup(&self, f: CleanupFn) {
        match (&self.overrides.cleanup, self.delegate) {
            (Some(cleanup), _) => cleanup(f),
            (None, Some(delegate)) => delegate.cleanup(f),
            (None, None) => lock(&self.cleanups).push(f),
        }
    }

    fn error(&self, args: &[&dyn fmt::Display]) {
        self.record.mark_failed();
        match (&self.overrides.error, self.delegate) {
            (Some(error), _) => error(args),
            (None, Some(delegate)) => delegate.error(args),
            (None, None) => info!(test = %self.name(), "error: {}", JoinedArgs(args)),
        }
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.record.mark_failed();
        match (&self.overrides.errorf, self.delegate) {
            (Some(errorf), _) => errorf(args),
            (None, Some(delegate)) => delegate.errorf(args),
            (None, None) => info!(test = %self.name(), "error: {args}"),
        }
    }

    fn fail(&self) {
        self.record.mark_failed();
        match (&self.overrides.fail, self.delegate) {
            (Some(fail), _) => fail(),
            (None, Some(delegate)) => delegate.fail(),
            (None, None) => {}
        }
    }

    fn fail_now(&self) {
        self.record.mark_failed_now();
        match (&self.overrides.fail_now, self.delegate) {
            (Some(fail_now), _) => {
                fail_now();
                exit_current_unit()
            }
            (None, Some(delegate)) => delegate.fail_now(),
            (None, None) => exit_current_unit(),
        }
    }

    fn failed(&self) -> bool {
        match (&self.overrides.failed, self.delegate) {
            (Some(failed), _) => failed(),
            (None, Some(delegate)) => delegate.failed(),
            (None, None) => self.record.failed.load(Ordering::SeqCst),
        }
    }

    fn fatal(&self, args: &[&dyn fmt::Display]) {
        self.record.mark_failed_now();
        match (&self.overrides.fatal, self.delegate) {
            (Some(fatal), _) => {
                fatal(args);
                exit_current_unit()
            }
            (None, Some(delegate)) => delegate.fatal(args),
            (None, None) => {
                info!(test = %self.name(), "fatal: {}", JoinedArgs(args));
                exit_current_unit()
            }
        }
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.record.mark_failed_now();
        match (&self.overrides.fatalf, self.delegate) {
            (Some(fatalf), _) => {
                fatalf(args);
                exit_current_unit()
            }
            (None, Some(delegate)) => delegate.fatalf(args),
            (None, None) => {
                info!(test = %self.name(), "fatal: {args}");
                exit_current_unit()
            }
        }
    }

    fn helper(&self) {
        match (&self.overrides.helper, self.delegate) {
            (Some(helper), _) => helper(),
            (None, Some(delegate)) => delegate.helper(),
            (None, None) => {}
        }
    }

    fn log(&self, args: &[&dyn fmt::Display]) {
        match (&self.overrides.log, self.delegate) {
            (Some(log), _) => log(args),
            (None, Some(delegate)) => delegate.log(args),
            (None, None) => debug!(test = %self.name(), "{}", JoinedArgs(args)),
        }
    }

    fn logf(&self, args: fmt::Arguments<'_>) {
        match (&self.overrides.logf, self.delegate) {
            (Some(logf), _) => logf(args),
            (None, Some(delegate)) => delegate.logf(args),
            (None, None) => debug!(test = %self.name(), "{args}"),
        }
    }

    fn name(&self) -> String {
        match (&self.overrides.name, self.delegate) {
            (Some(name), _) => name(),
            (None, Some(delegate)) => delegate.name(),
            (None, None) => String::new(),
        }
    }

    fn setenv(&self, key: &str, value: &str) {
        match (&self.overrides.setenv, self.delegate) {
            (Some(setenv), _) => setenv(key, value),
            (None, Some(delegate)) => delegate.setenv(key, value),
            (None, None) => debug!(test = %self.name(), key, value, "ignoring setenv"),
        }
    }

    fn skip(&self, args: &[&dyn fmt::Display]) {
        self.record.mark_skipped();
        match (&self.overrides.skip, self.delegate) {
            (Some(skip), _) => skip(args),
            (None, Some(delegate)) => delegate.skip(args),
            (None, None) => debug!(test = %self.name(), "skip: {}", JoinedArgs(args)),
        }
    }

    fn skip_now(&self) {
        self.record.mark_skipped_now();
        match (&self.overrides.skip_now, self.delegate) {
            (Some(skip_now), _) => {
                skip_now();
                exit_current_unit()
            }
            (None, Some(delegate)) => delegate.skip_now(),
            (None, None) => exit_current_unit(),
        }
    }

    fn skipf(&self, args: fmt::Arguments<'_>) {
        self.record.mark_skipped();
        match (&self.overrides.skipf, self.delegate) {
            (Some(skipf), _) => skipf(args),
            (None, Some(delegate)) => delegate.skipf(args),
            (None, None) => debug!(test = %self.name(), "skip: {args}"),
        }
    }

    fn skipped(&self) -> bool {
        match (&self.overrides.skipped, self.delegate) {
            (Some(skipped), _) => skipped(),
            (None, Some(delegate)) => delegate.skipped(),
            (None, None) => self.record.skipped.load(Ordering::SeqCst),
        }
    }

    fn temp_dir(&self) -> Utf8PathBuf {
        match (&self.overrides.temp_dir, self.delegate) {
            (Some(temp_dir), _) => temp_dir(),
            (None, Some(delegate)) => delegate.temp_dir(),
            (None, None) => self.create_temp_dir(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The protected data is a plain list, so a panic while it was locked can't have left it in an
    // inconsistent state.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
