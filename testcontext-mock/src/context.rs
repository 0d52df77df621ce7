// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::fmt;

/// A cleanup action registered with [`TestContext::cleanup`].
pub type CleanupFn = Box<dyn FnOnce() + Send + 'static>;

/// The context a test function receives, used to report failures and skips, log, and register
/// cleanups.
///
/// Operations come in plain and formatted variants: plain variants take a list of values that are
/// rendered with `Display` and joined with spaces, while formatted variants take
/// [`format_args!`] output.
///
/// Operations documented as *terminating* end the test function immediately and do not return to
/// their caller. Implementations are expected to do so via
/// [`exit_current_unit`](crate::exit_current_unit).
///
/// Terminating operations must be called from the thread that runs the test function. Use
/// [`strict_fail_now`](crate::strict_fail_now) to catch violations.
pub trait TestContext: Send + Sync {
    /// Registers a function to be called after the test function and its subtests complete.
    ///
    /// Cleanups run in last-registered, first-called order.
    fn cleanup(&self, f: CleanupFn);

    /// Logs `args` and marks the test as failed.
    fn error(&self, args: &[&dyn fmt::Display]);

    /// Logs a formatted message and marks the test as failed.
    fn errorf(&self, args: fmt::Arguments<'_>);

    /// Marks the test as failed, but continues execution.
    fn fail(&self);

    /// Marks the test as failed and ends it. Terminating.
    fn fail_now(&self);

    /// Returns true if the test has been marked as failed.
    fn failed(&self) -> bool;

    /// Logs `args`, marks the test as failed and ends it. Terminating.
    fn fatal(&self, args: &[&dyn fmt::Display]);

    /// Logs a formatted message, marks the test as failed and ends it. Terminating.
    fn fatalf(&self, args: fmt::Arguments<'_>);

    /// Marks the calling function as a test helper, to be skipped when reporting locations.
    fn helper(&self);

    /// Logs `args`.
    fn log(&self, args: &[&dyn fmt::Display]);

    /// Logs a formatted message.
    fn logf(&self, args: fmt::Arguments<'_>);

    /// Returns the name of the running test.
    fn name(&self) -> String;

    /// Sets an environment variable for the duration of the test.
    fn setenv(&self, key: &str, value: &str);

    /// Logs `args` and marks the test as skipped.
    fn skip(&self, args: &[&dyn fmt::Display]);

    /// Marks the test as skipped and ends it. Terminating.
    fn skip_now(&self);

    /// Logs a formatted message and marks the test as skipped.
    fn skipf(&self, args: fmt::Arguments<'_>);

    /// Returns true if the test has been marked as skipped.
    fn skipped(&self) -> bool;

    /// Returns a temporary directory for the test to use, removed once the test completes.
    fn temp_dir(&self) -> Utf8PathBuf;
}

/// Displays a list of arguments joined with spaces.
pub(crate) struct JoinedArgs<'a>(pub(crate) &'a [&'a dyn fmt::Display]);

impl JoinedArgs<'_> {
    pub(crate) fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|arg| arg.to_string()).collect()
    }
}

impl fmt::Display for JoinedArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}
