// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testcontext-mock.

use std::{fmt, io};
use thiserror::Error;

/// One of the operations that fail a test and end it immediately.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailNowMethod {
    /// [`TestContext::fail_now`](crate::TestContext::fail_now).
    FailNow,

    /// [`TestContext::fatal`](crate::TestContext::fatal).
    Fatal,

    /// [`TestContext::fatalf`](crate::TestContext::fatalf).
    Fatalf,
}

impl FailNowMethod {
    /// Returns the name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailNow => "fail_now",
            Self::Fatal => "fatal",
            Self::Fatalf => "fatalf",
        }
    }
}

impl fmt::Display for FailNowMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminating operation was called on a thread other than the one that owns the test.
///
/// Raised as a panic payload by contexts created with
/// [`strict_fail_now`](crate::strict_fail_now): the operations it guards have no way to return an
/// error. Recover it with [`std::panic::catch_unwind`] or from the `Err` of a
/// [`JoinHandle::join`](std::thread::JoinHandle::join), then downcast.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error(
    "must not call {} on another thread with test `{test_name}` in {file}:{line}",
    display_call(.method, .format.as_deref(), .args),
)]
pub struct InvalidFailNowError {
    file: String,
    line: u32,
    test_name: String,
    method: FailNowMethod,
    format: Option<String>,
    args: Vec<String>,
}

impl InvalidFailNowError {
    pub(crate) fn new(
        file: impl Into<String>,
        line: u32,
        test_name: impl Into<String>,
        method: FailNowMethod,
        format: Option<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            test_name: test_name.into(),
            method,
            format,
            args,
        }
    }

    /// The file that [`strict_fail_now`](crate::strict_fail_now) was called from.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The line that [`strict_fail_now`](crate::strict_fail_now) was called from.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The name of the test, as reported by the wrapped context.
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// The operation that was called from the wrong thread.
    pub fn method(&self) -> FailNowMethod {
        self.method
    }

    /// For [`FailNowMethod::Fatalf`], the formatted message that was passed in.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// For [`FailNowMethod::Fatal`], the arguments that were passed in, rendered with `Display`.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

fn display_call(method: &FailNowMethod, format: Option<&str>, args: &[String]) -> String {
    match method {
        FailNowMethod::FailNow => "fail_now()".to_owned(),
        FailNowMethod::Fatal => format!("fatal({args:?})"),
        FailNowMethod::Fatalf => format!("fatalf({:?})", format.unwrap_or_default()),
    }
}

/// An error that occurred while setting up a [`Runner`](crate::Runner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The thread to run the test function on could not be spawned.
    #[error("failed to spawn test thread")]
    Spawn(#[source] io::Error),
}
