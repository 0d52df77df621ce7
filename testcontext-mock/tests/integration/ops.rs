// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use testcontext_mock::{TestContext, TestDouble};

/// Every operation of [`TestContext`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Op {
    Cleanup,
    Error,
    Errorf,
    Fail,
    FailNow,
    Failed,
    Fatal,
    Fatalf,
    Helper,
    Log,
    Logf,
    Name,
    Setenv,
    Skip,
    SkipNow,
    Skipf,
    Skipped,
    TempDir,
}

/// The flags an operation is expected to set in the record.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Flags {
    pub(crate) failed: bool,
    pub(crate) skipped: bool,
    pub(crate) exited_early: bool,
}

impl Op {
    pub(crate) const ALL: [Op; 18] = [
        Op::Cleanup,
        Op::Error,
        Op::Errorf,
        Op::Fail,
        Op::FailNow,
        Op::Failed,
        Op::Fatal,
        Op::Fatalf,
        Op::Helper,
        Op::Log,
        Op::Logf,
        Op::Name,
        Op::Setenv,
        Op::Skip,
        Op::SkipNow,
        Op::Skipf,
        Op::Skipped,
        Op::TempDir,
    ];

    pub(crate) fn expected_flags(self) -> Flags {
        let failed = Flags {
            failed: true,
            ..Flags::default()
        };
        let skipped = Flags {
            skipped: true,
            ..Flags::default()
        };
        match self {
            Op::Error | Op::Errorf | Op::Fail => failed,
            Op::FailNow | Op::Fatal | Op::Fatalf => Flags {
                exited_early: true,
                ..failed
            },
            Op::Skip | Op::Skipf => skipped,
            Op::SkipNow => Flags {
                exited_early: true,
                ..skipped
            },
            Op::Cleanup
            | Op::Failed
            | Op::Helper
            | Op::Log
            | Op::Logf
            | Op::Name
            | Op::Setenv
            | Op::Skipped
            | Op::TempDir => Flags::default(),
        }
    }

    /// Calls the operation on `tb` with placeholder arguments.
    pub(crate) fn invoke(self, tb: &dyn TestContext) {
        match self {
            Op::Cleanup => tb.cleanup(Box::new(|| {})),
            Op::Error => tb.error(&[&"error"]),
            Op::Errorf => tb.errorf(format_args!("error {}", 1)),
            Op::Fail => tb.fail(),
            Op::FailNow => tb.fail_now(),
            Op::Failed => {
                tb.failed();
            }
            Op::Fatal => tb.fatal(&[&"fatal"]),
            Op::Fatalf => tb.fatalf(format_args!("fatal {}", 1)),
            Op::Helper => tb.helper(),
            Op::Log => tb.log(&[&"log"]),
            Op::Logf => tb.logf(format_args!("log {}", 1)),
            Op::Name => {
                tb.name();
            }
            Op::Setenv => tb.setenv("TESTCONTEXT_MOCK_KEY", "value"),
            Op::Skip => tb.skip(&[&"skip"]),
            Op::SkipNow => tb.skip_now(),
            Op::Skipf => tb.skipf(format_args!("skip {}", 1)),
            Op::Skipped => {
                tb.skipped();
            }
            Op::TempDir => {
                tb.temp_dir();
            }
        }
    }

    /// Sets up an override for the operation on `tb` that stores `true` into `called`.
    pub(crate) fn set_override<'a>(self, tb: &mut TestDouble<'a>, called: &'a AtomicBool) {
        let mark = move || called.store(true, Ordering::SeqCst);
        match self {
            Op::Cleanup => {
                tb.set_cleanup_fn(move |_| mark());
            }
            Op::Error => {
                tb.set_error_fn(move |_| mark());
            }
            Op::Errorf => {
                tb.set_errorf_fn(move |_| mark());
            }
            Op::Fail => {
                tb.set_fail_fn(mark);
            }
            Op::FailNow => {
                tb.set_fail_now_fn(mark);
            }
            Op::Failed => {
                tb.set_failed_fn(move || {
                    mark();
                    false
                });
            }
            Op::Fatal => {
                tb.set_fatal_fn(move |_| mark());
            }
            Op::Fatalf => {
                tb.set_fatalf_fn(move |_| mark());
            }
            Op::Helper => {
                tb.set_helper_fn(mark);
            }
            Op::Log => {
                tb.set_log_fn(move |_| mark());
            }
            Op::Logf => {
                tb.set_logf_fn(move |_| mark());
            }
            Op::Name => {
                tb.set_name_fn(move || {
                    mark();
                    String::new()
                });
            }
            Op::Setenv => {
                tb.set_setenv_fn(move |_, _| mark());
            }
            Op::Skip => {
                tb.set_skip_fn(move |_| mark());
            }
            Op::SkipNow => {
                tb.set_skip_now_fn(mark);
            }
            Op::Skipf => {
                tb.set_skipf_fn(move |_| mark());
            }
            Op::Skipped => {
                tb.set_skipped_fn(move || {
                    mark();
                    false
                });
            }
            Op::TempDir => {
                tb.set_temp_dir_fn(move || {
                    mark();
                    Utf8PathBuf::new()
                });
            }
        }
    }
}
