// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! A programmable test double for test contexts.
//!
//! Test helpers often take a context that they report failures to. Testing those helpers means
//! checking what they reported, and in particular whether they ended the test early. This crate
//! provides:
//!
//! * [`TestContext`], the contract such helpers are written against.
//! * [`TestDouble`], an implementation where each operation can be overridden, forwarded to a real
//!   context, or left to a default that simply records the outcome.
//! * [`run`], which runs a test function against a fresh double on its own thread and reports
//!   whether it failed, was skipped, ended early, or panicked.
//! * [`strict_fail_now`], which catches terminating operations called from threads other than
//!   the one running the test.
//!
//! # Examples
//!
//! ```
//! use testcontext_mock::{TestContext, run};
//!
//! fn check_positive(tb: &dyn TestContext, n: i64) {
//!     if n <= 0 {
//!         tb.fatalf(format_args!("expected a positive number, got {n}"));
//!     }
//! }
//!
//! let record = run(|tb| check_positive(tb, 5));
//! assert!(record.passed());
//!
//! let record = run(|tb| check_positive(tb, -1));
//! assert!(record.failed);
//! assert!(record.exited_early);
//! ```

mod context;
mod double;
pub mod errors;
mod exit;
mod record;
mod runner;
mod strict;
mod unit_id;

pub use context::{CleanupFn, TestContext};
pub use double::TestDouble;
pub use errors::{FailNowMethod, InvalidFailNowError, RunError};
pub use exit::{EarlyExit, exit_current_unit, is_early_exit};
pub use record::{PanicPayload, Record};
pub use runner::{Runner, run};
pub use strict::strict_fail_now;
pub use unit_id::UnitId;
