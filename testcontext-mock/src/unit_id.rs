// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifying the thread a call is made from.
//!
//! Rust doesn't expose a stable numeric accessor for [`ThreadId`](std::thread::ThreadId), but its
//! `Debug` output is `ThreadId(<digits>)`. We render that into a small stack buffer and keep the
//! digits, so obtaining an identifier never allocates.

use std::{
    fmt::{self, Write as _},
    thread,
};
use tracing::error;

const MARKER: &[u8] = b"ThreadId(";
const DELIMITER: u8 = b')';
const BUF_LEN: usize = 32;

// u64::MAX has 20 decimal digits.
const MAX_DIGITS: usize = 20;

/// An identifier for a live thread.
///
/// Two `UnitId`s compare equal iff they were obtained on the same thread.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct UnitId {
    digits: [u8; MAX_DIGITS],
    len: u8,
}

impl UnitId {
    /// Returns the identifier of the calling thread.
    ///
    /// # Aborts
    ///
    /// Aborts the process if the thread ID can't be rendered or parsed. That means the assumptions
    /// this crate makes about the standard library no longer hold, and no outcome it records can
    /// be trusted.
    pub fn current() -> Self {
        let mut buf = FixedBuf::new();
        if write!(buf, "{:?}", thread::current().id()).is_err() {
            invariant_violated(buf.as_bytes());
        }
        match parse_unit_id(buf.as_bytes()) {
            Some(id) => id,
            None => invariant_violated(buf.as_bytes()),
        }
    }

    /// Returns the numeric part of the identifier as a string.
    pub fn as_str(&self) -> &str {
        // parse_unit_id only accepts ASCII digits.
        std::str::from_utf8(&self.digits[..usize::from(self.len)]).unwrap_or_default()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.as_str())
    }
}

/// Parses the output of `Debug` for a `ThreadId`.
///
/// Scans forward from just past the `ThreadId(` marker up to the closing delimiter. Returns `None`
/// if the marker or delimiter is missing, or if what lies between them isn't a run of digits.
pub(crate) fn parse_unit_id(rendered: &[u8]) -> Option<UnitId> {
    let rest = rendered.strip_prefix(MARKER)?;
    let end = rest.iter().position(|&b| b == DELIMITER)?;
    let digits = &rest[..end];
    if digits.is_empty() || digits.len() > MAX_DIGITS || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let mut id = UnitId {
        digits: [0; MAX_DIGITS],
        len: digits.len() as u8,
    };
    id.digits[..digits.len()].copy_from_slice(digits);
    Some(id)
}

fn invariant_violated(rendered: &[u8]) -> ! {
    error!(
        rendered = %String::from_utf8_lossy(rendered),
        "cannot parse thread ID, aborting"
    );
    std::process::abort()
}

/// A fixed-size buffer that fails instead of growing.
struct FixedBuf {
    buf: [u8; BUF_LEN],
    len: usize,
}

impl FixedBuf {
    fn new() -> Self {
        Self {
            buf: [0; BUF_LEN],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl fmt::Write for FixedBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > BUF_LEN {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}
