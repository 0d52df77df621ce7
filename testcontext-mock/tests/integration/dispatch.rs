// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::ops::Op;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use testcontext_mock::{TestContext, TestDouble, run};

#[test]
fn overrides_are_called() {
    for op in Op::ALL {
        let called = AtomicBool::new(false);
        let record = run(|tb| {
            op.set_override(tb, &called);
            op.invoke(tb);
        });

        assert!(
            record.panic_value.is_none(),
            "{op:?}: unexpected panic: {record:?}"
        );
        assert!(called.load(Ordering::SeqCst), "{op:?}: override was called");
    }
}

#[test]
fn unset_operations_forward_to_delegate() {
    for op in Op::ALL {
        let called = AtomicBool::new(false);
        let record = run(|parent| {
            op.set_override(parent, &called);
            let tb = TestDouble::with_delegate(parent);
            op.invoke(&tb);
        });

        assert!(
            record.panic_value.is_none(),
            "{op:?}: unexpected panic: {record:?}"
        );
        assert!(
            called.load(Ordering::SeqCst),
            "{op:?}: delegate's override was called"
        );
    }
}

#[test]
fn override_takes_priority_over_delegate() {
    let parent_calls = AtomicUsize::new(0);
    let child_calls = AtomicUsize::new(0);

    let record = run(|parent| {
        parent.set_log_fn(|_| {
            parent_calls.fetch_add(1, Ordering::SeqCst);
        });
        let mut child = TestDouble::with_delegate(parent);
        child.set_log_fn(|_| {
            child_calls.fetch_add(1, Ordering::SeqCst);
        });

        child.log(&[&"to the child"]);
        child.logf(format_args!("{} the parent", "to"));
    });

    assert!(record.passed(), "{record:?}");
    assert_eq!(child_calls.load(Ordering::SeqCst), 1);
    assert_eq!(parent_calls.load(Ordering::SeqCst), 0, "logf isn't log");
}

#[test]
fn override_receives_arguments() {
    let seen = std::sync::Mutex::new(Vec::new());
    let record = run(|tb| {
        tb.set_error_fn(|args| {
            let rendered: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
            seen.lock().expect("not poisoned").push(rendered.join(","));
        });
        tb.set_errorf_fn(|args| {
            seen.lock().expect("not poisoned").push(args.to_string());
        });
        tb.set_setenv_fn(|key, value| {
            seen.lock().expect("not poisoned").push(format!("{key}={value}"));
        });

        tb.error(&[&"expected", &1, &"got", &2]);
        tb.errorf(format_args!("expected {} got {}", 1, 2));
        tb.setenv("KEY", "value");
    });

    assert!(record.failed);
    assert!(!record.exited_early);
    assert_eq!(
        seen.into_inner().expect("not poisoned"),
        vec![
            "expected,1,got,2".to_owned(),
            "expected 1 got 2".to_owned(),
            "KEY=value".to_owned(),
        ]
    );
}

#[test]
fn name_and_temp_dir_from_overrides() {
    let record = run(|tb| {
        tb.set_name_fn(|| "outer::inner".to_owned());
        tb.set_temp_dir_fn(|| "/nonexistent/scratch".into());
        let child = TestDouble::with_delegate(tb);

        assert_eq!(child.name(), "outer::inner");
        assert_eq!(child.temp_dir().as_str(), "/nonexistent/scratch");
    });
    assert!(record.passed(), "{record:?}");
}

#[test]
fn default_temp_dir_is_usable() {
    let record = run(|tb| {
        let dir = tb.temp_dir();
        std::fs::write(dir.join("file.txt"), "contents").expect("wrote to temp dir");
        assert!(dir.join("file.txt").is_file());
    });
    assert!(record.passed(), "{record:?}");
}
