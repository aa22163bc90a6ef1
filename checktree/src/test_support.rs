//! Test-only unit builders with scripted completion behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;

use crate::core::outcome::Signal;
use crate::work::{Completion, Unit, WorkTree};

/// Unit that succeeds immediately with `value`.
pub fn succeed(value: impl Into<Value>) -> Unit {
    let value = value.into();
    Unit::new(move |completion: Completion| {
        let value = value.clone();
        async move { completion.succeed(value) }
    })
}

/// Unit that fails immediately with `error`.
pub fn fail(error: impl Into<Value>) -> Unit {
    let error = error.into();
    Unit::new(move |completion: Completion| {
        let error = error.clone();
        async move { completion.fail(error) }
    })
}

/// Unit that breaks the contract by signalling twice in a row.
pub fn signal_twice(first: Signal, second: Signal) -> Unit {
    Unit::new(move |completion: Completion| {
        let (first, second) = (first.clone(), second.clone());
        async move {
            completion.signal(first);
            completion.signal(second);
        }
    })
}

/// Unit that increments `counter` on every invocation, then succeeds.
pub fn counting(counter: Arc<AtomicUsize>) -> Unit {
    Unit::new(move |completion: Completion| {
        let counter = counter.clone();
        async move {
            let calls = counter.fetch_add(1, Ordering::SeqCst) + 1;
            completion.succeed(calls);
        }
    })
}

/// Unit that appends its key to `log` when it starts, then succeeds.
pub fn recording(log: Arc<Mutex<Vec<String>>>) -> Unit {
    Unit::new(move |completion: Completion| {
        let log = log.clone();
        async move {
            log.lock().expect("log lock").push(completion.key().to_string());
            completion.succeed(Value::Null);
        }
    })
}

/// Unit that sleeps before signalling.
pub fn delayed(delay: Duration, signal: Signal) -> Unit {
    Unit::new(move |completion: Completion| {
        let signal = signal.clone();
        async move {
            tokio::time::sleep(delay).await;
            completion.signal(signal);
        }
    })
}

/// Unit whose body returns at once and signals from a spawned task.
pub fn spawned(signal: Signal) -> Unit {
    Unit::new(move |completion: Completion| {
        let signal = signal.clone();
        async move {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                completion.signal(signal);
            });
        }
    })
}

/// Unit that signals `first` inline and `second` from a spawned task after the
/// scheduler has moved on. `finished` is notified once the second signal is sent.
pub fn late_second_signal(first: Signal, second: Signal, finished: Arc<Notify>) -> Unit {
    Unit::new(move |completion: Completion| {
        let (first, second, finished) = (first.clone(), second.clone(), finished.clone());
        async move {
            completion.signal(first);
            let late = completion.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                late.signal(second);
                finished.notify_one();
            });
        }
    })
}

/// Unit that signals and then never returns.
pub fn lingering(signal: Signal) -> Unit {
    Unit::new(move |completion: Completion| {
        let signal = signal.clone();
        async move {
            completion.signal(signal);
            std::future::pending::<()>().await;
        }
    })
}

/// Unit that signals `first`, keeps running for `delay`, then signals `second`.
pub fn resignal_after(delay: Duration, first: Signal, second: Signal) -> Unit {
    Unit::new(move |completion: Completion| {
        let (first, second) = (first.clone(), second.clone());
        async move {
            completion.signal(first);
            tokio::time::sleep(delay).await;
            completion.signal(second);
        }
    })
}

/// Unit that drops its completion handle without signalling.
pub fn silent() -> Unit {
    Unit::new(|completion: Completion| async move { drop(completion) })
}

/// `{a: ok "a", b: {e: err "e", c: ok "c"}}`.
pub fn mixed_tree() -> WorkTree {
    WorkTree::new().with("a", succeed("a")).with(
        "b",
        WorkTree::new().with("e", fail("e")).with("c", succeed("c")),
    )
}
