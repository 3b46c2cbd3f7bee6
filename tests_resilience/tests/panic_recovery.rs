//! Panic Recovery Tests
//!
//! Validates that the first task panic is recorded once, and that a
//! panicking task does not take the rest of the kernel down with it.

use core_types::TaskId;
use ipc::Kind;
use kernel::test_utils::wait_until;
use kernel::{named, Context, PanicInfo};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use tests_resilience::{duplex_endpoint, spawn_echo_service, test_bootstrap, TIMEOUT};

/// Test: A panicking task is recorded with its id and payload
#[test]
fn test_task_panic_is_recorded() {
    let (kernel, gate) = test_bootstrap();
    let seen: Arc<Mutex<Vec<PanicInfo>>> = Arc::default();
    {
        let seen = Arc::clone(&seen);
        gate.set_handler(move |info| seen.lock().unwrap().push(info.clone()));
    }

    let id = kernel
        .add_task(named("faulty", |_ctx: Context| {
            let table: Vec<u8> = Vec::new();
            let _value = table[3];
        }))
        .unwrap();

    assert!(wait_until(TIMEOUT, || gate.info().is_some()));
    assert!(gate.in_panic_mode());
    let info = gate.info().unwrap();
    assert_eq!(info.task_id, id);
    assert!(info.value.contains("index out of bounds"));
    assert!(!info.stack.is_empty());

    assert_eq!(kernel.wait_for_tasks(), 1);
    assert_eq!(seen.lock().unwrap().as_slice(), &[info.clone()]);
}

/// Test: Other tasks keep serving after one panics
#[test]
fn test_services_survive_unrelated_panic() {
    let (kernel, gate) = test_bootstrap();
    let service = duplex_endpoint(&kernel);
    let reply = duplex_endpoint(&kernel);
    spawn_echo_service(&kernel, service).unwrap();

    kernel
        .add_task(|_ctx: Context| panic!("unrelated failure"))
        .unwrap();
    assert!(wait_until(TIMEOUT, || gate.in_panic_mode()));

    let ctx = kernel.context(TaskId::INVALID);
    ctx.send_to_cap(service, Kind::new(1), b"still there?", reply)
        .unwrap();
    assert_eq!(ctx.recv(reply).unwrap().payload(), b"still there?");

    kernel.shutdown();
    assert_eq!(kernel.wait_for_tasks(), 2);
}

/// Test: Only the first of many panics reaches the handler
#[test]
fn test_many_panics_fire_handler_once() {
    let (kernel, gate) = test_bootstrap();
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        gate.set_handler(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    let barrier = Arc::new(Barrier::new(8));
    let mut ids = Vec::new();
    for n in 0..8 {
        let barrier = Arc::clone(&barrier);
        let id = kernel
            .add_task(move |_ctx: Context| {
                barrier.wait();
                panic!("panic {}", n);
            })
            .unwrap();
        ids.push(id);
    }

    assert_eq!(kernel.wait_for_tasks(), 8);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let info = gate.info().unwrap();
    assert!(ids.contains(&info.task_id));
    assert!(info.value.starts_with("panic "));
}

/// Test: Two concurrent triggers record exactly one panic
///
/// Whichever trigger wins, the handler sees the same record the gate keeps.
#[test]
fn test_concurrent_triggers_record_the_winner() {
    let (_kernel, gate) = test_bootstrap();
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    gate.set_handler(move |info| tx.lock().unwrap().send(info.clone()).unwrap());

    let barrier = Arc::new(Barrier::new(2));
    let racers: Vec<_> = [(TaskId::new(5), "left"), (TaskId::new(6), "right")]
        .into_iter()
        .map(|(id, value)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                gate.trigger(id, value)
            })
        })
        .collect();
    let winners = racers
        .into_iter()
        .map(|racer| racer.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert!(gate.in_panic_mode());
    let delivered = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(Some(&delivered), gate.info());
    assert!(rx.try_recv().is_err());
}

/// Test: A panic handler installed later replaces the earlier one
#[test]
fn test_handler_replacement_last_writer_wins() {
    let (kernel, gate) = test_bootstrap();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    {
        let first = Arc::clone(&first);
        gate.set_handler(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = Arc::clone(&second);
        gate.set_handler(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
        });
    }

    kernel.add_task(|_ctx: Context| panic!("boom")).unwrap();
    kernel.wait_for_tasks();

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}
