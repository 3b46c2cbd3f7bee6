//! Capability Safety Tests
//!
//! Validates that authority over endpoints only ever narrows, and that every
//! rejected send leaves the destination untouched.

use core_types::{Rights, TaskId};
use ipc::Kind;
use kernel::Capability;
use kernel_api::SendError;
use tests_resilience::{duplex_endpoint, spawn_echo_service, test_bootstrap};

const REQUEST: Kind = Kind::new(10);

/// Test: Send rejections follow the from-then-to check order
///
/// A sender without a valid own capability is rejected before the
/// destination is even looked at.
#[test]
fn test_send_rejections_in_order() {
    let (kernel, _gate) = test_bootstrap();
    let ctx = kernel.context(TaskId::new(1));
    let ep = duplex_endpoint(&kernel);

    assert_eq!(
        ctx.send(Capability::INVALID, ep.restrict(Rights::SEND), REQUEST, b""),
        Err(SendError::InvalidFromCap)
    );
    assert_eq!(
        ctx.send(ep.restrict(Rights::RECV), ep.restrict(Rights::SEND), REQUEST, b""),
        Err(SendError::FromNoSendRight)
    );
    assert_eq!(
        ctx.send(ep.restrict(Rights::RECV), Capability::INVALID, REQUEST, b""),
        Err(SendError::FromNoSendRight)
    );
    assert!(ctx.try_recv(ep).is_none());
}

/// Test: Narrowing is idempotent and can only remove rights
#[test]
fn test_restrict_never_widens() {
    let (kernel, _gate) = test_bootstrap();
    let send_only = kernel.new_endpoint(Rights::SEND);

    assert_eq!(send_only.restrict(Rights::SEND | Rights::RECV), send_only);
    assert!(!send_only.restrict(Rights::RECV).is_valid());
    assert!(!send_only.restrict(Rights::empty()).is_valid());

    let narrowed = duplex_endpoint(&kernel).restrict(Rights::RECV);
    assert_eq!(narrowed.restrict(Rights::RECV), narrowed);
}

/// Test: A transferred send capability does not grant receive
///
/// The receiver of a transferred capability gets exactly the rights the
/// sender chose to pass on.
#[test]
fn test_transferred_capability_keeps_its_rights() {
    let (kernel, _gate) = test_bootstrap();
    let ctx = kernel.context(TaskId::new(1));
    let inbox = duplex_endpoint(&kernel);
    let secret = duplex_endpoint(&kernel);

    ctx.send_to_cap(inbox, REQUEST, b"", secret.restrict(Rights::SEND))
        .unwrap();
    let granted = ctx.recv(inbox).unwrap().cap;

    assert!(granted.can_send());
    assert!(ctx.recv_chan(granted).is_none());
    assert!(ctx.try_recv(granted).is_none());

    ctx.send_to(granted, REQUEST, b"via grant").unwrap();
    assert_eq!(ctx.try_recv(secret).unwrap().payload(), b"via grant");
}

/// Test: Request/reply through a service only reaches the granted endpoint
#[test]
fn test_reply_capability_routes_response() {
    let (kernel, _gate) = test_bootstrap();
    let service = duplex_endpoint(&kernel);
    let client_a = duplex_endpoint(&kernel);
    let client_b = duplex_endpoint(&kernel);
    spawn_echo_service(&kernel, service.restrict(Rights::RECV)).unwrap();

    let ctx = kernel.context(TaskId::new(1));
    ctx.send_to_cap(
        service.restrict(Rights::SEND),
        REQUEST,
        b"for a",
        client_a.restrict(Rights::SEND),
    )
    .unwrap();

    let reply = ctx.recv(client_a).unwrap();
    assert_eq!(reply.payload(), b"for a");
    assert!(ctx.try_recv(client_b).is_none());

    kernel.shutdown();
    assert_eq!(kernel.wait_for_tasks(), 1);
}

/// Test: A forged-looking endpoint cannot be reached without a capability
///
/// Contexts only accept capabilities, and the invalid capability is
/// rejected before routing.
#[test]
fn test_invalid_capability_cannot_reach_endpoint_zero() {
    let (kernel, _gate) = test_bootstrap();
    let ctx = kernel.context(TaskId::new(1));
    let first = duplex_endpoint(&kernel);
    assert_eq!(first.endpoint().index(), 0);

    assert_eq!(
        ctx.send_to(Capability::INVALID, REQUEST, b""),
        Err(SendError::InvalidToCap)
    );
    assert_eq!(
        ctx.send_to(Capability::default(), REQUEST, b""),
        Err(SendError::InvalidToCap)
    );
    assert!(ctx.try_recv(first).is_none());
}
