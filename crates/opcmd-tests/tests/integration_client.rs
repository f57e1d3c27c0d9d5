// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Client Integration Tests
//!
//! End-to-end command execution against the simulated instrument.
//!
//! ## Test Categories
//!
//! - `test_reject_*`: failures that must never reach the server
//! - `test_execute_*`: successful calls and result decoding
//! - `test_status_*`: bad status handling
//! - `test_rebind_*`: session replacement

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use opcmd_core::error::{ArgumentError, CatalogError, SessionError, TransportError};
use opcmd_core::result::{LockState, MethodResult};
use opcmd_core::session::CallResponse;
use opcmd_core::{ExtensionObject, NodeId, Session};
use opcmd_tests::prelude::*;

fn envelope(body: Vec<u8>) -> TaggedValue {
    TaggedValue::ExtensionObject(ExtensionObject::binary(NodeId::numeric(1, 9000), body))
}

// =============================================================================
// Rejected Before Calling
// =============================================================================

#[tokio::test]
async fn test_reject_unknown_command_without_calls() {
    init_test_logging();
    let catalog = CatalogFixtures::ten_commands();
    assert_eq!(catalog.len(), 10);
    let server = SimulatedServer::instrument();
    let client = connect(catalog, &server).await;

    for name in ["Reboot", "GetAvailableDiskSpace", "requestlock"] {
        let error = client.execute(name, vec![]).await.unwrap_err();
        assert!(
            matches!(&error, CommandError::Catalog(CatalogError::UnknownCommand { name: n }) if n == name),
            "{}: {}",
            name,
            error
        );
    }

    assert_eq!(server.calls(), 0);
    assert_eq!(client.statistics().rejected(), 3);
    assert_eq!(client.statistics().executions(), 0);
}

#[tokio::test]
async fn test_reject_argument_count_without_calls() {
    let server = SimulatedServer::instrument();
    let client = connect(MethodCatalog::builtin(), &server).await;

    let error = client.execute("DeleteCellType", vec![]).await.unwrap_err();
    assert!(matches!(
        error,
        CommandError::Argument(ArgumentError::CountMismatch { expected: 1, actual: 0, .. })
    ));

    let error = client
        .execute(
            "RequestLock",
            vec![TaggedValue::Boolean(true)],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        CommandError::Argument(ArgumentError::CountMismatch { expected: 0, actual: 1, .. })
    ));

    assert_eq!(server.calls(), 0);
}

#[tokio::test]
async fn test_reject_argument_type_without_calls() {
    let server = SimulatedServer::instrument();
    let client = connect(MethodCatalog::builtin(), &server).await;

    let error = client
        .execute(
            "DeleteSampleResults",
            vec![TaggedValue::Guid(Uuid::nil()), TaggedValue::Boolean(false)],
        )
        .await
        .unwrap_err();
    match error {
        CommandError::Argument(ArgumentError::TypeMismatch { index, name, .. }) => {
            assert_eq!(index, 0);
            assert_eq!(name, "uuids");
        }
        other => panic!("unexpected error: {other}"),
    }

    let error = client
        .execute_text("DeleteSampleResults", &["", "maybe"])
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        CommandError::Argument(ArgumentError::InvalidValue { .. })
    ));

    assert_eq!(server.calls(), 0);
    assert_eq!(client.statistics().rejected(), 2);
}

#[tokio::test]
async fn test_reject_when_unbound() {
    let server = SimulatedServer::instrument();
    let client = connect(MethodCatalog::builtin(), &server).await;
    client.unbind();

    assert!(!client.is_bound());
    let error = client.execute("RequestLock", vec![]).await.unwrap_err();
    assert!(matches!(error, CommandError::Transport(TransportError::NotConnected)));
    assert!(error.is_retryable());
    assert_eq!(server.calls(), 0);
    assert_eq!(client.statistics().rejected(), 1);
    assert_eq!(client.statistics().executions(), 0);
}

// =============================================================================
// Execution
// =============================================================================

#[tokio::test]
async fn test_execute_lock_round_trip() {
    let catalog = MethodCatalog::builtin();
    let server = SimulatedServer::from_catalog(&catalog);
    server.reply_with_result(&catalog, "RequestLock", &ResultFixtures::locked());
    let client = connect(catalog, &server).await;

    let result = client.run("RequestLock", vec![]).await.unwrap();
    assert_eq!(result.header.method_result, MethodResult::Success);
    assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));

    let history = server.call_history();
    assert_eq!(history.len(), 1);
    let descriptor = client.registry().unwrap().descriptor("RequestLock").unwrap();
    assert_eq!(history[0].object_id, descriptor.parent.id);
    assert_eq!(history[0].method_id, descriptor.method.id);
    assert!(history[0].input_arguments.is_empty());
    assert_eq!(client.statistics().executions(), 1);
}

#[tokio::test]
async fn test_execute_text_arguments() {
    let catalog = MethodCatalog::builtin();
    let server = SimulatedServer::from_catalog(&catalog);
    server.reply_with_result(&catalog, "DeleteSampleResults", &ResultFixtures::failure("in use"));
    let client = connect(catalog, &server).await;

    let first = Uuid::from_u128(1);
    let second = Uuid::from_u128(2);
    let uuids = format!("{}, {}", first, second);
    let outcome = client
        .execute_text("DeleteSampleResults", &[uuids.as_str(), "yes"])
        .await
        .unwrap();

    assert!(outcome.is_good());
    let decoded = outcome.decoded().unwrap();
    assert_eq!(decoded.header.method_result, MethodResult::Failure);
    assert_eq!(decoded.header.response_description, "in use");

    let history = server.call_history();
    assert_eq!(
        history[0].input_arguments,
        vec![
            TaggedValue::Array(vec![TaggedValue::Guid(first), TaggedValue::Guid(second)]),
            TaggedValue::Boolean(true),
        ]
    );
}

#[tokio::test]
async fn test_execute_decode_failure_is_reported() {
    let catalog = MethodCatalog::builtin();
    let server = SimulatedServer::from_catalog(&catalog);
    let body = ResultFixtures::encode(
        &catalog,
        "GetAvailableDiskSpace",
        &ResultFixtures::disk_space(1, 2, 3, 4, 5),
    );
    server.reply(
        "GetAvailableDiskSpace",
        CallResponse::good(vec![envelope(body[..body.len() - 1].to_vec())]),
    );
    let client = connect(catalog, &server).await;

    let outcome = client.execute("GetAvailableDiskSpace", vec![]).await.unwrap();
    assert!(outcome.is_good());
    assert!(matches!(&outcome.result, Some(Err(e)) if e.is_truncated()));
    assert_eq!(client.statistics().decode_failures(), 1);

    let error = outcome.into_result().unwrap_err();
    assert!(error.partial_header().and_then(|p| p.complete()).is_some());
}

#[tokio::test]
async fn test_execute_good_status_without_outputs() {
    let server = SimulatedServer::instrument();
    let client = connect(MethodCatalog::builtin(), &server).await;

    let outcome = client.execute("EjectStage", vec![]).await.unwrap();
    assert!(outcome.is_good());
    assert!(outcome.result.is_none());
    assert!(matches!(outcome.into_result(), Err(CommandError::Decode(_))));
}

#[tokio::test]
async fn test_execute_concurrently_on_shared_registry() {
    let catalog = MethodCatalog::builtin();
    let server = SimulatedServer::from_catalog(&catalog);
    server.reply_with_result(&catalog, "GetAvailableDiskSpace", &ResultFixtures::disk_space(0, 0, 0, 10, 20));
    let client = Arc::new(connect(catalog, &server).await);
    let browsed = server.browse_calls();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.run("GetAvailableDiskSpace", vec![]).await })
        })
        .collect();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert!(matches!(result.tail, VariantTail::DiskSpace(ref s) if s.total_size_bytes == 20));
    }

    assert_eq!(server.calls(), 8);
    assert_eq!(server.browse_calls(), browsed);
}

#[tokio::test]
async fn test_execute_timeout() {
    let server = SimulatedServer::instrument();
    server.set_call_latency(Duration::from_millis(500));
    let session: Arc<dyn Session> = server.clone();
    let client = CommandClient::connect(
        MethodCatalog::builtin(),
        ClientOptions::default().with_call_timeout(Duration::from_millis(20)),
        session,
    )
    .await
    .unwrap();

    let error = client.execute("Pause", vec![]).await.unwrap_err();
    assert!(matches!(error, CommandError::Transport(TransportError::Timeout { .. })));
    assert!(error.is_retryable());
    assert_eq!(client.statistics().rejected(), 0);
}

// =============================================================================
// Bad Status
// =============================================================================

#[tokio::test]
async fn test_status_bad_without_outputs() {
    let server = SimulatedServer::instrument();
    server.reply_status("Stop", StatusCode::BAD_USER_ACCESS_DENIED);
    let client = connect(MethodCatalog::builtin(), &server).await;

    let outcome = client.execute("Stop", vec![]).await.unwrap();
    assert!(!outcome.is_good());
    assert!(outcome.result.is_none());
    assert_eq!(client.statistics().bad_status(), 1);

    match outcome.into_result() {
        Err(CommandError::ServerStatus { command, status, result, .. }) => {
            assert_eq!(command, "Stop");
            assert_eq!(status, StatusCode::BAD_USER_ACCESS_DENIED);
            assert!(result.is_none());
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_status_bad_keeps_decoded_result() {
    let catalog = MethodCatalog::builtin();
    let server = SimulatedServer::from_catalog(&catalog);
    let body = ResultFixtures::encode(&catalog, "Resume", &ResultFixtures::failure("door open"));
    server.reply(
        "Resume",
        CallResponse {
            status: StatusCode::BAD_NOT_EXECUTABLE,
            outputs: vec![envelope(body)],
            ..CallResponse::default()
        },
    );
    let client = connect(catalog, &server).await;

    let error = client.run("Resume", vec![]).await.unwrap_err();
    match error {
        CommandError::ServerStatus { status, result, .. } => {
            assert_eq!(status, StatusCode::BAD_NOT_EXECUTABLE);
            let result = result.expect("result decoded alongside the status");
            assert_eq!(result.header.response_description, "door open");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_status_bad_keeps_header_of_failed_decode() {
    let catalog = MethodCatalog::builtin();
    let server = SimulatedServer::from_catalog(&catalog);
    let header_only = ResultFixtures::encode(&catalog, "Pause", &ResultFixtures::failure("disk offline"));
    server.reply(
        "GetAvailableDiskSpace",
        CallResponse {
            status: StatusCode::BAD_NOT_EXECUTABLE,
            outputs: vec![envelope(header_only)],
            ..CallResponse::default()
        },
    );
    let client = connect(catalog, &server).await;

    let error = client.run("GetAvailableDiskSpace", vec![]).await.unwrap_err();
    assert_eq!(client.statistics().decode_failures(), 1);

    let header = error.partial_header().expect("header read before the missing tail");
    assert_eq!(header.method_result, Some(MethodResult::Failure));
    assert_eq!(header.response_description.as_deref(), Some("disk offline"));
    match error {
        CommandError::ServerStatus { status, result, decode_error, .. } => {
            assert_eq!(status, StatusCode::BAD_NOT_EXECUTABLE);
            assert!(result.is_none());
            assert!(decode_error.expect("decode failure kept").is_truncated());
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Rebinding
// =============================================================================

#[tokio::test]
async fn test_rebind_rejects_stale_descriptor() {
    let catalog = MethodCatalog::builtin();
    let first = SimulatedServer::from_catalog(&catalog);
    let second = SimulatedServer::from_catalog(&catalog);
    second.reply_with_result(&catalog, "ReleaseLock", &ResultFixtures::locked());
    let client = connect(catalog, &first).await;

    let stale = client.registry().unwrap().descriptor("ReleaseLock").unwrap();
    let old_context = client.context().unwrap();
    let session: Arc<dyn Session> = second.clone();
    let registry = client.rebind(session).await.unwrap();

    assert!(!old_context.is_valid());
    assert_eq!(registry.generation(), stale.generation + 1);
    assert_eq!(client.statistics().rebinds(), 2);

    let error = client.invoke(&stale, vec![]).await.unwrap_err();
    assert!(matches!(
        error,
        CommandError::Session(SessionError::StaleDescriptor { .. })
    ));

    let result = client.run("ReleaseLock", vec![]).await.unwrap();
    assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));
    assert_eq!(first.calls(), 0);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn test_rebind_picks_up_new_address_space() {
    let catalog = MethodCatalog::builtin();
    let partial = Arc::new(SimulatedServer::default());
    let methods = partial.add_path(&["ViCellBluStateObject", "Methods"]);
    partial.add_method(&methods, "RequestLock");
    let client = connect(catalog.clone(), &partial).await;

    let error = client.execute("GetAvailableDiskSpace", vec![]).await.unwrap_err();
    assert!(matches!(error, CommandError::Resolve(_)));

    let full = SimulatedServer::from_catalog(&catalog);
    let session: Arc<dyn Session> = full.clone();
    client.rebind(session).await.unwrap();

    let outcome = client.execute("GetAvailableDiskSpace", vec![]).await.unwrap();
    assert!(outcome.is_good());
    assert_eq!(full.calls(), 1);
    assert_eq!(partial.calls(), 0);
}

#[tokio::test]
async fn test_rebind_older_build_does_not_replace_newer() {
    let catalog = MethodCatalog::builtin();
    let initial = SimulatedServer::from_catalog(&catalog);
    let slow = SimulatedServer::from_catalog(&catalog);
    slow.set_browse_latency(Duration::from_millis(100));
    let fast = SimulatedServer::from_catalog(&catalog);
    fast.reply_with_result(&catalog, "RequestLock", &ResultFixtures::locked());
    let client = connect(catalog, &initial).await;

    let slow_session: Arc<dyn Session> = slow.clone();
    let fast_session: Arc<dyn Session> = fast.clone();
    let (older, newer) = tokio::join!(client.rebind(slow_session), client.rebind(fast_session));

    assert!(matches!(
        older,
        Err(CommandError::Session(SessionError::Invalidated { generation: 2 }))
    ));
    assert_eq!(newer.unwrap().generation(), 3);

    let context = client.context().unwrap();
    assert_eq!(context.generation(), 3);
    assert!(context.is_valid());
    assert_eq!(client.statistics().rebinds(), 2);

    let result = client.run("RequestLock", vec![]).await.unwrap();
    assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));
    assert_eq!(fast.calls(), 1);
    assert_eq!(slow.calls(), 0);
}
