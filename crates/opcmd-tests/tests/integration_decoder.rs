// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Decoder Integration Tests
//!
//! Decoding of captured result bodies for the builtin commands.
//!
//! ## Test Categories
//!
//! - `test_lock_*`, `test_disk_*`, `test_sample_*`: result families
//! - `test_truncated_*`: every prefix of a valid body
//! - `test_scope_*`: namespace scope balance

use opcmd_core::decoder::DecodeStage;
use opcmd_core::result::{ErrorLevel, LockState, MethodResult};
use opcmd_core::{
    DecodeErrorKind, DecodedValue, DecoderOptions, EnumEncoding, MethodCatalog, ResultDecoder,
    VariantTail,
};
use opcmd_tests::prelude::*;

fn decoder(catalog: &MethodCatalog) -> ResultDecoder {
    ResultDecoder::new(catalog.dictionary())
}

fn decode(catalog: &MethodCatalog, command: &str, body: &[u8]) -> Result<DecodedResult, opcmd_core::DecodeError> {
    let spec = catalog.lookup(command).unwrap();
    decoder(catalog).decode_body(body, &spec.output)
}

/// Success, empty description, NoError.
const SUCCESS_HEADER: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

// =============================================================================
// Result Families
// =============================================================================

#[test]
fn test_lock_state_locked() {
    init_test_logging();
    let catalog = MethodCatalog::builtin();
    let mut body = SUCCESS_HEADER.to_vec();
    body.push(0x02);

    let result = decode(&catalog, "RequestLock", &body).unwrap();
    assert_eq!(result.header.method_result, MethodResult::Success);
    assert_eq!(result.header.response_description, "");
    assert_eq!(result.header.error_level, ErrorLevel::NoError);
    assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));
}

#[test]
fn test_lock_state_null_description() {
    let catalog = MethodCatalog::builtin();
    let body = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x01];

    let result = decode(&catalog, "ReleaseLock", &body).unwrap();
    assert_eq!(result.header.response_description, "");
    assert_eq!(result.tail, VariantTail::LockState(LockState::Unlocked));
}

#[test]
fn test_lock_state_unknown_ordinal() {
    let catalog = MethodCatalog::builtin();
    let mut body = SUCCESS_HEADER.to_vec();
    body.push(0x07);

    let error = decode(&catalog, "RequestLock", &body).unwrap_err();
    assert!(matches!(
        error.kind,
        DecodeErrorKind::UnknownEnumValue { ordinal: 7, .. }
    ));
    assert!(error.partial.complete().is_some());
}

#[test]
fn test_disk_space_fields_in_order() {
    let catalog = MethodCatalog::builtin();
    let mut body = SUCCESS_HEADER.to_vec();
    for value in [0u64, 1_000, 0, 4_096, u64::MAX] {
        body.extend_from_slice(&value.to_le_bytes());
    }

    let result = decode(&catalog, "GetAvailableDiskSpace", &body).unwrap();
    match result.tail {
        VariantTail::DiskSpace(space) => {
            assert_eq!(space.data_bytes, 0);
            assert_eq!(space.export_bytes, 1_000);
            assert_eq!(space.other_bytes, 0);
            assert_eq!(space.total_free_bytes, 4_096);
            assert_eq!(space.total_size_bytes, u64::MAX);
        }
        other => panic!("unexpected tail: {:?}", other),
    }
}

#[test]
fn test_sample_results_empty_sequence() {
    let catalog = MethodCatalog::builtin();
    let mut body = SUCCESS_HEADER.to_vec();
    body.extend_from_slice(&0i32.to_le_bytes());

    let result = decode(&catalog, "GetSampleResults", &body).unwrap();
    assert_eq!(result.tail, VariantTail::SampleResults(vec![]));
}

#[test]
fn test_sample_results_records() {
    let catalog = MethodCatalog::builtin();
    let expected = ResultFixtures::sample_results(3);
    let body = ResultFixtures::encode(&catalog, "GetSampleResults", &expected);

    let result = decode(&catalog, "GetSampleResults", &body).unwrap();
    assert_eq!(result, expected);
    match &result.tail {
        VariantTail::SampleResults(records) => {
            assert_eq!(records[2].get("SampleId").and_then(|v| v.as_str()), Some("S-002"));
        }
        other => panic!("unexpected tail: {:?}", other),
    }
}

#[test]
fn test_export_data_round_trip() {
    let catalog = MethodCatalog::builtin();
    let expected = ResultFixtures::export_started("EXP-2024-0042");
    let body = ResultFixtures::encode(&catalog, "StartExport", &expected);

    let result = decode(&catalog, "StartExport", &body).unwrap();
    assert_eq!(result, expected);
    assert_eq!(result.header.error_level, ErrorLevel::Warning);
}

#[test]
fn test_quality_controls_round_trip() {
    let catalog = MethodCatalog::builtin();
    let expected = ResultFixtures::quality_controls(3);
    let body = ResultFixtures::encode(&catalog, "GetQualityControls", &expected);
    let spec = catalog.lookup("GetQualityControls").unwrap();
    let mut decoder = decoder(&catalog);

    let result = decoder.decode_body(&body, &spec.output).unwrap();
    assert_eq!(result, expected);
    assert_eq!(decoder.scope_depth(), 0);
    match &result.tail {
        VariantTail::QualityControls(records) => {
            assert_eq!(records.len(), 3);
            assert!(matches!(
                records[0].get("AssayParameter"),
                Some(DecodedValue::Enum { ordinal: 1, name }) if name == "Viability"
            ));
            assert!(matches!(records[2].get("ExpirationDate"), Some(DecodedValue::DateTime(_))));
        }
        other => panic!("unexpected tail: {:?}", other),
    }
}

#[test]
fn test_failure_header_without_tail() {
    let catalog = MethodCatalog::builtin();
    let expected = ResultFixtures::failure("stage is busy");
    let body = ResultFixtures::encode(&catalog, "Pause", &expected);

    let result = decode(&catalog, "Pause", &body).unwrap();
    assert_eq!(result.header.method_result, MethodResult::Failure);
    assert_eq!(result.header.response_description, "stage is busy");
    assert_eq!(result.header.error_level, ErrorLevel::Error);
}

#[test]
fn test_int32_enum_width() {
    let catalog = MethodCatalog::builtin();
    let mut body = Vec::new();
    body.extend_from_slice(&0i32.to_le_bytes());
    body.extend_from_slice(&0i32.to_le_bytes());
    body.extend_from_slice(&1i32.to_le_bytes());
    body.extend_from_slice(&2i32.to_le_bytes());

    let options = DecoderOptions {
        enum_encoding: EnumEncoding::Int32,
        allow_trailing_bytes: false,
    };
    let spec = catalog.lookup("RequestLock").unwrap();
    let result = ResultDecoder::with_options(catalog.dictionary(), options)
        .decode_body(&body, &spec.output)
        .unwrap();
    assert_eq!(result.header.error_level, ErrorLevel::Warning);
    assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));

    // Byte width reads the same bytes as a header with trailing data.
    assert!(decode(&catalog, "RequestLock", &body).is_err());
}

#[test]
fn test_trailing_bytes_policy() {
    let catalog = MethodCatalog::builtin();
    let mut body = SUCCESS_HEADER.to_vec();
    body.extend_from_slice(&[0x02, 0xAA, 0xBB]);

    let error = decode(&catalog, "RequestLock", &body).unwrap_err();
    assert!(matches!(error.kind, DecodeErrorKind::TrailingBytes { count: 2 }));

    let lenient = DecoderOptions {
        allow_trailing_bytes: true,
        ..DecoderOptions::default()
    };
    let spec = catalog.lookup("RequestLock").unwrap();
    let result = ResultDecoder::with_options(catalog.dictionary(), lenient)
        .decode_body(&body, &spec.output)
        .unwrap();
    assert_eq!(result.tail, VariantTail::LockState(LockState::Locked));
}

// =============================================================================
// Truncation
// =============================================================================

#[test]
fn test_truncated_at_every_offset() {
    init_test_logging();
    let catalog = MethodCatalog::builtin();
    let cases = [
        ("RequestLock", ResultFixtures::locked()),
        ("GetAvailableDiskSpace", ResultFixtures::disk_space(1, 2, 3, 4, 5)),
        ("GetSampleResults", ResultFixtures::sample_results(2)),
        ("Stop", ResultFixtures::failure("not running")),
    ];

    for (command, expected) in cases {
        let body = ResultFixtures::encode(&catalog, command, &expected);
        let spec = catalog.lookup(command).unwrap();
        let mut decoder = decoder(&catalog);

        for cut in 0..body.len() {
            let error = decoder
                .decode_body(&body[..cut], &spec.output)
                .expect_err("prefix must not decode");
            assert!(error.is_truncated(), "{} cut at {}: {}", command, cut, error);
            assert_eq!(
                error.partial.method_result.is_some(),
                cut >= 1,
                "{} cut at {}",
                command,
                cut
            );
            assert_eq!(decoder.scope_depth(), 0);
            assert_eq!(decoder.stage(), DecodeStage::Failed);
        }

        assert_eq!(decoder.decode_body(&body, &spec.output).unwrap(), expected);
    }
}

#[test]
fn test_truncated_keeps_decoded_header() {
    let catalog = MethodCatalog::builtin();
    let body = ResultFixtures::encode(
        &catalog,
        "GetAvailableDiskSpace",
        &ResultFixtures::disk_space(1, 2, 3, 4, 5),
    );

    let error = decode(&catalog, "GetAvailableDiskSpace", &body[..body.len() - 3]).unwrap_err();
    let header = error.partial.complete().expect("header decoded before the tail");
    assert_eq!(header.method_result, MethodResult::Success);
    assert_eq!(error.field.as_deref(), Some("TotalSizeBytes"));
}

// =============================================================================
// Scope Balance
// =============================================================================

#[test]
fn test_scope_balanced_across_decodes() {
    let catalog = MethodCatalog::builtin();
    let mut decoder = decoder(&catalog);
    let lock = catalog.lookup("RequestLock").unwrap();
    let samples = catalog.lookup("GetSampleResults").unwrap();

    let good = ResultFixtures::encode(&catalog, "GetSampleResults", &ResultFixtures::sample_results(1));
    let bad = [0x09];

    for _ in 0..3 {
        assert!(decoder.decode_body(&good, &samples.output).is_ok());
        assert_eq!(decoder.scope_depth(), 0);
        assert_eq!(decoder.stage(), DecodeStage::Done);

        assert!(decoder.decode_body(&bad, &lock.output).is_err());
        assert_eq!(decoder.scope_depth(), 0);
    }
}

#[test]
fn test_scope_balanced_on_malformed_envelope() {
    let catalog = MethodCatalog::builtin();
    let spec = catalog.lookup("RequestLock").unwrap();
    let mut decoder = decoder(&catalog);

    let error = decoder
        .decode(&TaggedValue::String("not an envelope".into()), &spec.output)
        .unwrap_err();
    assert!(matches!(error.kind, DecodeErrorKind::MalformedEnvelope { .. }));
    assert_eq!(decoder.scope_depth(), 0);
}
