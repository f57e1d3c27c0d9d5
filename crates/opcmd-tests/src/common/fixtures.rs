// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built catalogs, decoded results and configuration documents.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use opcmd_core::result::{DiskSpace, ErrorLevel, Field, LockState, MethodResult, Record};
use opcmd_core::{
    CommandSpec, CommonHeader, DecodedResult, DecodedValue, MethodCatalog, ResultEncoder,
    VariantTail,
};

// =============================================================================
// Catalog Fixtures
// =============================================================================

/// Fixture providing command catalogs.
pub struct CatalogFixtures;

impl CatalogFixtures {
    /// The first `count` builtin commands with the builtin dictionary.
    pub fn first_builtin(count: usize) -> MethodCatalog {
        let builtin = MethodCatalog::builtin();
        let commands: Vec<CommandSpec> = builtin.commands().take(count).cloned().collect();
        MethodCatalog::new(commands, MethodCatalog::builtin_dictionary())
            .expect("builtin subset is valid")
    }

    /// A ten command catalog.
    pub fn ten_commands() -> MethodCatalog {
        Self::first_builtin(10)
    }
}

// =============================================================================
// Result Fixtures
// =============================================================================

/// Fixture providing decoded results for the builtin commands.
pub struct ResultFixtures;

impl ResultFixtures {
    /// `RequestLock` succeeded and the instrument is locked.
    pub fn locked() -> DecodedResult {
        DecodedResult::new(CommonHeader::success(), VariantTail::LockState(LockState::Locked))
    }

    /// A failed header-only result.
    pub fn failure(description: &str) -> DecodedResult {
        DecodedResult::new(
            CommonHeader::new(MethodResult::Failure, description, ErrorLevel::Error),
            VariantTail::None,
        )
    }

    /// Disk usage with the given byte counts in declaration order.
    pub fn disk_space(data: u64, export: u64, other: u64, free: u64, total: u64) -> DecodedResult {
        DecodedResult::new(
            CommonHeader::success(),
            VariantTail::DiskSpace(DiskSpace {
                data_bytes: data,
                export_bytes: export,
                other_bytes: other,
                total_free_bytes: free,
                total_size_bytes: total,
            }),
        )
    }

    /// Sample results holding `count` records.
    pub fn sample_results(count: usize) -> DecodedResult {
        let records = (0..count).map(Self::sample_record).collect();
        DecodedResult::new(CommonHeader::success(), VariantTail::SampleResults(records))
    }

    /// One sample result record.
    pub fn sample_record(index: usize) -> Record {
        let analysed = Utc
            .with_ymd_and_hms(2024, 3, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        Record::new(
            "SampleResult",
            vec![
                Field::new("Uuid", DecodedValue::Guid(Uuid::from_u128(0x5a00 + index as u128))),
                Field::new("SampleId", DecodedValue::String(format!("S-{:03}", index))),
                Field::new("CellTypeName", DecodedValue::String("BCI Default".to_string())),
                Field::new("AnalysisDateTime", DecodedValue::DateTime(analysed)),
                Field::new("TotalCells", DecodedValue::UInt32(1200 + index as u32)),
                Field::new("ViableCells", DecodedValue::UInt32(1100)),
                Field::new("Viability", DecodedValue::Double(91.5)),
                Field::new("TotalCellsPerMl", DecodedValue::Double(2.4e6)),
                Field::new("ViableCellsPerMl", DecodedValue::Double(2.2e6)),
            ],
        )
    }

    /// An export started under `id`, with a warning-level header.
    pub fn export_started(id: &str) -> DecodedResult {
        DecodedResult::new(
            CommonHeader::new(MethodResult::Success, "export queued", ErrorLevel::Warning),
            VariantTail::ExportData {
                export_data_id: id.to_string(),
            },
        )
    }

    /// Quality controls holding `count` records.
    pub fn quality_controls(count: usize) -> DecodedResult {
        let records = (0..count).map(Self::quality_control_record).collect();
        DecodedResult::new(CommonHeader::success(), VariantTail::QualityControls(records))
    }

    /// One quality control record; the assay parameter cycles through the enum.
    pub fn quality_control_record(index: usize) -> Record {
        const ASSAYS: [&str; 3] = ["Concentration", "Viability", "AverageDiameter"];
        let ordinal = (index + 1) % ASSAYS.len();
        let expires = Utc
            .with_ymd_and_hms(2025, 11, 30, 23, 59, 59)
            .single()
            .expect("valid timestamp");
        Record::new(
            "QualityControl",
            vec![
                Field::new("QualityControlName", DecodedValue::String(format!("QC-{}", index))),
                Field::new("CellTypeName", DecodedValue::String("Mammalian".to_string())),
                Field::new("AcceptanceLimits", DecodedValue::Int32(-5 + index as i32)),
                Field::new(
                    "AssayParameter",
                    DecodedValue::Enum {
                        ordinal: ordinal as i32,
                        name: ASSAYS[ordinal].to_string(),
                    },
                ),
                Field::new("AssayValue", DecodedValue::Double(12.75)),
                Field::new("Comments", DecodedValue::String(String::new())),
                Field::new("ExpirationDate", DecodedValue::DateTime(expires)),
                Field::new("LotNumber", DecodedValue::String(format!("LOT-{:04}", 7 + index))),
            ],
        )
    }

    /// Encodes `result` as the binary body of `command`'s first output.
    ///
    /// # Panics
    ///
    /// Panics if the command is unknown or the result does not fit.
    pub fn encode(catalog: &MethodCatalog, command: &str, result: &DecodedResult) -> Vec<u8> {
        let spec = catalog.lookup(command).expect("command is cataloged");
        ResultEncoder::new(catalog.dictionary())
            .encode(result, &spec.output)
            .expect("result fits the command schema")
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Fixture providing configuration documents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A YAML document that adds a pump object to the builtin catalog.
    pub fn pump_yaml() -> &'static str {
        r#"
connection:
  endpoint_url: "opc.tcp://${PUMP_HOST:localhost}:4840"
  call_timeout: 5s
resolver:
  duplicate_policy: reject
logging:
  level: debug
catalog:
  mode: extend
  namespace_uri: urn:lab:pump
  enums:
    - name: MethodResultEnum
      values: [Success, Failure]
    - name: ErrorLevelEnum
      values: [NoError, Warning, Error]
    - name: PumpStateEnum
      values: [Idle, Running, Fault]
  commands:
    - name: StartPump
      path: [PumpObject]
      method: StartPump
      inputs:
        - { name: flowRate, type: Double }
      result:
        kind: fields
        fields:
          - { name: state, type: "enum:PumpStateEnum" }
"#
    }

    /// A minimal TOML document.
    pub fn minimal_toml() -> &'static str {
        r#"
[connection]
endpoint_url = "opc.tcp://instrument.lab:4840"
call_timeout = "10s"

[decoder]
enum_encoding = "int32"

[logging]
level = "warn"
format = "json"
"#
    }

    /// A minimal JSON document.
    pub fn minimal_json() -> &'static str {
        r#"{
  "connection": { "endpoint_url": "opc.tcp://instrument.lab:4840" },
  "resolver": { "max_continuation_pages": 16 }
}"#
    }
}
