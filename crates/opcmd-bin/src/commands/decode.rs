// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `decode` command.
//!
//! Decodes the binary body of a command's first output argument, captured
//! from a previous call, with that command's output schema.

use std::fs;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use opcmd_core::{
    CommandError, DecodedResult, DecoderOptions, MethodCatalog, ResultDecoder, VariantTail,
};

use super::LoadedConfig;
use crate::cli::{DecodeArgs, InputEncoding, OutputFormat};
use crate::error::{BinError, BinResult};

/// Executes the `decode` command.
pub fn decode(loaded: &LoadedConfig, args: &DecodeArgs) -> BinResult<()> {
    let catalog = loaded.config.build_catalog()?;
    let source = args.file.display().to_string();

    let content = fs::read(&args.file).map_err(|e| BinError::from(e).with_context(source.clone()))?;
    let body = read_body(&content, args.encoding).map_err(|e| e.with_context(source.clone()))?;

    tracing::debug!(command = %args.command, file = %source, bytes = body.len(), "Decoding captured result");
    let result = decode_captured(&catalog, loaded.config.decoder, &args.command, &body)?;

    match args.format {
        OutputFormat::Text => {
            for line in render_text(&args.command, &result) {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "command": args.command,
                "bytes": body.len(),
                "result": result,
            });
            let output = serde_json::to_string_pretty(&output)
                .map_err(|e| BinError::Runtime(e.to_string()))?;
            println!("{}", output);
        }
    }

    Ok(())
}

/// Decodes `body` with the output schema of `command`.
///
/// # Errors
///
/// Returns an unknown command error when `command` is not cataloged, and
/// the decode error otherwise.
pub fn decode_captured(
    catalog: &MethodCatalog,
    options: DecoderOptions,
    command: &str,
    body: &[u8],
) -> BinResult<DecodedResult> {
    let spec = catalog.lookup(command).map_err(CommandError::from)?;
    let mut decoder = ResultDecoder::with_options(catalog.dictionary(), options);
    Ok(decoder.decode_body(body, &spec.output)?)
}

/// Turns file content into body bytes.
///
/// # Errors
///
/// [`BinError::Input`] carrying the full cause chain when the text is not
/// valid for `encoding`.
pub fn read_body(content: &[u8], encoding: InputEncoding) -> BinResult<Vec<u8>> {
    decode_input(content, encoding).map_err(|e| BinError::input(format!("{:#}", e)))
}

fn decode_input(content: &[u8], encoding: InputEncoding) -> anyhow::Result<Vec<u8>> {
    let text = || -> anyhow::Result<String> {
        let text = std::str::from_utf8(content).context("encoded input is not valid UTF-8")?;
        Ok(text.chars().filter(|c| !c.is_whitespace()).collect())
    };

    match encoding {
        InputEncoding::Raw => Ok(content.to_vec()),
        InputEncoding::Hex => {
            let text = text()?;
            let digits = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .unwrap_or(&text);
            hex::decode(digits).context("invalid hex input")
        }
        InputEncoding::Base64 => BASE64.decode(text()?).context("invalid base64 input"),
    }
}

/// Renders a decoded result as indented text lines.
pub fn render_text(command: &str, result: &DecodedResult) -> Vec<String> {
    let header = &result.header;
    let mut lines = vec![
        format!("command:        {}", command),
        format!("method_result:  {}", header.method_result),
        format!("error_level:    {}", header.error_level),
    ];
    if !header.response_description.is_empty() {
        lines.push(format!("description:    {}", header.response_description));
    }
    lines.push(format!("tail:           {}", result.tail.kind_name()));

    match &result.tail {
        VariantTail::None => {}
        VariantTail::LockState(state) => lines.push(format!("  lock_state: {}", state)),
        VariantTail::DiskSpace(space) => {
            lines.push(format!("  data_bytes:       {}", space.data_bytes));
            lines.push(format!("  export_bytes:     {}", space.export_bytes));
            lines.push(format!("  other_bytes:      {}", space.other_bytes));
            lines.push(format!("  total_free_bytes: {}", space.total_free_bytes));
            lines.push(format!("  total_size_bytes: {}", space.total_size_bytes));
        }
        VariantTail::ExportData { export_data_id } => {
            lines.push(format!("  export_data_id: {}", export_data_id));
        }
        VariantTail::ConfigFile { file_data } => {
            lines.push(format!("  file_data: {} bytes", file_data.len()));
        }
        VariantTail::SampleResults(records) | VariantTail::QualityControls(records) => {
            lines.push(format!("  records: {}", records.len()));
            for (index, record) in records.iter().enumerate() {
                lines.push(format!("  [{}] {}", index, record));
            }
        }
        VariantTail::Fields(fields) => {
            for field in fields {
                lines.push(format!("  {}: {}", field.name, field.value));
            }
        }
    }

    lines
}

// =============================================================================
// Tests
// =============================================================================
