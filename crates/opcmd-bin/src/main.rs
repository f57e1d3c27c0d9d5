// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! opcmd - command layer for OPC UA instruments
//!
//! Main binary entry point.

use opcmd_bin::cli::Cli;
use opcmd_bin::commands;
use opcmd_bin::error::report_error_and_exit;
use opcmd_bin::logging::init_logging;

fn main() {
    let cli = Cli::parse_args();

    let loaded = commands::load_config(&cli);
    let logging = loaded.as_ref().ok().map(|loaded| &loaded.config.logging);
    init_logging(&cli.effective_log_level(logging), cli.effective_log_format(logging));

    if let Err(error) = loaded.and_then(|loaded| commands::execute(&cli, &loaded)) {
        report_error_and_exit(error);
    }
}
