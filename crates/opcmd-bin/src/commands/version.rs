// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version() -> BinResult<()> {
    println!("opcmd - command layer for OPC UA instruments");
    println!();
    println!("Version Information:");
    println!("  opcmd-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  opcmd-core:   {}", opcmd_core::VERSION);
    println!("  opcmd-config: {}", opcmd_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("Builtin catalog: {} commands", opcmd_core::MethodCatalog::builtin().len());
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
