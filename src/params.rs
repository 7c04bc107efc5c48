// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Watertight Contributors

//! Execution parameters threaded through operations
//!
//! These used to be good candidates for process-wide globals; instead they
//! are an explicit value passed through calls so concurrent operations on
//! distinct mesh pairs never share mutable state.

use serde::{Deserialize, Serialize};

/// Per-call execution configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Run bulk passes (box computation, spatial coding, classification,
    /// normals) on the rayon pool. Sequential fallbacks otherwise.
    pub parallel: bool,
    /// When set, terminal validation also rejects results that carry
    /// residual degeneracy warnings instead of merely recording them.
    pub strict_validation: bool,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            parallel: true,
            strict_validation: false,
        }
    }
}

impl ExecutionParams {
    /// Sequential, lenient configuration. Useful in tests that need
    /// deterministic single-thread execution.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            strict_validation: false,
        }
    }
}
