/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the tmpljs template compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use crate::extract::{extract_signature, ExtractError, Signature};
use crate::types::FunctionType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a bundle gets hold of the runtime prelude.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PreludeMode {
    /// The prelude source is embedded in every bundle.
    #[default]
    Inline,
    /// The bundle refers to a prelude the page already loaded under `binding`.
    Linked { binding: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// User functions, callable from templates by name. Implementations are
    /// supplied at render time.
    pub funcs: BTreeMap<String, Signature>,
    /// Template rendered when the bundle is called. Defaults to the last one added.
    pub entry: Option<String>,
    pub prelude: PreludeMode,
}

impl CompileOptions {
    pub fn with_func(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.funcs.insert(name.into(), signature);
        self
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn linked(mut self, binding: impl Into<String>) -> Self {
        self.prelude = PreludeMode::Linked {
            binding: binding.into(),
        };
        self
    }

    /// The function map as type descriptors.
    pub fn function_types(&self) -> Result<Vec<(String, FunctionType)>, ExtractError> {
        self.funcs
            .iter()
            .map(|(name, signature)| Ok((name.clone(), extract_signature(signature, name)?)))
            .collect()
    }
}
