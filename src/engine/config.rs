/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Configuration for the structure-factor engine

use crate::scattering::calculator::FCalcMethod;
use crate::scattering::convention::ParameterConvention;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structure-factor engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scattering model
    pub method: FCalcMethod,
    /// Scattering table name; the structure's own choice, then IT92, when unset
    pub table: Option<String>,
    /// TAAM databank file; the built-in databank when unset
    pub databank: Option<PathBuf>,
    /// Whether TAAM typing produces a text report
    pub log_assignment: bool,
    /// Convention of reported derivatives
    pub convention: ParameterConvention,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            method: FCalcMethod::Iam,
            table: None,
            databank: None,
            log_assignment: false,
            convention: ParameterConvention::default(),
        }
    }
}

impl EngineConfig {
    pub fn taam() -> Self {
        Self {
            method: FCalcMethod::Taam,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: FCalcMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn with_databank<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.databank = Some(path.into());
        self
    }

    pub fn with_log_assignment(mut self, log_assignment: bool) -> Self {
        self.log_assignment = log_assignment;
        self
    }

    pub fn with_convention(mut self, convention: ParameterConvention) -> Self {
        self.convention = convention;
        self
    }
}
