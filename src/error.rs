//! Import errors with phase and row context

use crate::extract::ExtractError;
use crate::loader::LoadError;
use crate::model::EntityKind;
use crate::pipeline::Phase;
use crate::workbook::WorkbookError;
use std::fmt;
use thiserror::Error;

/// Sheet and 1-based row number of a spreadsheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLocation {
    pub sheet: String,
    pub row: usize,
}

impl RowLocation {
    pub fn new(sheet: impl Into<String>, row: usize) -> Self {
        Self {
            sheet: sheet.into(),
            row,
        }
    }
}

impl fmt::Display for RowLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet '{}' row {}", self.sheet, self.row)
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("{phase}: {location}: {source}")]
    Extract {
        phase: Phase,
        location: RowLocation,
        #[source]
        source: ExtractError,
    },

    /// A child row appeared before any row that could be its parent
    #[error("{phase}: {location}: {kind} '{key}' has no {parent} above it")]
    Orphan {
        phase: Phase,
        location: RowLocation,
        kind: EntityKind,
        key: String,
        parent: EntityKind,
    },

    #[error("{phase}: {source}")]
    Workbook {
        phase: Phase,
        #[source]
        source: WorkbookError,
    },

    #[error("{phase}: {source}")]
    Load {
        phase: Phase,
        #[source]
        source: LoadError,
    },
}

impl ImportError {
    /// Phase the error occurred in
    pub fn phase(&self) -> Phase {
        match self {
            ImportError::Extract { phase, .. }
            | ImportError::Orphan { phase, .. }
            | ImportError::Workbook { phase, .. }
            | ImportError::Load { phase, .. } => *phase,
        }
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_names_its_phase() {
        let err = ImportError::Orphan {
            phase: Phase::Roles,
            location: RowLocation::new("Table of Contents", 4),
            kind: EntityKind::Workrole,
            key: "SP-RSK-001".to_string(),
            parent: EntityKind::SpecialtyArea,
        };
        assert_eq!(err.phase(), Phase::Roles);
        assert_eq!(
            err.to_string(),
            "NICE specialty areas and work roles: sheet 'Table of Contents' row 4: \
             Workrole 'SP-RSK-001' has no Specialty Area above it"
        );

        let err = ImportError::Extract {
            phase: Phase::Ksats,
            location: RowLocation::new("SP-ARC-001", 7),
            source: ExtractError::InvalidKsatId("X0001".to_string()),
        };
        assert_eq!(err.phase(), Phase::Ksats);
    }
}
