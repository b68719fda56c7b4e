//! Import pipeline
//!
//! Phases run strictly in order and each one completes before the next
//! starts:
//!
//! 1. **Taxonomy**: NIST CSF functions, categories, subcategories, references
//! 2. **Categories**: the seven NICE categories and their NIST functions
//! 3. **Roles**: NICE specialty areas and work roles
//! 4. **KSATs**: knowledge, skills, abilities and tasks per work role
//! 5. **Competencies**: competencies, their groups and their KSATs
//! 6. **Index**: the KSAT full-text index
//!
//! Each phase scans its sheets into a fresh [`EntityRegistry`] and
//! [`RelationshipCollector`] and hands them to the loader once. Later phases
//! refer to nodes written by earlier phases (or earlier runs) by natural key
//! only. The first error stops the run.

pub mod categories;
pub mod competencies;
pub mod ksats;
pub mod roles;
pub mod taxonomy;

use crate::collector::RelationshipCollector;
use crate::config::ImportConfig;
use crate::error::{ImportError, ImportResult, RowLocation};
use crate::extract::ExtractError;
use crate::loader::{BulkLoader, LoadReport};
use crate::model::{EntityKind, KsatKind};
use crate::registry::EntityRegistry;
use crate::store::GraphStore;
use crate::workbook::{Sheet, Workbook, WorkbookError, Workbooks};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Name of the full-text index over KSAT ids and descriptions
pub const KSAT_INDEX: &str = "ksat_index";

/// Properties covered by [`KSAT_INDEX`]
pub const KSAT_INDEX_PROPERTIES: [&str; 2] = ["id", "description"];

/// Rows between progress lines
const PROGRESS_INTERVAL: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Taxonomy,
    Categories,
    Roles,
    Ksats,
    Competencies,
    Index,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Taxonomy,
        Phase::Categories,
        Phase::Roles,
        Phase::Ksats,
        Phase::Competencies,
        Phase::Index,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Taxonomy => "NIST CSF taxonomy",
            Phase::Categories => "NICE categories",
            Phase::Roles => "NICE specialty areas and work roles",
            Phase::Ksats => "NICE KSATs",
            Phase::Competencies => "NICE competencies",
            Phase::Index => "KSAT index",
        };
        f.write_str(name)
    }
}

/// Entities and relationships gathered by one phase scan
#[derive(Debug, Default)]
pub struct PhaseOutput {
    pub registry: EntityRegistry,
    pub collector: RelationshipCollector,
    /// Spreadsheet rows examined
    pub rows: usize,
}

/// Outcome of one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub rows: usize,
    pub report: LoadReport,
}

/// Outcome of a whole run, phases in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub phases: Vec<PhaseSummary>,
}

impl RunSummary {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseSummary> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Sum over all phases
    pub fn total(&self) -> LoadReport {
        let mut total = LoadReport::default();
        for phase in &self.phases {
            total += phase.report;
        }
        total
    }

    pub fn rows(&self) -> usize {
        self.phases.iter().map(|p| p.rows).sum()
    }
}

/// Logs `processed/total` for a phase every [`PROGRESS_INTERVAL`] rows
pub(crate) struct Progress {
    phase: Phase,
    total: usize,
    processed: usize,
}

impl Progress {
    pub(crate) fn new(phase: Phase, total: usize) -> Self {
        info!("{}: {} rows to scan", phase, total);
        Self {
            phase,
            total,
            processed: 0,
        }
    }

    pub(crate) fn tick(&mut self) {
        self.processed += 1;
        if self.processed % PROGRESS_INTERVAL == 0 {
            info!("{}: {}/{} rows", self.phase, self.processed, self.total);
        }
    }

    pub(crate) fn finish(self) -> usize {
        info!("{}: {}/{} rows", self.phase, self.processed, self.total);
        self.processed
    }
}

/// Spreadsheet row number of the `index`th record of `sheet`
pub(crate) fn record_location(sheet: &Sheet, index: usize) -> RowLocation {
    // records start one row below the header; rows are numbered from 1
    RowLocation::new(&sheet.name, sheet.first_full_row + index + 2)
}

/// Attach phase and row context to an extraction error
pub(crate) fn extract_error(
    phase: Phase,
    sheet: &Sheet,
    index: usize,
) -> impl FnOnce(ExtractError) -> ImportError + '_ {
    move |source| ImportError::Extract {
        phase,
        location: record_location(sheet, index),
        source,
    }
}

pub(crate) fn sheet<'a>(
    phase: Phase,
    workbook: &'a Workbook,
    name: &str,
) -> ImportResult<&'a Sheet> {
    workbook
        .sheet(name)
        .map_err(|source: WorkbookError| ImportError::Workbook { phase, source })
}

/// Runs the phases against one store
pub struct Pipeline<S: GraphStore> {
    loader: BulkLoader<S>,
}

impl<S: GraphStore> Pipeline<S> {
    pub fn new(store: S) -> Self {
        Self {
            loader: BulkLoader::new(store),
        }
    }

    /// Pipeline using the configured batch size
    pub fn with_config(store: S, config: &ImportConfig) -> Self {
        Self {
            loader: BulkLoader::new(store).with_batch_size(config.batch_size),
        }
    }

    pub fn with_loader(loader: BulkLoader<S>) -> Self {
        Self { loader }
    }

    pub fn store(&self) -> &S {
        self.loader.store()
    }

    pub fn into_store(self) -> S {
        self.loader.into_inner()
    }

    /// Run every phase in order
    pub fn run(&mut self, workbooks: &Workbooks) -> ImportResult<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        summary.phases.push(self.import_taxonomy(&workbooks.nist_csf)?);
        summary.phases.push(self.import_categories()?);
        summary.phases.push(self.import_roles(&workbooks.nice_cwf)?);
        summary.phases.push(self.import_ksats(&workbooks.nice_cwf)?);
        summary.phases.push(self.import_competencies(&workbooks.nice_competencies)?);
        summary.phases.push(self.create_index()?);

        info!("Import finished in {:?}: {}", started.elapsed(), summary.total());
        Ok(summary)
    }

    fn flush(&mut self, phase: Phase, output: PhaseOutput) -> ImportResult<PhaseSummary> {
        let report = self
            .loader
            .flush(&output.registry, &output.collector)
            .map_err(|source| ImportError::Load { phase, source })?;
        info!("{}: {}", phase, report);
        Ok(PhaseSummary {
            phase,
            rows: output.rows,
            report,
        })
    }

    pub fn import_taxonomy(&mut self, workbook: &Workbook) -> ImportResult<PhaseSummary> {
        let output = taxonomy::scan(sheet(Phase::Taxonomy, workbook, taxonomy::SHEET)?)?;
        self.flush(Phase::Taxonomy, output)
    }

    pub fn import_categories(&mut self) -> ImportResult<PhaseSummary> {
        self.flush(Phase::Categories, categories::scan())
    }

    pub fn import_roles(&mut self, workbook: &Workbook) -> ImportResult<PhaseSummary> {
        let output = roles::scan(sheet(Phase::Roles, workbook, roles::SHEET)?)?;
        self.flush(Phase::Roles, output)
    }

    pub fn import_ksats(&mut self, workbook: &Workbook) -> ImportResult<PhaseSummary> {
        let output = ksats::scan(workbook)?;
        self.flush(Phase::Ksats, output)
    }

    /// Competencies with their groups and KSATs, then the description pass
    /// that only updates competencies already in the store
    pub fn import_competencies(&mut self, workbook: &Workbook) -> ImportResult<PhaseSummary> {
        let phase = Phase::Competencies;
        let output = competencies::scan(sheet(phase, workbook, competencies::SHEET)?)?;
        let mut summary = self.flush(phase, output)?;

        let descriptions =
            competencies::descriptions(sheet(phase, workbook, competencies::DESCRIPTIONS_SHEET)?);
        let updated = self
            .loader
            .set_properties(EntityKind::Competency, &descriptions)
            .map_err(|source| ImportError::Load { phase, source })?;
        info!("{}: {} of {} descriptions applied", phase, updated, descriptions.len());
        summary.rows += descriptions.len();
        Ok(summary)
    }

    /// Create the KSAT full-text index; an existing index is left alone
    pub fn create_index(&mut self) -> ImportResult<PhaseSummary> {
        let phase = Phase::Index;
        info!("Creating database index for KSATs");
        self.loader
            .ensure_fulltext_index(KSAT_INDEX, &KsatKind::labels(), &KSAT_INDEX_PROPERTIES)
            .map_err(|source| ImportError::Load { phase, source })?;
        Ok(PhaseSummary {
            phase,
            rows: 0,
            report: LoadReport::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;

    #[test]
    fn test_record_location_counts_header() {
        let sheet = Sheet::from_rows(
            "Sheet1",
            vec![
                vec!["Title", "", ""],
                vec!["Function", "Category", "Subcategory"],
                vec!["IDENTIFY (ID)", "", ""],
            ],
        );
        assert_eq!(sheet.first_full_row, 1);
        let location = record_location(&sheet, 0);
        assert_eq!(location.row, 3);
        assert_eq!(location.to_string(), "sheet 'Sheet1' row 3");
    }

    #[test]
    fn test_missing_sheet_names_phase() {
        let mut pipeline = Pipeline::new(MemoryGraph::new());
        let err = pipeline.import_taxonomy(&Workbook::new("empty")).unwrap_err();
        assert_eq!(err.phase(), Phase::Taxonomy);
        assert!(matches!(err, ImportError::Workbook { .. }));
    }

    #[test]
    fn test_run_summary_totals() {
        let report = LoadReport {
            nodes_created: 2,
            edges_created: 1,
            batches: 2,
            ..LoadReport::default()
        };
        let summary = RunSummary {
            phases: vec![
                PhaseSummary { phase: Phase::Taxonomy, rows: 4, report },
                PhaseSummary { phase: Phase::Roles, rows: 6, report },
            ],
        };
        assert_eq!(summary.total().nodes_created, 4);
        assert_eq!(summary.rows(), 10);
        assert!(summary.phase(Phase::Ksats).is_none());
    }

    #[test]
    fn test_index_phase_is_repeatable() {
        let mut pipeline = Pipeline::new(MemoryGraph::new());
        pipeline.create_index().unwrap();
        pipeline.create_index().unwrap();
        let index = pipeline.store().fulltext_index(KSAT_INDEX).unwrap();
        assert_eq!(index.labels.len(), 4);
    }
}
