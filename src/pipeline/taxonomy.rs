//! NIST Cybersecurity Framework taxonomy
//!
//! The sheet uses merged cells: a function, category or subcategory cell is
//! only filled on the first row it covers. The last value seen in a column
//! stays current for the rows below it until its parent column changes.

use super::{extract_error, record_location, PhaseOutput, Progress};
use crate::error::{ImportError, ImportResult};
use crate::extract::{extract, Fragment};
use crate::model::{EntityKind, RelType};
use crate::pipeline::Phase;
use crate::registry::EntityHandle;
use crate::workbook::Sheet;

pub const SHEET: &str = "Sheet1";

pub const FUNCTION_COLUMN: &str = "Function";
pub const CATEGORY_COLUMN: &str = "Category";
pub const SUBCATEGORY_COLUMN: &str = "Subcategory";
pub const REFERENCE_COLUMN: &str = "Informative References";

const PHASE: Phase = Phase::Taxonomy;

/// Column, entity kind, parent kind and the relationship to the parent
const COLUMNS: [(&str, EntityKind, Option<(EntityKind, RelType)>); 4] = [
    (FUNCTION_COLUMN, EntityKind::Function, None),
    (
        CATEGORY_COLUMN,
        EntityKind::Category,
        Some((EntityKind::Function, RelType::NistFunction)),
    ),
    (
        SUBCATEGORY_COLUMN,
        EntityKind::Subcategory,
        Some((EntityKind::Category, RelType::NistCategory)),
    ),
    (
        REFERENCE_COLUMN,
        EntityKind::Reference,
        Some((EntityKind::Subcategory, RelType::NistSubcategory)),
    ),
];

#[derive(Default)]
struct Current {
    function: Option<EntityHandle>,
    category: Option<EntityHandle>,
    subcategory: Option<EntityHandle>,
}

impl Current {
    fn get(&self, kind: EntityKind) -> Option<&EntityHandle> {
        match kind {
            EntityKind::Function => self.function.as_ref(),
            EntityKind::Category => self.category.as_ref(),
            EntityKind::Subcategory => self.subcategory.as_ref(),
            _ => None,
        }
    }

    /// Make `handle` current; the entries below it no longer apply
    fn set(&mut self, handle: EntityHandle) {
        match handle.kind {
            EntityKind::Function => {
                self.function = Some(handle);
                self.category = None;
                self.subcategory = None;
            }
            EntityKind::Category => {
                self.category = Some(handle);
                self.subcategory = None;
            }
            EntityKind::Subcategory => self.subcategory = Some(handle),
            _ => {}
        }
    }
}

pub fn scan(sheet: &Sheet) -> ImportResult<PhaseOutput> {
    let records = sheet.records();
    let mut output = PhaseOutput::default();
    let mut progress = Progress::new(PHASE, records.len());
    let mut current = Current::default();

    for (index, record) in records.iter().enumerate() {
        for (column, kind, parent) in COLUMNS {
            let Some(cell) = record.field(column) else {
                continue;
            };
            let fragments = extract(kind, cell).map_err(extract_error(PHASE, sheet, index))?;
            for fragment in &fragments {
                let handle = output.registry.insert(fragment.entity());

                if let Some((parent_kind, rel_type)) = parent {
                    let Some(parent) = current.get(parent_kind) else {
                        return Err(ImportError::Orphan {
                            phase: PHASE,
                            location: record_location(sheet, index),
                            kind,
                            key: handle.key,
                            parent: parent_kind,
                        });
                    };
                    output.collector.link(&handle, rel_type, parent);
                }

                if !matches!(fragment, Fragment::Reference(_)) {
                    current.set(handle);
                }
            }
        }
        progress.tick();
    }

    output.rows = progress.finish();
    Ok(output)
}
