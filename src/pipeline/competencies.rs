//! NICE competencies
//!
//! The pivot sheet maps each KSA to a competency and the competency to its
//! grouping. KSATs are referenced by code only; they were loaded by the KSAT
//! phase. Rows without a competency (totals, blank lines) are skipped; a
//! competency row must name at least one valid KSA. Competency descriptions
//! come from a second sheet and are applied to competencies that already
//! exist.

use super::{extract_error, record_location, PhaseOutput, Progress};
use crate::error::ImportResult;
use crate::extract::{competency_group, ksat_codes, ExtractError};
use crate::model::{Competency, EntityKind, Properties, RelType};
use crate::pipeline::Phase;
use crate::workbook::Sheet;
use tracing::debug;

pub const SHEET: &str = "KSAs mapped to Competency";
pub const DESCRIPTIONS_SHEET: &str = "Competency Descriptions";

pub const KSA_ID_COLUMN: &str = "KSA ID";
pub const GROUPING_COLUMN: &str = "Competency Grouping";
pub const COMPETENCY_ID_COLUMN: &str = "Competency ID";
pub const COMPETENCY_COLUMN: &str = "Competency";
pub const DESCRIPTION_COLUMN: &str = "Description";

const PHASE: Phase = Phase::Competencies;

pub fn scan(sheet: &Sheet) -> ImportResult<PhaseOutput> {
    let records = sheet.records();
    let mut output = PhaseOutput::default();
    let mut progress = Progress::new(PHASE, records.len());

    for (index, record) in records.iter().enumerate() {
        progress.tick();

        let codes = match ksat_codes(record.get(KSA_ID_COLUMN)) {
            Ok(codes) => codes,
            Err(ExtractError::NoKsatFound(text))
                if record.field(COMPETENCY_ID_COLUMN).is_none() =>
            {
                debug!("{}: skipping {:?}", record_location(sheet, index), text);
                continue;
            }
            Err(err) => return Err(extract_error(PHASE, sheet, index)(err)),
        };

        let id = record
            .field(COMPETENCY_ID_COLUMN)
            .ok_or(ExtractError::MissingField {
                kind: EntityKind::Competency,
                field: COMPETENCY_ID_COLUMN,
            })
            .map_err(extract_error(PHASE, sheet, index))?;

        let competency = output.registry.insert(&Competency {
            id: id.trim().to_string(),
            name: record.get(COMPETENCY_COLUMN).to_string(),
            description: String::new(),
        });

        if let Some(group) = competency_group(record.get(GROUPING_COLUMN)) {
            let group = output.registry.insert(&group);
            output
                .collector
                .link(&competency, RelType::NiceCompetencyGroup, &group);
        }

        for code in codes {
            output.collector.add(
                EntityKind::Ksat,
                &code,
                RelType::NiceCompetency,
                EntityKind::Competency,
                &competency.key,
            );
        }
    }

    output.rows = progress.finish();
    Ok(output)
}

/// (competency ID, properties) for every described competency
pub fn descriptions(sheet: &Sheet) -> Vec<(String, Properties)> {
    sheet
        .records()
        .iter()
        .filter_map(|record| {
            let id = record.field(COMPETENCY_ID_COLUMN)?.trim();
            let description = record.field(DESCRIPTION_COLUMN)?.trim();
            let mut properties = Properties::new();
            properties.insert("description".to_string(), description.to_string());
            Some((id.to_string(), properties))
        })
        .collect()
}
