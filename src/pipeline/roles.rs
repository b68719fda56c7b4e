//! NICE specialty areas and work roles from the workbook's table of contents
//!
//! A specialty area row is followed by the rows of its work roles. The work
//! role ID also names the NICE category the specialty area belongs to.

use super::{extract_error, record_location, PhaseOutput, Progress};
use crate::error::{ImportError, ImportResult};
use crate::extract::{parse_specialty_area, parse_workrole};
use crate::model::{EntityKind, RelType};
use crate::pipeline::Phase;
use crate::registry::EntityHandle;
use crate::workbook::Sheet;
use tracing::{debug, warn};

pub const SHEET: &str = "Table of Contents";

pub const SPECIALTY_AREA_COLUMN: &str = "NICE Specialty Area";
pub const SPECIALTY_AREA_DESCRIPTION_COLUMN: &str = "NICE Specialty Area Description";
pub const WORK_ROLE_COLUMN: &str = "Work Role";
pub const WORK_ROLE_ID_COLUMN: &str = "Work Role ID";
pub const WORK_ROLE_DESCRIPTION_COLUMN: &str = "Work Role Description";
pub const OPM_CODE_COLUMN: &str = "OPM Code (Fed Use)";

const PHASE: Phase = Phase::Roles;

pub fn scan(sheet: &Sheet) -> ImportResult<PhaseOutput> {
    let records = sheet.records();
    let mut output = PhaseOutput::default();
    let mut progress = Progress::new(PHASE, records.len());
    let mut specialty_area: Option<EntityHandle> = None;

    for (index, record) in records.iter().enumerate() {
        progress.tick();

        if let Some(cell) = record.field(SPECIALTY_AREA_COLUMN) {
            // Category heading rows share the column but carry no code
            let Some(mut area) = parse_specialty_area(cell) else {
                debug!("Skipping row {}: {:?}", record_location(sheet, index), cell);
                continue;
            };
            area.description = record.get(SPECIALTY_AREA_DESCRIPTION_COLUMN).to_string();
            specialty_area = Some(output.registry.insert(&area));
        }

        let Some(title) = record.field(WORK_ROLE_COLUMN) else {
            continue;
        };
        let Some(id) = record.field(WORK_ROLE_ID_COLUMN) else {
            warn!(
                "{}: work role {:?} has no ID and is skipped",
                record_location(sheet, index),
                title.trim()
            );
            continue;
        };

        let mut workrole = parse_workrole(title, id).map_err(extract_error(PHASE, sheet, index))?;
        workrole.description = record.get(WORK_ROLE_DESCRIPTION_COLUMN).to_string();
        workrole.opm_code = record.get(OPM_CODE_COLUMN).to_string();

        let Some(area) = &specialty_area else {
            return Err(ImportError::Orphan {
                phase: PHASE,
                location: record_location(sheet, index),
                kind: EntityKind::Workrole,
                key: workrole.id,
                parent: EntityKind::SpecialtyArea,
            });
        };

        let role = output.registry.insert(&workrole);
        output.collector.link(&role, RelType::NiceSpecialtyArea, area);
        output.collector.link(
            area,
            RelType::NiceCategory,
            &EntityHandle::new(EntityKind::NiceCategory, workrole.category.as_str()),
        );
    }

    output.rows = progress.finish();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;

    fn toc_sheet(rows: Vec<[&str; 6]>) -> Sheet {
        let header = [
            SPECIALTY_AREA_COLUMN,
            SPECIALTY_AREA_DESCRIPTION_COLUMN,
            WORK_ROLE_COLUMN,
            WORK_ROLE_ID_COLUMN,
            WORK_ROLE_DESCRIPTION_COLUMN,
            OPM_CODE_COLUMN,
        ];
        Sheet::from_rows(SHEET, std::iter::once(header).chain(rows))
    }

    #[test]
    fn test_specialty_areas_and_roles() {
        let sheet = toc_sheet(vec![
            ["Securely Provision (SP)", "", "", "", "", ""],
            [
                "Risk Management (RSK)",
                "Oversees, evaluates, and supports the documentation",
                "Authorizing Official/Designating Representative",
                "SP-RSK-001",
                "Senior official or executive with the authority",
                "611",
            ],
            ["", "", "Security Control Assessor", "SP-RSK-002", "Conducts assessments", "612"],
            [
                "Systems Architecture (ARC)",
                "Develops system concepts",
                "Enterprise Architect",
                "SP-ARC-001",
                "",
                "651",
            ],
        ]);
        let output = scan(&sheet).unwrap();

        assert_eq!(output.rows, 4);
        assert_eq!(output.registry.all(EntityKind::SpecialtyArea).len(), 2);
        assert_eq!(output.registry.all(EntityKind::Workrole).len(), 3);

        let assessor = output
            .registry
            .get(&EntityHandle::new(EntityKind::Workrole, "SP-RSK-002"))
            .unwrap();
        assert_eq!(assessor.get("title"), Some("Security Control Assessor"));
        assert_eq!(assessor.get("opm_code"), Some("612"));
        // blank cells do not become properties
        let architect = output
            .registry
            .get(&EntityHandle::new(EntityKind::Workrole, "SP-ARC-001"))
            .unwrap();
        assert_eq!(architect.get("description"), None);

        let edges: Vec<_> = output
            .collector
            .iter()
            .map(|e| (e.source.key.as_str(), e.rel_type, e.target.key.as_str()))
            .collect();
        assert!(edges.contains(&("SP-RSK-002", RelType::NiceSpecialtyArea, "RSK")));
        assert!(edges.contains(&("RSK", RelType::NiceCategory, "SP")));
        assert!(edges.contains(&("ARC", RelType::NiceCategory, "SP")));
        // two roles in RSK, one category edge
        assert_eq!(edges.iter().filter(|e| e.1 == RelType::NiceCategory).count(), 2);
    }

    #[test]
    fn test_role_without_id_is_skipped() {
        let sheet = toc_sheet(vec![
            [
                "Risk Management (RSK)",
                "Oversees risk",
                "Authorizing Official",
                "SP-RSK-001",
                "Official",
                "611",
            ],
            ["", "", "Unnumbered Role", "", "", ""],
        ]);
        let output = scan(&sheet).unwrap();
        assert_eq!(output.registry.all(EntityKind::Workrole).len(), 1);
    }

    #[test]
    fn test_malformed_role_id() {
        let sheet = toc_sheet(vec![[
            "Risk Management (RSK)",
            "Oversees risk",
            "Authorizing Official",
            "RSK-1",
            "Official",
            "611",
        ]]);
        match scan(&sheet).unwrap_err() {
            ImportError::Extract { location, source, .. } => {
                assert_eq!(location.row, 2);
                assert!(matches!(
                    source,
                    ExtractError::Malformed {
                        kind: EntityKind::Workrole,
                        ..
                    }
                ));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_role_before_any_specialty_area() {
        let sheet = toc_sheet(vec![[
            "",
            "",
            "Authorizing Official",
            "SP-RSK-001",
            "Official",
            "611",
        ]]);
        assert!(matches!(
            scan(&sheet).unwrap_err(),
            ImportError::Orphan {
                kind: EntityKind::Workrole,
                ..
            }
        ));
    }
}
