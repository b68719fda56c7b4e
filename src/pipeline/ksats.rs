//! KSATs from the per-work-role sheets
//!
//! Every sheet named after a work role (`SP-ARC-001 ...`) lists that role's
//! knowledge, skills, abilities and tasks: the code in the first column and
//! its description in the second. Title rows above the `KSA ID` header and
//! rows with a blank description carry no code and are skipped. Any other
//! row without a valid code is an error.

use super::{PhaseOutput, Progress};
use crate::error::{ImportError, ImportResult, RowLocation};
use crate::extract::{ksat_codes, ksat_kind, workrole_sheet_id, ExtractError};
use crate::model::{EntityKind, Ksat, RelType};
use crate::pipeline::Phase;
use crate::registry::EntityHandle;
use crate::workbook::{Sheet, Workbook};
use tracing::debug;

const PHASE: Phase = Phase::Ksats;

/// Code column text of the header row
pub const HEADER_CELL: &str = "KSA ID";

/// Index of the header row, if the sheet has one
fn header_row(sheet: &Sheet) -> Option<usize> {
    sheet.rows.iter().position(|row| {
        row.first()
            .is_some_and(|cell| cell.trim().eq_ignore_ascii_case(HEADER_CELL))
    })
}

/// Rows that are allowed to carry no KSAT code
fn is_noise(row: &[String], index: usize, header: Option<usize>) -> bool {
    header.is_some_and(|header| index <= header)
        || row
            .get(1)
            .map_or(true, |description| description.trim().is_empty())
}

/// Sheets of `workbook` that belong to a work role, with the role's ID
pub fn workrole_sheets(workbook: &Workbook) -> Vec<(&str, &Sheet)> {
    workbook
        .sheets()
        .iter()
        .filter_map(|sheet| workrole_sheet_id(&sheet.name).map(|id| (id, sheet)))
        .collect()
}

pub fn scan(workbook: &Workbook) -> ImportResult<PhaseOutput> {
    let sheets = workrole_sheets(workbook);
    let total = sheets.iter().map(|(_, sheet)| sheet.row_count()).sum();
    let mut output = PhaseOutput::default();
    let mut progress = Progress::new(PHASE, total);

    for (workrole_id, sheet) in sheets {
        let workrole = EntityHandle::new(EntityKind::Workrole, workrole_id);
        let before = output.collector.len();
        let header = header_row(sheet);

        for (index, row) in sheet.rows.iter().enumerate() {
            progress.tick();
            let error = |source| ImportError::Extract {
                phase: PHASE,
                location: RowLocation::new(&sheet.name, index + 1),
                source,
            };

            let code_cell = row.first().map(String::as_str).unwrap_or("");
            let code = match ksat_codes(code_cell) {
                Ok(codes) => codes.into_iter().next(),
                Err(ExtractError::NoKsatFound(_)) if is_noise(row, index, header) => None,
                Err(err) => return Err(error(err)),
            };
            let Some(code) = code else {
                continue;
            };

            let kind = ksat_kind(&code).map_err(error)?;
            let ksat = output.registry.insert(&Ksat {
                id: code,
                kind,
                description: row.get(1).map(|s| s.trim().to_string()).unwrap_or_default(),
            });
            output.collector.link(&ksat, RelType::NiceWorkrole, &workrole);
        }

        debug!(
            "{}: {} KSATs for {}",
            sheet.name,
            output.collector.len() - before,
            workrole_id
        );
    }

    output.rows = progress.finish();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KsatKind;

    fn role_sheet(name: &str, rows: Vec<[&str; 2]>) -> Sheet {
        Sheet::from_rows(name, rows)
    }

    #[test]
    fn test_only_workrole_sheets_are_scanned() {
        let workbook = Workbook::new("nice_cwf")
            .with_sheet(role_sheet("Table of Contents", vec![["K0001", "ignored"]]))
            .with_sheet(role_sheet(
                "SP-ARC-001 Enterprise Architect",
                vec![
                    ["Enterprise Architect", ""],
                    ["KSA ID", "Description"],
                    ["K0001", "Knowledge of computer networking concepts"],
                    ["T0051", "Define appropriate levels of system availability"],
                ],
            ))
            .with_sheet(role_sheet(
                "SP-ARC-002",
                vec![["k0001", "Knowledge of computer networking concepts"]],
            ));

        assert_eq!(workrole_sheets(&workbook).len(), 2);

        let output = scan(&workbook).unwrap();
        assert_eq!(output.rows, 5);
        assert_eq!(output.registry.len(), 2);
        assert_eq!(output.collector.len(), 3);

        let task = output
            .registry
            .get(&EntityHandle::new(EntityKind::Ksat, "T0051"))
            .unwrap();
        assert_eq!(task.get("type"), Some(KsatKind::Task.as_str()));
        assert_eq!(task.labels, vec!["Task".to_string()]);
    }

    #[test]
    fn test_malformed_code_in_data_row_is_fatal() {
        let workbook = Workbook::new("nice_cwf").with_sheet(role_sheet(
            "SP-ARC-001",
            vec![
                ["Enterprise Architect", ""],
                ["KSA ID", "Description"],
                ["K0001", "Knowledge of computer networking concepts"],
                ["K001", "Knowledge of computer networking concepts and protocols"],
            ],
        ));
        match scan(&workbook).unwrap_err() {
            ImportError::Extract {
                phase,
                location,
                source,
            } => {
                assert_eq!(phase, Phase::Ksats);
                assert_eq!(location, RowLocation::new("SP-ARC-001", 4));
                assert_eq!(source, ExtractError::NoKsatFound("K001".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_rows_above_header_are_skipped() {
        let workbook = Workbook::new("nice_cwf").with_sheet(role_sheet(
            "OV-MGT-001",
            vec![
                ["Information Systems Security Manager", "Responsible for security"],
                ["KSA ID", "Description"],
                ["T0001", "Acquire and manage the necessary resources"],
                ["", ""],
            ],
        ));
        let output = scan(&workbook).unwrap();
        assert_eq!(output.registry.len(), 1);
    }

    #[test]
    fn test_first_code_of_a_cell_wins() {
        let workbook = Workbook::new("nice_cwf").with_sheet(role_sheet(
            "OV-MGT-001",
            vec![["S0018 (see also S0019)", "Skill in creating policies"]],
        ));
        let output = scan(&workbook).unwrap();
        let edges: Vec<_> = output.collector.iter().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source.key, "S0018");
        assert_eq!(edges[0].target.key, "OV-MGT-001");
    }
}
