//! Pattern extraction of typed fragments from raw spreadsheet cells
//!
//! Every entity kind owns one fixed pattern. A cell that is empty yields no
//! fragment; a cell that is present but does not match its pattern is an
//! error, never a partially filled record.

use crate::model::{
    Category, Competency, CompetencyGroup, Entity, EntityKind, Function, Ksat, KsatKind,
    Reference, SpecialtyArea, Subcategory, Workrole,
};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static FUNCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+) \(([A-Z]{2})\)").expect("valid function pattern"));

static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z, ]+) \(([^\s()]+)\):[ \n]?((?s:.*))$").expect("valid category pattern")
});

static SUBCATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{2}\.[A-Z]{2}-[0-9]+): ((?s:.*))$").expect("valid subcategory pattern")
});

static SPECIALTY_AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z &,/-]+) \(([A-Z]{3})\)").expect("valid specialty area pattern")
});

static WORKROLE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{2})-[A-Z]{3}-[0-9]{3}").expect("valid workrole pattern"));

static WORKROLE_SHEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{2}-[A-Z]{3}-[0-9]{3})").expect("valid sheet pattern"));

static KSAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[KSAT][0-9]{4}").expect("valid KSAT pattern"));

/// Extraction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// A present field did not match the grammar of its kind
    #[error("malformed {kind} value: {text:?}")]
    Malformed { kind: EntityKind, text: String },

    /// Text was scanned for KSAT codes and none were found
    #[error("no KSAT codes found in text: {0:?}")]
    NoKsatFound(String),

    /// Code does not start with K, S, A or T
    #[error("'{0}' is not a valid KSAT ID")]
    InvalidKsatId(String),

    /// A required column was empty
    #[error("{kind} is missing required field '{field}'")]
    MissingField {
        kind: EntityKind,
        field: &'static str,
    },

    /// The kind is never read from a single cell
    #[error("{0} cannot be extracted from a single cell")]
    NotExtractable(EntityKind),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// A typed entity parsed out of one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Function(Function),
    Category(Category),
    Subcategory(Subcategory),
    Reference(Reference),
    SpecialtyArea(SpecialtyArea),
    Workrole(Workrole),
    Ksat(Ksat),
    CompetencyGroup(CompetencyGroup),
    Competency(Competency),
}

impl Fragment {
    pub fn entity(&self) -> &dyn Entity {
        match self {
            Fragment::Function(e) => e,
            Fragment::Category(e) => e,
            Fragment::Subcategory(e) => e,
            Fragment::Reference(e) => e,
            Fragment::SpecialtyArea(e) => e,
            Fragment::Workrole(e) => e,
            Fragment::Ksat(e) => e,
            Fragment::CompetencyGroup(e) => e,
            Fragment::Competency(e) => e,
        }
    }
}

/// Extract the fragments of `kind` found in one cell.
///
/// Returns at most one fragment for every kind except KSAT, where each code
/// occurring in the text becomes its own fragment. An empty cell yields no
/// fragment, except for KSAT where it yields [`ExtractError::NoKsatFound`].
/// A Workrole cell is its ID column; the title and other attributes arrive
/// from other columns and merge in the registry.
pub fn extract(kind: EntityKind, raw: &str) -> ExtractResult<Vec<Fragment>> {
    if kind == EntityKind::Ksat {
        return ksat_codes(raw)?
            .into_iter()
            .map(|code| {
                let kind = ksat_kind(&code)?;
                Ok(Fragment::Ksat(Ksat {
                    id: code,
                    kind,
                    description: String::new(),
                }))
            })
            .collect();
    }

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let fragment = match kind {
        EntityKind::Function => Some(Fragment::Function(parse_function(raw)?)),
        EntityKind::Category => Some(Fragment::Category(parse_category(raw)?)),
        EntityKind::Subcategory => Some(Fragment::Subcategory(parse_subcategory(raw)?)),
        EntityKind::Reference => normalize_reference(raw).map(Fragment::Reference),
        EntityKind::SpecialtyArea => parse_specialty_area(raw).map(Fragment::SpecialtyArea),
        EntityKind::Workrole => {
            let (id, category) = parse_workrole_id(raw)?;
            Some(Fragment::Workrole(Workrole {
                id,
                category,
                title: String::new(),
                description: String::new(),
                opm_code: String::new(),
            }))
        }
        EntityKind::CompetencyGroup => competency_group(raw).map(Fragment::CompetencyGroup),
        EntityKind::Competency => Some(Fragment::Competency(Competency {
            id: raw.trim().to_string(),
            name: String::new(),
            description: String::new(),
        })),
        EntityKind::NiceCategory | EntityKind::Ksat => {
            return Err(ExtractError::NotExtractable(kind));
        }
    };

    Ok(fragment.into_iter().collect())
}

fn malformed(kind: EntityKind, raw: &str) -> ExtractError {
    ExtractError::Malformed {
        kind,
        text: raw.to_string(),
    }
}

/// `IDENTIFY (ID)`
pub fn parse_function(raw: &str) -> ExtractResult<Function> {
    let caps = FUNCTION_RE
        .captures(raw.trim())
        .ok_or_else(|| malformed(EntityKind::Function, raw))?;
    Ok(Function {
        id: caps[2].to_string(),
        title: caps[1].to_string(),
    })
}

/// `Asset Management (ID.AM): The data, personnel, ...`
pub fn parse_category(raw: &str) -> ExtractResult<Category> {
    let caps = CATEGORY_RE
        .captures(raw.trim())
        .ok_or_else(|| malformed(EntityKind::Category, raw))?;
    Ok(Category {
        id: caps[2].to_string(),
        title: caps[1].trim().to_string(),
        description: caps[3].trim().to_string(),
    })
}

/// `ID.AM-1: Physical devices and systems within the organization are inventoried`
pub fn parse_subcategory(raw: &str) -> ExtractResult<Subcategory> {
    let caps = SUBCATEGORY_RE
        .captures(raw.trim())
        .ok_or_else(|| malformed(EntityKind::Subcategory, raw))?;
    Ok(Subcategory {
        id: caps[1].to_string(),
        description: caps[2].trim().to_string(),
    })
}

/// Strip non-ASCII characters and surrounding whitespace; `None` if nothing is left
pub fn normalize_reference(raw: &str) -> Option<Reference> {
    let ascii: String = raw.chars().filter(char::is_ascii).collect();
    let reference = ascii.trim();
    if reference.is_empty() {
        None
    } else {
        Some(Reference {
            reference: reference.to_string(),
        })
    }
}

/// `Risk Management (RSK)` anywhere in the cell; `None` when the cell holds
/// something else, such as a category heading.
pub fn parse_specialty_area(raw: &str) -> Option<SpecialtyArea> {
    SPECIALTY_AREA_RE.captures(raw).map(|caps| SpecialtyArea {
        id: caps[2].to_string(),
        title: caps[1].trim().to_string(),
        description: String::new(),
    })
}

/// Returns the workrole code and the two-letter NICE category it belongs to
pub fn parse_workrole_id(raw: &str) -> ExtractResult<(String, String)> {
    let caps = WORKROLE_ID_RE
        .captures(raw)
        .ok_or_else(|| malformed(EntityKind::Workrole, raw))?;
    Ok((caps[0].to_string(), caps[1].to_string()))
}

/// Build a workrole from its title and ID columns. The title is required.
pub fn parse_workrole(title: &str, id: &str) -> ExtractResult<Workrole> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ExtractError::MissingField {
            kind: EntityKind::Workrole,
            field: "title",
        });
    }
    let (id, category) = parse_workrole_id(id)?;
    Ok(Workrole {
        id,
        category,
        title: title.to_string(),
        description: String::new(),
        opm_code: String::new(),
    })
}

/// Workrole code a KSAT sheet is named after, if the sheet is one
pub fn workrole_sheet_id(sheet_name: &str) -> Option<&str> {
    WORKROLE_SHEET_RE
        .captures(sheet_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Every KSAT code in `text`, left to right, upper-cased.
pub fn ksat_codes(text: &str) -> ExtractResult<Vec<String>> {
    let codes: Vec<String> = KSAT_RE
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_uppercase())
        .collect();
    if codes.is_empty() {
        return Err(ExtractError::NoKsatFound(text.to_string()));
    }
    Ok(codes)
}

pub fn ksat_kind(code: &str) -> ExtractResult<KsatKind> {
    match code.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('K') => Ok(KsatKind::Knowledge),
        Some('S') => Ok(KsatKind::Skill),
        Some('A') => Ok(KsatKind::Ability),
        Some('T') => Ok(KsatKind::Task),
        _ => Err(ExtractError::InvalidKsatId(code.to_string())),
    }
}

/// Group names have no stable id; they are keyed by trimmed name with inner
/// whitespace collapsed.
pub fn competency_group(raw: &str) -> Option<CompetencyGroup> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        None
    } else {
        Some(CompetencyGroup { name })
    }
}
