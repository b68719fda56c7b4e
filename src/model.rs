//! Entity kinds and typed entity records of the workforce taxonomy
//!
//! Every node in the target graph belongs to exactly one [`EntityKind`], which
//! fixes its label and the property holding its natural key. Raw spreadsheet
//! cells are turned into the structs below right after extraction so nothing
//! downstream handles untyped rows.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered property map used for node attributes
pub type Properties = IndexMap<String, String>;

/// Node type in the target graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Function,
    Category,
    Subcategory,
    Reference,
    NiceCategory,
    SpecialtyArea,
    Workrole,
    Ksat,
    CompetencyGroup,
    Competency,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Function,
        EntityKind::Category,
        EntityKind::Subcategory,
        EntityKind::Reference,
        EntityKind::NiceCategory,
        EntityKind::SpecialtyArea,
        EntityKind::Workrole,
        EntityKind::Ksat,
        EntityKind::CompetencyGroup,
        EntityKind::Competency,
    ];

    /// Primary node label
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Function => "NISTFunction",
            EntityKind::Category => "NISTCategory",
            EntityKind::Subcategory => "NISTSubCategory",
            EntityKind::Reference => "NISTReference",
            EntityKind::NiceCategory => "NICECategory",
            EntityKind::SpecialtyArea => "NICESpecialtyArea",
            EntityKind::Workrole => "NICEWorkrole",
            EntityKind::Ksat => "KSAT",
            EntityKind::CompetencyGroup => "NICECompetencyGroup",
            EntityKind::Competency => "NICECompetency",
        }
    }

    /// Property that carries the natural key
    pub fn key_property(&self) -> &'static str {
        match self {
            EntityKind::Reference => "reference",
            EntityKind::CompetencyGroup => "name",
            _ => "id",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Function => "Function",
            EntityKind::Category => "Category",
            EntityKind::Subcategory => "Subcategory",
            EntityKind::Reference => "Reference",
            EntityKind::NiceCategory => "NICE Category",
            EntityKind::SpecialtyArea => "Specialty Area",
            EntityKind::Workrole => "Workrole",
            EntityKind::Ksat => "KSAT",
            EntityKind::CompetencyGroup => "Competency Group",
            EntityKind::Competency => "Competency",
        };
        f.write_str(name)
    }
}

/// Relationship type between two entity kinds
///
/// Named after the endpoint it points at, so `(ksat)-[:NICE_WORKROLE]->(workrole)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelType {
    NistFunction,
    NistCategory,
    NistSubcategory,
    NiceCategory,
    NiceSpecialtyArea,
    NiceWorkrole,
    NiceCompetency,
    NiceCompetencyGroup,
}

impl RelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::NistFunction => "NIST_FUNCTION",
            RelType::NistCategory => "NIST_CATEGORY",
            RelType::NistSubcategory => "NIST_SUBCATEGORY",
            RelType::NiceCategory => "NICE_CATEGORY",
            RelType::NiceSpecialtyArea => "NICE_SPECIALTY_AREA",
            RelType::NiceWorkrole => "NICE_WORKROLE",
            RelType::NiceCompetency => "NICE_COMPETENCY",
            RelType::NiceCompetencyGroup => "NICE_COMPETENCY_GROUP",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knowledge, Skill, Ability or Task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KsatKind {
    Knowledge,
    Skill,
    Ability,
    Task,
}

impl KsatKind {
    /// Secondary label added to KSAT nodes, also the value of their `type` property
    pub fn as_str(&self) -> &'static str {
        match self {
            KsatKind::Knowledge => "Knowledge",
            KsatKind::Skill => "Skill",
            KsatKind::Ability => "Ability",
            KsatKind::Task => "Task",
        }
    }

    pub fn labels() -> [&'static str; 4] {
        ["Knowledge", "Skill", "Ability", "Task"]
    }
}

impl fmt::Display for KsatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed record that can be registered under its natural key
pub trait Entity {
    fn kind(&self) -> EntityKind;

    fn key(&self) -> &str;

    /// Non-key attributes; empty values are allowed and never overwrite
    fn attributes(&self) -> Vec<(&'static str, &str)>;

    /// Labels carried in addition to the kind's primary label
    fn extra_labels(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subcategory {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiceCategory {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtyArea {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workrole {
    pub id: String,
    /// Two-letter code of the owning NICE category, the prefix of `id`
    pub category: String,
    pub title: String,
    pub description: String,
    pub opm_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ksat {
    pub id: String,
    pub kind: KsatKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetencyGroup {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competency {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Entity for Function {
    fn kind(&self) -> EntityKind {
        EntityKind::Function
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![("title", &self.title)]
    }
}

impl Entity for Category {
    fn kind(&self) -> EntityKind {
        EntityKind::Category
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![("title", &self.title), ("description", &self.description)]
    }
}

impl Entity for Subcategory {
    fn kind(&self) -> EntityKind {
        EntityKind::Subcategory
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![("description", &self.description)]
    }
}

impl Entity for Reference {
    fn kind(&self) -> EntityKind {
        EntityKind::Reference
    }

    fn key(&self) -> &str {
        &self.reference
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        Vec::new()
    }
}

impl Entity for NiceCategory {
    fn kind(&self) -> EntityKind {
        EntityKind::NiceCategory
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![("title", &self.title), ("description", &self.description)]
    }
}

impl Entity for SpecialtyArea {
    fn kind(&self) -> EntityKind {
        EntityKind::SpecialtyArea
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![("title", &self.title), ("description", &self.description)]
    }
}

impl Entity for Workrole {
    fn kind(&self) -> EntityKind {
        EntityKind::Workrole
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("title", &self.title),
            ("description", &self.description),
            ("opm_code", &self.opm_code),
        ]
    }
}

impl Entity for Ksat {
    fn kind(&self) -> EntityKind {
        EntityKind::Ksat
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![("type", self.kind.as_str()), ("description", &self.description)]
    }

    fn extra_labels(&self) -> Vec<&'static str> {
        vec![self.kind.as_str()]
    }
}

impl Entity for CompetencyGroup {
    fn kind(&self) -> EntityKind {
        EntityKind::CompetencyGroup
    }

    fn key(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        Vec::new()
    }
}

impl Entity for Competency {
    fn kind(&self) -> EntityKind {
        EntityKind::Competency
    }

    fn key(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        vec![("name", &self.name), ("description", &self.description)]
    }
}
