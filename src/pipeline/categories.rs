//! The seven NICE categories
//!
//! No source workbook lists the categories with descriptions, so they are
//! seeded from a fixed table together with the NIST functions each one maps
//! to.

use super::{PhaseOutput, Progress};
use crate::model::{EntityKind, NiceCategory, RelType};
use crate::pipeline::Phase;
use crate::registry::EntityHandle;

pub struct CategorySeed {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// NIST function codes
    pub functions: &'static [&'static str],
}

pub const NICE_CATEGORIES: [CategorySeed; 7] = [
    CategorySeed {
        id: "SP",
        title: "Securely Provision",
        description: "Conceptualizes, designs, procures, and/or builds secure information \
                      technology (IT) systems, with responsibility for aspects of system \
                      and/or network development.",
        functions: &["ID", "PR"],
    },
    CategorySeed {
        id: "OM",
        title: "Operate and Maintain",
        description: "Provides the support, administration, and maintenance necessary to \
                      ensure effective and efficient information technology (IT) system \
                      performance and security",
        functions: &["PR", "DE"],
    },
    CategorySeed {
        id: "OV",
        title: "Oversee and Govern",
        description: "Provides leadership, management, direction, or development and \
                      advocacy so the organization may effectively conduct cybersecurity work.",
        functions: &["ID", "PR", "DE", "RC"],
    },
    CategorySeed {
        id: "PR",
        title: "Protect and Defend",
        description: "Identifies, analyzes, and mitigates threats to internal information \
                      technology (IT) systems and/or networks.",
        functions: &["PR", "DE", "RS"],
    },
    CategorySeed {
        id: "AN",
        title: "Analyze",
        description: "Performs highly-specialized review and evaluation of incoming \
                      cybersecurity information to determine its usefulness for intelligence.",
        functions: &["ID", "DE", "RS"],
    },
    CategorySeed {
        id: "CO",
        title: "Collect and Operate",
        description: "Provides specialized denial and deception operations and collection \
                      of cybersecurity information that may be used to develop intelligence.",
        functions: &["DE", "PR", "RS"],
    },
    CategorySeed {
        id: "IN",
        title: "Investigate",
        description: "Investigates cybersecurity events or crimes related to information \
                      technology (IT) systems, networks, and digital evidence.",
        functions: &["DE", "RS", "RC"],
    },
];

pub fn scan() -> PhaseOutput {
    let mut output = PhaseOutput::default();
    let mut progress = Progress::new(Phase::Categories, NICE_CATEGORIES.len());

    for seed in &NICE_CATEGORIES {
        let category = output.registry.insert(&NiceCategory {
            id: seed.id.to_string(),
            title: seed.title.to_string(),
            description: seed.description.to_string(),
        });
        for function in seed.functions {
            output.collector.link(
                &category,
                RelType::NistFunction,
                &EntityHandle::new(EntityKind::Function, *function),
            );
        }
        progress.tick();
    }

    output.rows = progress.finish();
    output
}
