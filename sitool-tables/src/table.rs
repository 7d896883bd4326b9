//! Logical tables reassembled from sections.
//!
//! Long-form sections sharing `(table_id, table_id_extension,
//! version_number)` group into one table; a version change opens a new
//! table even when the extension repeats. Short-form sections are singleton
//! tables, interleaved with long-form tables in original section order.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::report::Report;
use crate::section::Section;

/// Policy for a repeated `section_number` within the same version.
///
/// Noisy captures repeat sections routinely, so a duplicate is a Warning
/// diagnostic rather than a hard failure; which copy survives is the
/// embedder's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Keep the most recently seen copy.
    #[default]
    LastWins,
    /// Keep the first copy and ignore repeats.
    FirstWins,
}

/// A logical table: one or more sections sharing identity and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    table_id: u8,
    table_id_extension: u16,
    version_number: u8,
    long_form: bool,
    last_section_number: u8,
    sections: BTreeMap<u8, Section>,
}

impl Table {
    fn from_first(section: Section) -> Self {
        let mut table = Table {
            table_id: section.table_id(),
            table_id_extension: section.table_id_extension(),
            version_number: section.version_number(),
            long_form: section.is_long_form(),
            last_section_number: section.last_section_number(),
            sections: BTreeMap::new(),
        };
        table.sections.insert(section.section_number(), section);
        table
    }

    pub fn table_id(&self) -> u8 {
        self.table_id
    }

    pub fn table_id_extension(&self) -> u16 {
        self.table_id_extension
    }

    pub fn version_number(&self) -> u8 {
        self.version_number
    }

    pub fn is_long_form(&self) -> bool {
        self.long_form
    }

    pub fn last_section_number(&self) -> u8 {
        self.last_section_number
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Sections in `section_number` order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// A table is complete iff every section number in
    /// `0..=last_section_number` is present exactly once.
    pub fn is_complete(&self) -> bool {
        self.sections.len() == self.last_section_number as usize + 1
            && (0..=self.last_section_number).all(|n| self.sections.contains_key(&n))
    }

    /// Section numbers still missing from `0..=last_section_number`.
    pub fn missing_sections(&self) -> Vec<u8> {
        (0..=self.last_section_number)
            .filter(|n| !self.sections.contains_key(n))
            .collect()
    }
}

/// Group `sections` into logical tables in first-seen order.
///
/// Duplicate section numbers within one version are resolved by `policy`
/// with a Warning diagnostic; an inconsistent `last_section_number` inside
/// one group is reported and the first-seen value kept.
pub fn reassemble(sections: &[Section], policy: DuplicatePolicy, report: &dyn Report) -> Vec<Table> {
    let mut tables: Vec<Table> = Vec::new();
    let mut open: HashMap<(u8, u16, u8), usize> = HashMap::new();

    for section in sections {
        if !section.is_long_form() {
            tables.push(Table::from_first(section.clone()));
            continue;
        }

        let key = (
            section.table_id(),
            section.table_id_extension(),
            section.version_number(),
        );
        let index = match open.get(&key) {
            Some(&index) => index,
            None => {
                open.insert(key, tables.len());
                tables.push(Table::from_first(section.clone()));
                continue;
            }
        };

        let table = &mut tables[index];
        if section.last_section_number() != table.last_section_number {
            report.warning(&format!(
                "table 0x{:02X}/0x{:04X} v{}: inconsistent last_section_number {} (keeping {})",
                table.table_id,
                table.table_id_extension,
                table.version_number,
                section.last_section_number(),
                table.last_section_number
            ));
        }

        let number = section.section_number();
        if table.sections.contains_key(&number) {
            report.warning(&format!(
                "table 0x{:02X}/0x{:04X} v{}: duplicate section {}",
                table.table_id, table.table_id_extension, table.version_number, number
            ));
            if policy == DuplicatePolicy::FirstWins {
                continue;
            }
        }
        table.sections.insert(number, section.clone());
    }

    tables
}
