//! Section grouping: partitioning classified marks by form block.
//!
//! A section corresponds to one visual block of the source form: one
//! (patient class, strength) product row group with a device column and a
//! dosing column.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{PatientClass, Strength};

use super::classify::{ClassifiedMark, MarkRole};

/// Identity of one visual block of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionKey {
    pub patient_class: PatientClass,
    pub strength: Strength,
}

impl SectionKey {
    /// 75mg only prints in the pediatric table and 300mg only in the adult
    /// one; the key enforces that pairing regardless of caller input.
    pub fn new(patient_class: PatientClass, strength: Strength) -> Self {
        let patient_class = match strength {
            Strength::Mg75 => PatientClass::Pediatric,
            Strength::Mg300 => PatientClass::Adult,
            Strength::Mg150 => patient_class,
        };
        Self {
            patient_class,
            strength,
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.patient_class.as_str(), self.strength.label())
    }
}

/// The classified marks of one section, split by column.
#[derive(Debug, Clone)]
pub struct Section {
    pub key: SectionKey,
    pub devices: Vec<ClassifiedMark>,
    pub dosings: Vec<ClassifiedMark>,
}

/// Group classified marks by section key, preserving first-encounter order
/// so the output order is deterministic for a given input order.
pub fn group_sections(marks: Vec<ClassifiedMark>) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for mark in marks {
        let key = SectionKey::new(mark.patient_class, mark.strength);
        let position = match sections.iter().position(|s| s.key == key) {
            Some(position) => position,
            None => {
                sections.push(Section {
                    key,
                    devices: Vec::new(),
                    dosings: Vec::new(),
                });
                sections.len() - 1
            }
        };
        match mark.role {
            MarkRole::Device(_) => sections[position].devices.push(mark),
            MarkRole::Dosing(_) => sections[position].dosings.push(mark),
        }
    }
    sections
}
