//! Static department and doctor directory
//!
//! Compiled-in reference data. Nothing here is persisted and nothing changes
//! for the lifetime of the process.

use serde::Serialize;

/// A clinical department
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Department {
    /// Stable identifier, also used as the department column of appointments
    pub id: &'static str,
    /// Display label
    pub label: &'static str,
}

/// A bookable doctor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Doctor {
    /// Stable identifier, `<department>-<n>`
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Sub-specialty
    pub specialty: &'static str,
    /// Department identifier
    pub department: &'static str,
    /// Consultation price as displayed
    pub price: &'static str,
}

/// All departments in display order
pub static DEPARTMENTS: &[Department] = &[
    Department { id: "cardiology", label: "Cardiology" },
    Department { id: "neurology", label: "Neurology" },
    Department { id: "orthopedics", label: "Orthopedics" },
    Department { id: "pediatrics", label: "Pediatrics" },
    Department { id: "dermatology", label: "Dermatology" },
    Department { id: "radiology", label: "Radiology" },
];

const fn doctor(
    id: &'static str,
    name: &'static str,
    specialty: &'static str,
    department: &'static str,
    price: &'static str,
) -> Doctor {
    Doctor { id, name, specialty, department, price }
}

/// All doctors, grouped by department
pub static DOCTORS: &[Doctor] = &[
    // Cardiology
    doctor("cardiology-1", "Dr. Alice Heart", "Interventional Cardiology", "cardiology", "$200"),
    doctor("cardiology-2", "Dr. Bob Vessels", "Electrophysiology", "cardiology", "$180"),
    doctor("cardiology-3", "Dr. Gina Pulse", "Cardiac Imaging", "cardiology", "$210"),
    doctor("cardiology-4", "Dr. Henry Beat", "Heart Failure Management", "cardiology", "$220"),
    // Neurology
    doctor("neurology-1", "Dr. Carol Brain", "Pediatric Neurology", "neurology", "$220"),
    doctor("neurology-2", "Dr. Dan Neuron", "Neurophysiology", "neurology", "$210"),
    doctor("neurology-3", "Dr. Fiona Nerve", "Stroke Management", "neurology", "$230"),
    doctor("neurology-4", "Dr. George Cortex", "Neurocritical Care", "neurology", "$240"),
    // Orthopedics
    doctor("orthopedics-1", "Dr. Helen Bone", "Joint Replacement", "orthopedics", "$190"),
    doctor("orthopedics-2", "Dr. Ian Joint", "Spine Surgery", "orthopedics", "$200"),
    doctor("orthopedics-3", "Dr. Joy Spine", "Sports Medicine", "orthopedics", "$180"),
    doctor("orthopedics-4", "Dr. Kevin Ortho", "Pediatric Orthopedics", "orthopedics", "$210"),
    // Pediatrics
    doctor("pediatrics-1", "Dr. Lily Kids", "Pediatric Cardiology", "pediatrics", "$200"),
    doctor("pediatrics-2", "Dr. Mark Growth", "Pediatric Neurology", "pediatrics", "$220"),
    // Dermatology
    doctor("dermatology-1", "Dr. Nancy Skin", "Cosmetic Dermatology", "dermatology", "$180"),
    // Radiology
    doctor("radiology-1", "Dr. Rachel Xray", "Magnetic Resonance Imaging", "radiology", "$220"),
];

/// Look up a department by identifier (case-insensitive).
#[must_use]
pub fn department(id: &str) -> Option<&'static Department> {
    let id = id.trim();
    DEPARTMENTS.iter().find(|d| d.id.eq_ignore_ascii_case(id))
}

/// Look up a doctor by identifier.
#[must_use]
pub fn doctor_by_id(id: &str) -> Option<&'static Doctor> {
    let id = id.trim();
    DOCTORS.iter().find(|d| d.id == id)
}

/// Doctors working in a department, in directory order.
pub fn doctors_in(department: &str) -> impl Iterator<Item = &'static Doctor> + '_ {
    DOCTORS
        .iter()
        .filter(move |d| d.department.eq_ignore_ascii_case(department.trim()))
}

/// Doctors whose name or department contains `query`, ignoring case.
///
/// An empty query matches every doctor.
pub fn search(query: &str) -> impl Iterator<Item = &'static Doctor> {
    let needle = query.to_lowercase();
    DOCTORS
        .iter()
        .filter(move |d| format!("{} {}", d.name, d.department).to_lowercase().contains(&needle))
}

/// The doctor shown first for a department.
#[must_use]
pub fn featured_doctor(department: &str) -> Option<&'static Doctor> {
    doctors_in(department).next()
}
