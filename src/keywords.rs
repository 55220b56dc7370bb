//! Symptom keyword to department suggestions for the chat assistant

use crate::directory::{self, Department, Doctor};

/// Keyword dictionary, scanned in order. The first keyword found wins.
pub static KEYWORDS: &[(&str, &str)] = &[
    ("skin", "dermatology"),
    ("rash", "dermatology"),
    ("allergy", "dermatology"),
    ("heart", "cardiology"),
    ("chest", "cardiology"),
    ("cardio", "cardiology"),
    ("brain", "neurology"),
    ("headache", "neurology"),
    ("nerve", "neurology"),
    ("bone", "orthopedics"),
    ("joint", "orthopedics"),
    ("child", "pediatrics"),
    ("kid", "pediatrics"),
    ("xray", "radiology"),
    ("scan", "radiology"),
];

/// A department hint derived from chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentSuggestion {
    /// Keyword that matched
    pub keyword: &'static str,
    /// Suggested department
    pub department: &'static Department,
    /// The department's featured doctor
    pub doctor: Option<&'static Doctor>,
}

impl DepartmentSuggestion {
    /// One-line hint for display
    #[must_use]
    pub fn summary(&self) -> String {
        format!("You may want our {} department", self.department.label)
    }
}

/// Case-insensitive substring scan of `text` against [`KEYWORDS`].
#[must_use]
pub fn suggest_department(text: &str) -> Option<DepartmentSuggestion> {
    let lowered = text.to_lowercase();
    let &(keyword, department_id) = KEYWORDS.iter().find(|(keyword, _)| lowered.contains(keyword))?;
    let department = directory::department(department_id)?;

    Some(DepartmentSuggestion {
        keyword,
        department,
        doctor: directory::featured_doctor(department.id),
    })
}
