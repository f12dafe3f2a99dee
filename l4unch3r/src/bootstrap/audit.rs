//! Presence check for required artifacts.
//!
//! Purely diagnostic: a missing artifact is reported, the run carries on.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredArtifact {
    pub name: String,
    pub present: bool,
}

/// Artifacts in the order they were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditResult {
    pub artifacts: Vec<RequiredArtifact>,
}

impl AuditResult {
    pub fn all_present(&self) -> bool {
        self.artifacts.iter().all(|a| a.present)
    }

    pub fn missing(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .filter(|a| !a.present)
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.artifacts
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.present)
    }
}

/// Test each name for existence relative to `workdir`.
pub fn check_required<S: AsRef<str>>(workdir: &Path, names: &[S]) -> AuditResult {
    let artifacts = names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            RequiredArtifact {
                name: name.to_string(),
                present: workdir.join(name).exists(),
            }
        })
        .collect();

    AuditResult { artifacts }
}
