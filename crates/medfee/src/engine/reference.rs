use std::collections::BTreeMap;
use std::io;

use serde::Deserialize;

/// Synchronous name lookups injected into the explanation generator.
///
/// Implementations must already hold resolved data; the engine never performs I/O.
pub trait ReferenceData {
    fn doctor_name(&self, id: &str) -> Option<String>;
    fn service_name(&self, id: &str) -> Option<String>;
    fn specialty_name(&self, id: &str) -> Option<String>;
    fn society_name(&self, id: &str) -> Option<String>;
}

/// Lookup that knows no names; explanations fall back to raw identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferenceData;

impl ReferenceData for NoReferenceData {
    fn doctor_name(&self, _id: &str) -> Option<String> {
        None
    }

    fn service_name(&self, _id: &str) -> Option<String> {
        None
    }

    fn specialty_name(&self, _id: &str) -> Option<String> {
        None
    }

    fn society_name(&self, _id: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Doctor,
    Service,
    Specialty,
    Society,
}

/// In-memory directory of display names keyed by kind and identifier.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDirectory {
    names: BTreeMap<(ReferenceKind, String), String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    kind: ReferenceKind,
    id: String,
    name: String,
}

impl ReferenceDirectory {
    pub fn insert(&mut self, kind: ReferenceKind, id: impl Into<String>, name: impl Into<String>) {
        self.names
            .insert((kind, normalize_id(&id.into())), name.into());
    }

    pub fn with(mut self, kind: ReferenceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.insert(kind, id, name);
        self
    }

    /// Reads `kind,id,name` rows (with a header line).
    pub fn from_csv_reader<R: io::Read>(reader: R) -> Result<Self, ReferenceDataError> {
        let mut directory = Self::default();
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        for row in csv_reader.deserialize::<ReferenceRow>() {
            let row = row?;
            directory.insert(row.kind, row.id, row.name);
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn get(&self, kind: ReferenceKind, id: &str) -> Option<String> {
        self.names.get(&(kind, normalize_id(id))).cloned()
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

impl ReferenceData for ReferenceDirectory {
    fn doctor_name(&self, id: &str) -> Option<String> {
        self.get(ReferenceKind::Doctor, id)
    }

    fn service_name(&self, id: &str) -> Option<String> {
        self.get(ReferenceKind::Service, id)
    }

    fn specialty_name(&self, id: &str) -> Option<String> {
        self.get(ReferenceKind::Specialty, id)
    }

    fn society_name(&self, id: &str) -> Option<String> {
        self.get(ReferenceKind::Society, id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("reference data could not be read: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_names_from_csv() {
        let data = "kind,id,name\ndoctor,D-1,Dr. Ana Ruiz\nservice,S-9, Echocardiogram \n";
        let directory = ReferenceDirectory::from_csv_reader(data.as_bytes()).expect("csv parses");
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.doctor_name("d-1").as_deref(), Some("Dr. Ana Ruiz"));
        assert_eq!(directory.service_name("S-9").as_deref(), Some("Echocardiogram"));
        assert_eq!(directory.specialty_name("D-1"), None);
    }

    #[test]
    fn rejects_unknown_kind() {
        let data = "kind,id,name\nnurse,N-1,Pat\n";
        assert!(ReferenceDirectory::from_csv_reader(data.as_bytes()).is_err());
    }
}
