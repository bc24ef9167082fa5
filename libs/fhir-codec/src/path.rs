//! Element paths for diagnostics
//!
//! Paths use the dotted/indexed notation FHIR error reporting uses
//! (`Patient.name[0].given[1]`), rooted at the resource type name.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath(String);

impl JsonPath {
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}.{key}", self.0))
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_dotted_indexed_paths() {
        let path = JsonPath::root("Patient").key("name").index(0).key("given");
        assert_eq!(path.as_str(), "Patient.name[0].given");
        assert_eq!(path.index(1).as_str(), "Patient.name[0].given[1]");
    }
}
