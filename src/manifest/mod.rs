// src/manifest/mod.rs

//! Package manifest (pkg.json) parsing and data structures
//!
//! Manifests arrive from untrusted sources, so parsing is staged and every
//! stage fails with its own [`ManifestError`] variant:
//!
//! 1. JSON decoding ([`ManifestError::Encoding`])
//! 2. required fields and their shape ([`ManifestError::Shape`])
//! 3. `meta_version` is an integer >= 1 ([`ManifestError::MetaVersion`])
//! 4. every `uses` edge names a sibling library ([`ManifestError::DanglingReference`])

use crate::error::Error;
use crate::version::{DependencyRequirement, VersionRange, parse_version, validate_package_name};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

/// Manifest schema version understood by this implementation
pub const MANIFEST_SCHEMA_VERSION: i64 = 1;

/// File name of the manifest inside a package tree or archive
pub const MANIFEST_FILE_NAME: &str = "pkg.json";

const REQUIRED_FIELDS: &[&str] = &[
    "schema_version",
    "name",
    "namespace",
    "version",
    "meta_version",
    "libraries",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("{0}")]
    Encoding(String),

    #[error("{0}")]
    Shape(String),

    #[error("{0}")]
    MetaVersion(String),

    #[error("library '{library}' of {package} uses undeclared library '{target}'")]
    DanglingReference {
        package: String,
        library: String,
        target: String,
    },
}

impl ManifestError {
    /// Attach the source the manifest came from, producing a crate error
    pub fn into_error(self, source: &str) -> Error {
        match self {
            ManifestError::Encoding(reason) => Error::ManifestEncoding {
                source_path: source.to_string(),
                reason,
            },
            ManifestError::Shape(reason) => Error::ManifestShape {
                source_path: source.to_string(),
                reason,
            },
            ManifestError::MetaVersion(reason) => Error::InvalidMetaVersion {
                source_path: source.to_string(),
                reason,
            },
            ManifestError::DanglingReference {
                package,
                library,
                target,
            } => Error::DanglingLibraryReference {
                package,
                library,
                target,
            },
        }
    }
}

/// Root structure of pkg.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageManifest {
    pub schema_version: i64,
    pub name: String,
    pub namespace: String,
    pub version: Version,
    /// Filled in from the raw JSON after shape checks, see [`PackageManifest::from_value`]
    #[serde(skip_deserializing)]
    pub meta_version: i64,
    pub libraries: Vec<Library>,
    /// Free-form package metadata (license, description, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A buildable unit within a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Library {
    pub name: String,
    /// Path of the library relative to the package root
    pub path: String,
    #[serde(default)]
    pub uses: Vec<LibraryUse>,
    #[serde(default)]
    pub depends: Vec<DependencySpec>,
}

/// Edge from a library to a sibling library of the same package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryUse {
    pub lib: String,
    #[serde(rename = "for")]
    pub usage: Usage,
}

/// When a `uses` edge applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    /// Needed to build and consume the library
    Lib,
    /// Needed only to build the library's tests
    Test,
}

/// A dependency as written in a manifest
///
/// Either a requirement string (`"bar@4.1.3"`) or an explicit range object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    Short(String),
    Explicit {
        name: String,
        low: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        high: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        using: Vec<String>,
    },
}

impl DependencySpec {
    /// Expand into a requirement, applying the default range/using rules
    pub fn to_requirement(&self) -> crate::Result<DependencyRequirement> {
        match self {
            DependencySpec::Short(s) => DependencyRequirement::parse(s),
            DependencySpec::Explicit {
                name,
                low,
                high,
                using,
            } => {
                validate_package_name(name).map_err(|reason| Error::InvalidRequirement {
                    input: name.clone(),
                    reason,
                })?;
                let low = parse_version(low)?;
                let high = high.as_deref().map(parse_version).transpose()?;
                let range = VersionRange::new(low, high)?;
                Ok(DependencyRequirement::new(name.clone(), range, using.clone()))
            }
        }
    }
}

impl PackageManifest {
    /// Parse and fully validate manifest text from an untrusted source
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ManifestError::Encoding(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        let mut obj = into_object(value)?;
        for field in REQUIRED_FIELDS {
            if !obj.contains_key(*field) {
                return Err(ManifestError::Shape(format!(
                    "missing required field '{field}'"
                )));
            }
        }

        let raw_meta = obj.remove("meta_version").unwrap_or(Value::Null);
        let mut manifest: PackageManifest = serde_json::from_value(Value::Object(obj))
            .map_err(|e| ManifestError::Shape(e.to_string()))?;
        manifest.check_shape()?;

        manifest.meta_version = match raw_meta.as_i64() {
            Some(n) if n >= 1 => n,
            Some(n) => {
                return Err(ManifestError::MetaVersion(format!(
                    "meta_version must be at least 1, got {n}"
                )));
            }
            None => {
                return Err(ManifestError::MetaVersion(format!(
                    "meta_version must be an integer, got {raw_meta}"
                )));
            }
        };

        manifest.check_references()?;
        Ok(manifest)
    }

    /// Decode a manifest previously stored in an index.
    ///
    /// Only the JSON shape is checked. The stored `meta_version` is taken
    /// as-is so that callers can decide what to do with unusable records.
    pub fn from_stored(text: &str) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ManifestError::Encoding(e.to_string()))?;
        let mut obj = into_object(value)?;
        let raw_meta = obj.remove("meta_version").unwrap_or(Value::Null);
        let mut manifest: PackageManifest = serde_json::from_value(Value::Object(obj))
            .map_err(|e| ManifestError::Shape(e.to_string()))?;
        manifest.meta_version = raw_meta.as_i64().unwrap_or(0);
        Ok(manifest)
    }

    /// Serialize to a compact JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Structural checks that serde cannot express
    fn check_shape(&self) -> Result<(), ManifestError> {
        if self.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(ManifestError::Shape(format!(
                "unsupported schema_version {} (expected {})",
                self.schema_version, MANIFEST_SCHEMA_VERSION
            )));
        }
        validate_package_name(&self.name).map_err(ManifestError::Shape)?;
        validate_package_name(&self.namespace).map_err(ManifestError::Shape)?;

        let mut seen = HashSet::new();
        for lib in &self.libraries {
            validate_package_name(&lib.name).map_err(ManifestError::Shape)?;
            if !seen.insert(lib.name.as_str()) {
                return Err(ManifestError::Shape(format!(
                    "library '{}' is declared more than once",
                    lib.name
                )));
            }
            if lib.path.is_empty()
                || lib.path.starts_with('/')
                || lib.path.split('/').any(|c| c == "..")
            {
                return Err(ManifestError::Shape(format!(
                    "library '{}' has invalid path '{}'",
                    lib.name, lib.path
                )));
            }
            for dep in &lib.depends {
                dep.to_requirement().map_err(|e| {
                    ManifestError::Shape(format!("library '{}': {e}", lib.name))
                })?;
            }
        }
        Ok(())
    }

    /// Every `uses` edge must name a library declared in this manifest
    pub fn check_references(&self) -> Result<(), ManifestError> {
        for lib in &self.libraries {
            for edge in &lib.uses {
                if self.library(&edge.lib).is_none() {
                    return Err(ManifestError::DanglingReference {
                        package: self.to_string(),
                        library: lib.name.clone(),
                        target: edge.lib.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a library by name
    pub fn library(&self, name: &str) -> Option<&Library> {
        self.libraries.iter().find(|l| l.name == name)
    }

    /// Names of all declared libraries
    pub fn library_names(&self) -> BTreeSet<&str> {
        self.libraries.iter().map(|l| l.name.as_str()).collect()
    }

    /// The given libraries plus everything they reach through `for: lib` edges
    pub fn lib_closure<'a>(&'a self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = roots.into_iter().collect();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.to_string()) {
                continue;
            }
            if let Some(lib) = self.library(name) {
                for edge in &lib.uses {
                    if edge.usage == Usage::Lib {
                        queue.push_back(&edge.lib);
                    }
                }
            }
        }
        seen
    }

    /// Requirements contributed by the named libraries (no closure applied)
    pub fn requirements_of<'a>(
        &self,
        libraries: impl IntoIterator<Item = &'a String>,
    ) -> crate::Result<Vec<DependencyRequirement>> {
        let mut reqs = Vec::new();
        for name in libraries {
            if let Some(lib) = self.library(name) {
                for dep in &lib.depends {
                    reqs.push(dep.to_requirement()?);
                }
            }
        }
        Ok(reqs)
    }
}

impl fmt::Display for PackageManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}~{}",
            self.namespace, self.name, self.version, self.meta_version
        )
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, ManifestError> {
    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(ManifestError::Shape(format!(
            "manifest must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn simple() -> Value {
        json!({
            "schema_version": 1,
            "name": "foo",
            "namespace": "foo",
            "version": "1.2.3",
            "meta_version": 1,
            "libraries": [{
                "name": "foo",
                "path": ".",
                "uses": [{"lib": "bar", "for": "lib"}],
                "depends": ["baz@2.0.0"],
            }, {
                "name": "bar",
                "path": "bar",
                "uses": [],
                "depends": [{"name": "qux", "low": "1.0.0", "high": "1.5.0"}],
            }],
        })
    }

    #[test]
    fn test_parse_valid() {
        let m = PackageManifest::from_value(simple()).unwrap();
        assert_eq!(m.name, "foo");
        assert_eq!(m.meta_version, 1);
        assert_eq!(m.to_string(), "foo/foo@1.2.3~1");
        assert_eq!(m.libraries.len(), 2);
    }

    #[test]
    fn test_not_json() {
        let err = PackageManifest::parse("not-json").unwrap_err();
        assert!(matches!(err, ManifestError::Encoding(_)));
    }

    #[test]
    fn test_empty_object_is_shape_error() {
        let err = PackageManifest::parse("{}").unwrap_err();
        assert!(matches!(err, ManifestError::Shape(_)));
    }

    #[test]
    fn test_unknown_library_key_is_shape_error() {
        let mut value = simple();
        value["libraries"][0]["using"] = json!([]);
        let err = PackageManifest::from_value(value).unwrap_err();
        assert!(matches!(err, ManifestError::Shape(_)));
    }

    #[test]
    fn test_meta_version_zero() {
        let mut value = simple();
        value["meta_version"] = json!(0);
        let err = PackageManifest::from_value(value).unwrap_err();
        assert!(matches!(err, ManifestError::MetaVersion(_)));
    }

    #[test]
    fn test_meta_version_not_integer() {
        let mut value = simple();
        value["meta_version"] = json!("one");
        let err = PackageManifest::from_value(value).unwrap_err();
        assert!(matches!(err, ManifestError::MetaVersion(_)));
    }

    #[test]
    fn test_dangling_uses() {
        let mut value = simple();
        value["libraries"][0]["uses"] = json!([{"lib": "nope", "for": "test"}]);
        let err = PackageManifest::from_value(value).unwrap_err();
        assert_eq!(
            err,
            ManifestError::DanglingReference {
                package: "foo/foo@1.2.3~1".to_string(),
                library: "foo".to_string(),
                target: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_bad_dependency_string_is_shape_error() {
        let mut value = simple();
        value["libraries"][0]["depends"] = json!(["baz"]);
        let err = PackageManifest::from_value(value).unwrap_err();
        assert!(matches!(err, ManifestError::Shape(_)));
    }

    #[test]
    fn test_duplicate_library() {
        let mut value = simple();
        value["libraries"][1]["name"] = json!("foo");
        let err = PackageManifest::from_value(value).unwrap_err();
        assert!(matches!(err, ManifestError::Shape(_)));
    }

    #[test]
    fn test_lib_closure_ignores_test_edges() {
        let mut value = simple();
        value["libraries"][1]["uses"] = json!([{"lib": "foo", "for": "test"}]);
        let m = PackageManifest::from_value(value).unwrap();
        let closure = m.lib_closure(["foo"]);
        assert_eq!(closure.len(), 2);
        let closure = m.lib_closure(["bar"]);
        assert_eq!(closure.into_iter().collect::<Vec<_>>(), vec!["bar".to_string()]);
    }

    #[test]
    fn test_requirements_of() {
        let m = PackageManifest::from_value(simple()).unwrap();
        let libs = m.lib_closure(["foo"]);
        let reqs = m.requirements_of(&libs).unwrap();
        let names: Vec<_> = reqs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["qux", "baz"]);
    }

    #[test]
    fn test_stored_roundtrip_keeps_bad_meta_version() {
        let mut m = PackageManifest::from_value(simple()).unwrap();
        m.meta_version = 0;
        let stored = m.to_json().unwrap();
        let back = PackageManifest::from_stored(&stored).unwrap();
        assert_eq!(back.meta_version, 0);
    }
}
