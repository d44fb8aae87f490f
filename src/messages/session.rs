// src/messages/session.rs

//! Structured results accumulated from one invocation's service messages.

use std::str::FromStr;

use indexmap::IndexMap;

use super::model::ServiceMessage;

/// Where plain stdout text goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdOutMode {
    #[default]
    Default,
    Error,
    Ignore,
    Verbose,
    Warning,
    Highlight,
    Wait,
}

/// Where plain stderr text goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdErrMode {
    #[default]
    Default,
    Error,
    Ignore,
    Progress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputVariable {
    pub name: String,
    pub value: String,
    pub sensitive: bool,
}

/// Output variables keyed case-insensitively; the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputVariables {
    items: IndexMap<String, OutputVariable>,
}

impl OutputVariables {
    pub fn set(&mut self, variable: OutputVariable) {
        self.items.insert(variable.name.to_lowercase(), variable);
    }

    pub fn get(&self, name: &str) -> Option<&OutputVariable> {
        self.items.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputVariable> {
        self.items.values()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub path: Option<String>,
    pub length: i64,
}

/// Version scheme of a discovered package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionFormat {
    #[default]
    Semver,
    Maven,
    Docker,
    Octopus,
    Lexicographic,
}

impl FromStr for VersionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semver" => Ok(VersionFormat::Semver),
            "maven" => Ok(VersionFormat::Maven),
            "docker" => Ok(VersionFormat::Docker),
            "octopus" => Ok(VersionFormat::Octopus),
            "lexicographic" => Ok(VersionFormat::Lexicographic),
            other => Err(format!("unknown version format: {other}")),
        }
    }
}

impl VersionFormat {
    /// Missing or unrecognised formats fall back to semantic versioning.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundPackage {
    pub id: String,
    pub version: Option<String>,
    pub version_format: VersionFormat,
    pub remote_path: Option<String>,
    pub hash: Option<String>,
    pub file_extension: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaPackage {
    pub remote_path: String,
    pub hash: String,
    pub size: i64,
}

/// A recognised extensible action, e.g. `create-kubernetestarget`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptAction {
    pub name: String,
    pub properties: IndexMap<String, String>,
}

impl ScriptAction {
    /// True when the property exists and is not empty.
    pub fn has_value(&self, property: &str) -> bool {
        self.property(property).is_some_and(|v| !v.is_empty())
    }

    pub fn property(&self, property: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(property))
            .map(|(_, value)| value.as_str())
    }

    /// Comma-separated values of the named properties, trimmed, blanks
    /// dropped.
    pub fn strings(&self, properties: &[&str]) -> Vec<String> {
        properties
            .iter()
            .filter_map(|p| self.property(p))
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Everything one invocation reported through service messages.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub stdout_mode: StdOutMode,
    pub stderr_mode: StdErrMode,
    pub output_variables: OutputVariables,
    pub artifacts: Vec<Artifact>,
    pub found_packages: Vec<FoundPackage>,
    /// Set by `calamari-found-package`.
    pub found_package_marker: bool,
    pub delta_package: Option<DeltaPackage>,
    pub delta_package_error: Option<String>,
    pub result_message: Option<String>,
    pub actions: Vec<ScriptAction>,
    /// Every message observed, in arrival order.
    pub service_messages: Vec<ServiceMessage>,
}
