//! Attribute paths used to locate diagnostics

use serde::{Serialize, Serializer};
use std::fmt;

/// One step of an [`AttributePath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Named attribute of an object
    Attribute(String),
    /// Position in a list
    Index(usize),
    /// Key of a map
    Key(String),
}

/// Location of a value inside a configuration object,
/// rendered as `plugins.http_logger.timeout` or `nodes[0].port`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// The empty path (the configuration object itself)
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of a named attribute below this one
    pub fn attribute(&self, name: impl Into<String>) -> Self {
        self.with(PathStep::Attribute(name.into()))
    }

    /// Path of a list element below this one
    pub fn index(&self, index: usize) -> Self {
        self.with(PathStep::Index(index))
    }

    /// Path of a map entry below this one
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(PathStep::Key(key.into()))
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps making up the path
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    fn with(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attribute(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Attribute(name) => write!(f, ".{name}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
                PathStep::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for AttributePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested_path() {
        let path = AttributePath::root()
            .attribute("plugins")
            .attribute("http_logger")
            .attribute("timeout");
        assert_eq!(path.to_string(), "plugins.http_logger.timeout");
    }

    #[test]
    fn test_display_index_and_key() {
        let path = AttributePath::root().attribute("nodes").index(0).attribute("port");
        assert_eq!(path.to_string(), "nodes[0].port");

        let path = AttributePath::root().attribute("labels").key("env");
        assert_eq!(path.to_string(), "labels[\"env\"]");
    }

    #[test]
    fn test_root_path() {
        assert!(AttributePath::root().is_root());
        assert_eq!(AttributePath::root().to_string(), "");
    }
}
