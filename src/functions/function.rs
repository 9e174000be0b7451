//! # Function Definition

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::module::FunctionModule;

/// Auth level that lets HTTP requests through without a key
pub const ANONYMOUS_AUTH_LEVEL: &str = "anonymous";

/// One trigger or output association declared in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Type discriminator (`httpTrigger`, `timerTrigger`, `manualTrigger`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// HTTP authorization level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_level: Option<String>,

    /// Cron expression for timer triggers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    /// Every other field, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Binding {
    /// Create a binding carrying only a type
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            auth_level: None,
            schedule: None,
            extra: Map::new(),
        }
    }

    /// Set the HTTP auth level
    pub fn with_auth_level(mut self, level: impl Into<String>) -> Self {
        self.auth_level = Some(level.into());
        self
    }

    /// Set the timer schedule
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// Whether requests may skip the key check
    pub fn is_anonymous(&self) -> bool {
        self.auth_level.as_deref() == Some(ANONYMOUS_AUTH_LEVEL)
    }
}

/// Parsed `function.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfiguration {
    /// Disabled functions are never armed
    #[serde(default)]
    pub disabled: bool,

    /// Bindings in declaration order
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl FunctionConfiguration {
    /// Configuration with the given bindings, enabled
    pub fn with_bindings(bindings: Vec<Binding>) -> Self {
        Self {
            disabled: false,
            bindings,
        }
    }

    /// First binding of the given type, in declaration order
    pub fn binding(&self, kind: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.kind == kind)
    }
}

/// A function discovered under the host root
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct FunctionDefinition {
    /// Basename of the function directory
    pub name: String,

    /// Absolute function directory
    pub path: PathBuf,

    /// Loaded entry point
    pub module: Arc<dyn FunctionModule>,

    /// Parsed manifest
    pub configuration: FunctionConfiguration,
}

impl FunctionDefinition {
    /// Create a function definition
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        module: Arc<dyn FunctionModule>,
        configuration: FunctionConfiguration,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            module,
            configuration,
        }
    }

    /// Route segment under `/api/`: the directory basename
    pub fn route_segment(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }

    pub fn is_disabled(&self) -> bool {
        self.configuration.disabled
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::module::NativeModule;

    #[test]
    fn test_binding_keeps_unknown_fields() {
        let binding: Binding = serde_json::from_str(
            r#"{"type":"httpTrigger","authLevel":"anonymous","direction":"in","name":"req"}"#,
        )
        .unwrap();

        assert_eq!(binding.kind, "httpTrigger");
        assert!(binding.is_anonymous());
        assert_eq!(binding.extra["direction"], "in");
        assert_eq!(binding.extra["name"], "req");
    }

    #[test]
    fn test_configuration_defaults() {
        let config: FunctionConfiguration = serde_json::from_str("{}").unwrap();
        assert!(!config.disabled);
        assert!(config.bindings.is_empty());
    }

    #[test]
    fn test_first_binding_of_type_wins() {
        let config = FunctionConfiguration::with_bindings(vec![
            Binding::new("timerTrigger").with_schedule("0 * * * *"),
            Binding::new("timerTrigger").with_schedule("30 * * * *"),
        ]);

        let binding = config.binding("timerTrigger").unwrap();
        assert_eq!(binding.schedule.as_deref(), Some("0 * * * *"));
        assert!(config.binding("httpTrigger").is_none());
    }

    #[test]
    fn test_route_segment_is_directory_basename() {
        let func = FunctionDefinition::new(
            "hello",
            "/srv/functions/hello",
            Arc::new(NativeModule::manual(|ctx| ctx.succeed())),
            FunctionConfiguration::default(),
        );

        assert_eq!(func.route_segment(), "hello");
    }
}
