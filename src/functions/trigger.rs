//! # Trigger Types
//!
//! Classification of registered functions into per-trigger buckets.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::function::{Binding, FunctionDefinition};
use super::registry::FunctionRegistry;

/// Trigger types the host knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    #[serde(rename = "manualTrigger")]
    Manual,
    #[serde(rename = "httpTrigger")]
    Http,
    #[serde(rename = "timerTrigger")]
    Timer,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 3] = [TriggerKind::Manual, TriggerKind::Http, TriggerKind::Timer];

    /// Binding `type` value for this trigger
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Manual => "manualTrigger",
            TriggerKind::Http => "httpTrigger",
            TriggerKind::Timer => "timerTrigger",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function paired with the binding that matched a trigger type
#[derive(Debug, Clone)]
pub struct TriggerBinding {
    pub function: Arc<FunctionDefinition>,
    pub binding: Binding,
}

impl TriggerBinding {
    pub fn new(function: Arc<FunctionDefinition>, binding: Binding) -> Self {
        Self { function, binding }
    }
}

/// Pair every function declaring `trigger_type` with its first such binding
pub fn select_by_trigger_type<'a, I>(functions: I, trigger_type: &str) -> Vec<TriggerBinding>
where
    I: IntoIterator<Item = &'a Arc<FunctionDefinition>>,
{
    functions
        .into_iter()
        .filter_map(|func| {
            func.configuration
                .binding(trigger_type)
                .map(|binding| TriggerBinding::new(Arc::clone(func), binding.clone()))
        })
        .collect()
}

/// Enabled functions bucketed by trigger type
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub manual: Vec<TriggerBinding>,
    pub http: Vec<TriggerBinding>,
    pub timer: Vec<TriggerBinding>,
}

impl Classified {
    /// Drop disabled functions, then classify the rest
    pub fn from_registry(registry: &FunctionRegistry) -> Self {
        let enabled: Vec<Arc<FunctionDefinition>> = registry.enabled().cloned().collect();
        Self {
            manual: select_by_trigger_type(&enabled, TriggerKind::Manual.as_str()),
            http: select_by_trigger_type(&enabled, TriggerKind::Http.as_str()),
            timer: select_by_trigger_type(&enabled, TriggerKind::Timer.as_str()),
        }
    }

    pub fn bucket(&self, kind: TriggerKind) -> &[TriggerBinding] {
        match kind {
            TriggerKind::Manual => &self.manual,
            TriggerKind::Http => &self.http,
            TriggerKind::Timer => &self.timer,
        }
    }

    pub fn len(&self) -> usize {
        self.manual.len() + self.http.len() + self.timer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::function::FunctionConfiguration;
    use crate::functions::module::NativeModule;

    fn function(name: &str, disabled: bool, bindings: Vec<Binding>) -> Arc<FunctionDefinition> {
        let mut configuration = FunctionConfiguration::with_bindings(bindings);
        configuration.disabled = disabled;
        Arc::new(FunctionDefinition::new(
            name,
            format!("/fns/{}", name),
            Arc::new(NativeModule::manual(|ctx| ctx.succeed())),
            configuration,
        ))
    }

    #[test]
    fn test_trigger_kind_strings() {
        assert_eq!(TriggerKind::Http.as_str(), "httpTrigger");
        assert_eq!(TriggerKind::parse("timerTrigger"), Some(TriggerKind::Timer));
        assert_eq!(TriggerKind::parse("queueTrigger"), None);
    }

    #[test]
    fn test_select_matches_on_type() {
        let functions = vec![
            function("web", false, vec![Binding::new("httpTrigger")]),
            function("cron", false, vec![Binding::new("timerTrigger").with_schedule("* * * * *")]),
        ];

        let http = select_by_trigger_type(&functions, "httpTrigger");
        assert_eq!(http.len(), 1);
        assert_eq!(http[0].function.name, "web");

        assert!(select_by_trigger_type(&functions, "queueTrigger").is_empty());
    }

    #[test]
    fn test_select_pairs_first_matching_binding() {
        let functions = vec![function(
            "twice",
            false,
            vec![
                Binding::new("httpTrigger").with_auth_level("function"),
                Binding::new("httpTrigger").with_auth_level("anonymous"),
            ],
        )];

        let http = select_by_trigger_type(&functions, "httpTrigger");
        assert_eq!(http.len(), 1);
        assert_eq!(http[0].binding.auth_level.as_deref(), Some("function"));
    }

    #[test]
    fn test_function_with_several_types_lands_in_several_buckets() {
        let functions = vec![function(
            "both",
            false,
            vec![
                Binding::new("timerTrigger").with_schedule("0 * * * *"),
                Binding::new("httpTrigger"),
            ],
        )];

        assert_eq!(select_by_trigger_type(&functions, "httpTrigger").len(), 1);
        assert_eq!(select_by_trigger_type(&functions, "timerTrigger").len(), 1);
        assert!(select_by_trigger_type(&functions, "manualTrigger").is_empty());
    }

    #[test]
    fn test_output_bindings_do_not_classify() {
        let functions = vec![function(
            "out",
            false,
            vec![Binding::new("http"), Binding::new("manualTrigger")],
        )];

        assert!(select_by_trigger_type(&functions, "httpTrigger").is_empty());
        assert_eq!(select_by_trigger_type(&functions, "manualTrigger").len(), 1);
    }

    #[test]
    fn test_classified_drops_disabled() {
        let registry = FunctionRegistry::from_functions(vec![
            function("on", false, vec![Binding::new("manualTrigger")]),
            function(
                "off",
                true,
                vec![
                    Binding::new("manualTrigger"),
                    Binding::new("httpTrigger"),
                    Binding::new("timerTrigger").with_schedule("* * * * *"),
                ],
            ),
        ]);

        let classified = Classified::from_registry(&registry);
        assert_eq!(classified.manual.len(), 1);
        assert_eq!(classified.manual[0].function.name, "on");
        for kind in TriggerKind::ALL {
            assert!(classified.bucket(kind).iter().all(|t| t.function.name != "off"));
        }
        assert_eq!(classified.len(), 1);
    }
}
