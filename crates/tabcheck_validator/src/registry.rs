//! Check registry and checklist compilation.
//!
//! The registry is an explicit, ordered catalog of check factories. There
//! is no global state: a validator owns its registry, and callers extend
//! it by registering factories, optionally spliced before or after an
//! existing entry. Compiling a checklist against the registry yields the
//! run's check instances plus task errors for anything unusable.

use crate::check::Check;
use crate::checks::{
    DeviatedValueCheck, DuplicateRowCheck, ForbiddenValueCheck, ForeignKeyCheck,
    RowConstraintCheck, SequentialValueCheck, TruncatedValueCheck, UniqueValueCheck,
};
use tabcheck_core::{Checklist, ValidationError};
use thiserror::Error;

/// Grouping of a check for group selectors in checklists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckCategory {
    /// Row/column shape checks; selected by the "structure" group
    Structure,
    /// Schema-driven checks; selected by the "schema" group
    Schema,
    /// Opt-in checks that need explicit selection
    Custom,
}

impl CheckCategory {
    fn group_name(self) -> Option<&'static str> {
        match self {
            CheckCategory::Structure => Some("structure"),
            CheckCategory::Schema => Some("schema"),
            CheckCategory::Custom => None,
        }
    }
}

/// Where a new entry lands in the registry order.
#[derive(Debug, Clone)]
pub enum Position {
    /// Append after all existing entries
    Last,
    /// Splice immediately before the named check
    Before(String),
    /// Splice immediately after the named check
    After(String),
}

/// Registration failure.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Check \"{0}\" is already registered")]
    Duplicate(String),

    #[error("Unknown anchor check \"{0}\"")]
    UnknownAnchor(String),
}

type Factory = Box<dyn Fn(serde_json::Value) -> Result<Box<dyn Check>, ValidationError> + Send + Sync>;

struct RegistryEntry {
    code: String,
    category: CheckCategory,
    factory: Factory,
}

/// Ordered catalog of check factories.
pub struct CheckRegistry {
    entries: Vec<RegistryEntry>,
}

impl CheckRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The registry with every built-in check.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let builtins: Vec<(&str, CheckCategory, Factory)> = vec![
            (
                "duplicate-row",
                CheckCategory::Structure,
                Box::new(|options| {
                    require_no_options("duplicate-row", options)?;
                    Ok(Box::new(DuplicateRowCheck::new()) as Box<dyn Check>)
                }),
            ),
            (
                "unique-value",
                CheckCategory::Schema,
                Box::new(|options| {
                    require_no_options("unique-value", options)?;
                    Ok(Box::new(UniqueValueCheck::new()) as Box<dyn Check>)
                }),
            ),
            (
                "foreign-key",
                CheckCategory::Schema,
                Box::new(|options| {
                    require_no_options("foreign-key", options)?;
                    Ok(Box::new(ForeignKeyCheck::new()) as Box<dyn Check>)
                }),
            ),
            (
                "deviated-value",
                CheckCategory::Custom,
                Box::new(|options| {
                    Ok(Box::new(DeviatedValueCheck::from_options(options)?) as Box<dyn Check>)
                }),
            ),
            (
                "sequential-value",
                CheckCategory::Custom,
                Box::new(|options| {
                    Ok(Box::new(SequentialValueCheck::from_options(options)?) as Box<dyn Check>)
                }),
            ),
            (
                "truncated-value",
                CheckCategory::Custom,
                Box::new(|options| {
                    require_no_options("truncated-value", options)?;
                    Ok(Box::new(TruncatedValueCheck::new()) as Box<dyn Check>)
                }),
            ),
            (
                "forbidden-value",
                CheckCategory::Custom,
                Box::new(|options| {
                    Ok(Box::new(ForbiddenValueCheck::from_options(options)?) as Box<dyn Check>)
                }),
            ),
            (
                "row-constraint",
                CheckCategory::Custom,
                Box::new(|options| {
                    Ok(Box::new(RowConstraintCheck::from_options(options)?) as Box<dyn Check>)
                }),
            ),
        ];
        for (code, category, factory) in builtins {
            let registered = registry.register_at(code, category, factory, Position::Last);
            debug_assert!(registered.is_ok(), "builtin code \"{code}\" collides");
        }
        registry
    }

    /// Registers a check factory at the end of the order.
    pub fn register(
        &mut self,
        code: impl Into<String>,
        category: CheckCategory,
        factory: Factory,
    ) -> Result<(), RegistryError> {
        self.register_at(code, category, factory, Position::Last)
    }

    /// Registers a check factory at an explicit position.
    pub fn register_at(
        &mut self,
        code: impl Into<String>,
        category: CheckCategory,
        factory: Factory,
        position: Position,
    ) -> Result<(), RegistryError> {
        let code = code.into();
        if self.index_of(&code).is_some() {
            return Err(RegistryError::Duplicate(code));
        }
        let entry = RegistryEntry {
            code,
            category,
            factory,
        };
        let index = match &position {
            Position::Last => self.entries.len(),
            Position::Before(anchor) => self
                .index_of(anchor)
                .ok_or_else(|| RegistryError::UnknownAnchor(anchor.clone()))?,
            Position::After(anchor) => {
                self.index_of(anchor)
                    .ok_or_else(|| RegistryError::UnknownAnchor(anchor.clone()))?
                    + 1
            }
        };
        self.entries.insert(index, entry);
        Ok(())
    }

    /// Registered codes in evaluation order.
    pub fn codes(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.code.as_str()).collect()
    }

    fn index_of(&self, code: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.code == code)
    }

    fn group_members(&self, group: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.category.group_name() == Some(group))
            .map(|entry| entry.code.as_str())
            .collect()
    }

    /// Compiles a checklist into check instances.
    ///
    /// Malformed descriptors, unknown codes and invalid options become
    /// task errors rather than failures: the run proceeds with whatever
    /// compiled.
    pub fn compile(&self, checklist: &Checklist) -> (Vec<Box<dyn Check>>, Vec<ValidationError>) {
        let mut selection: Vec<(String, serde_json::Value)> = Vec::new();
        let mut errors = Vec::new();

        match &checklist.checks {
            None => {
                for group in ["structure", "schema"] {
                    for code in self.group_members(group) {
                        selection.push((code.to_string(), serde_json::json!({})));
                    }
                }
            }
            Some(descriptors) => {
                for descriptor in descriptors {
                    let Some(code) = descriptor.selected_code() else {
                        errors.push(ValidationError::TaskError {
                            note: "a check descriptor must map exactly one code".to_string(),
                        });
                        continue;
                    };
                    if matches!(code, "structure" | "schema") {
                        for member in self.group_members(code) {
                            selection.push((member.to_string(), serde_json::json!({})));
                        }
                    } else if self.index_of(code).is_some() {
                        selection.push((code.to_string(), descriptor.options()));
                    } else {
                        errors.push(ValidationError::TaskError {
                            note: format!("check \"{code}\" is not supported"),
                        });
                    }
                }
            }
        }

        // First selection of a code wins; exclusions win over everything
        let mut compiled: Vec<Box<dyn Check>> = Vec::new();
        let mut taken: Vec<String> = Vec::new();
        for (code, options) in selection {
            if taken.contains(&code) || self.is_skipped(checklist, &code) {
                continue;
            }
            taken.push(code.clone());
            if let Some(index) = self.index_of(&code) {
                match (self.entries[index].factory)(options) {
                    Ok(check) => compiled.push(check),
                    Err(error) => errors.push(error),
                }
            }
        }

        (compiled, errors)
    }

    fn is_skipped(&self, checklist: &Checklist, code: &str) -> bool {
        checklist.skip_checks.iter().any(|skipped| {
            skipped == code
                || self
                    .index_of(code)
                    .is_some_and(|index| self.entries[index].category.group_name() == Some(skipped))
        })
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn require_no_options(code: &str, options: serde_json::Value) -> Result<(), ValidationError> {
    match options.as_object() {
        Some(map) if map.is_empty() => Ok(()),
        _ => Err(ValidationError::TaskError {
            note: format!("check \"{code}\" does not take options"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::TableContext;
    use pretty_assertions::assert_eq;
    use tabcheck_core::CheckDescriptor;

    struct NoopCheck;

    impl Check for NoopCheck {
        fn code(&self) -> &'static str {
            "noop"
        }
    }

    fn noop_factory() -> Factory {
        Box::new(|_| Ok(Box::new(NoopCheck) as Box<dyn Check>))
    }

    #[test]
    fn test_standard_order() {
        let registry = CheckRegistry::standard();
        assert_eq!(
            registry.codes(),
            vec![
                "duplicate-row",
                "unique-value",
                "foreign-key",
                "deviated-value",
                "sequential-value",
                "truncated-value",
                "forbidden-value",
                "row-constraint",
            ]
        );
    }

    #[test]
    fn test_default_checklist_selects_structure_and_schema() {
        let registry = CheckRegistry::standard();
        let (checks, errors) = registry.compile(&Checklist::new());
        assert_eq!(errors, vec![]);
        let codes: Vec<&str> = checks.iter().map(|check| check.code()).collect();
        assert_eq!(codes, vec!["duplicate-row", "unique-value", "foreign-key"]);
    }

    #[test]
    fn test_explicit_selection_with_options() {
        let registry = CheckRegistry::standard();
        let checklist = Checklist::new().with_checks(vec![
            CheckDescriptor::code("structure"),
            CheckDescriptor::configured(
                "sequential-value",
                serde_json::json!({"fieldName": "index"}),
            ),
        ]);
        let (checks, errors) = registry.compile(&checklist);
        assert_eq!(errors, vec![]);
        let codes: Vec<&str> = checks.iter().map(|check| check.code()).collect();
        assert_eq!(codes, vec!["duplicate-row", "sequential-value"]);
    }

    #[test]
    fn test_skip_wins_over_selection() {
        let registry = CheckRegistry::standard();
        let checklist = Checklist::new().with_skip_check("duplicate-row");
        let (checks, _) = registry.compile(&checklist);
        let codes: Vec<&str> = checks.iter().map(|check| check.code()).collect();
        assert_eq!(codes, vec!["unique-value", "foreign-key"]);

        // A whole group can be skipped
        let checklist = Checklist::new().with_skip_check("schema");
        let (checks, _) = registry.compile(&checklist);
        let codes: Vec<&str> = checks.iter().map(|check| check.code()).collect();
        assert_eq!(codes, vec!["duplicate-row"]);
    }

    #[test]
    fn test_unknown_check_is_task_error() {
        let registry = CheckRegistry::standard();
        let checklist =
            Checklist::new().with_checks(vec![CheckDescriptor::code("no-such-check")]);
        let (checks, errors) = registry.compile(&checklist);
        assert!(checks.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "task-error");
    }

    #[test]
    fn test_invalid_options_are_task_errors() {
        let registry = CheckRegistry::standard();
        let checklist = Checklist::new().with_checks(vec![CheckDescriptor::configured(
            "deviated-value",
            serde_json::json!({"bogus": 1}),
        )]);
        let (checks, errors) = registry.compile(&checklist);
        assert!(checks.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "task-error");
    }

    #[test]
    fn test_register_before_and_after() {
        let mut registry = CheckRegistry::standard();
        registry
            .register_at(
                "noop",
                CheckCategory::Structure,
                noop_factory(),
                Position::Before("unique-value".to_string()),
            )
            .unwrap();
        assert_eq!(registry.codes()[1], "noop");

        let result = registry.register_at(
            "noop2",
            CheckCategory::Custom,
            noop_factory(),
            Position::After("missing".to_string()),
        );
        assert_eq!(result, Err(RegistryError::UnknownAnchor("missing".into())));

        let result = registry.register("noop", CheckCategory::Custom, noop_factory());
        assert_eq!(result, Err(RegistryError::Duplicate("noop".into())));
    }

    #[test]
    fn test_registered_structure_check_joins_group() {
        let mut registry = CheckRegistry::standard();
        registry
            .register("noop", CheckCategory::Structure, noop_factory())
            .unwrap();
        let (checks, _) = registry.compile(&Checklist::new());
        let codes: Vec<&str> = checks.iter().map(|check| check.code()).collect();
        assert!(codes.contains(&"noop"));
    }

    #[test]
    fn test_compiled_check_is_usable() {
        let registry = CheckRegistry::standard();
        let (mut checks, _) = registry.compile(&Checklist::new());
        let context = TableContext {
            schema: tabcheck_core::Schema::new(Vec::new()),
            field_positions: Vec::new(),
            lookup: Default::default(),
        };
        // Smoke: hooks are callable on compiled boxes
        for check in checks.iter_mut() {
            let _ = check.validate_table(&context);
        }
    }
}
