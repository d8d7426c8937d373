//! Cardinality validation shared by the store and the admin forms
//!
//! Architecture: Domain Service - One pure predicate, two enforcement points
//! - The pre-persist hook and the form handler both call `CardinalityValidator`
//! - The validator only reads binding sizes; callers decide whether a
//!   violation aborts a write or goes back to the submitter
//! - Every configured constraint yields exactly one outcome, in table order

pub mod fields;

use crate::domain::models::EntityId;
use crate::domain::violations::CardinalityViolation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};

/// Maximum size of one named binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Binding the constraint applies to
    pub binding_name: String,
    /// Largest allowed number of related records
    pub max_count: usize,
}

impl ConstraintSpec {
    pub fn new(binding_name: impl Into<String>, max_count: usize) -> Self {
        Self { binding_name: binding_name.into(), max_count }
    }
}

/// Outcome for a single constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    Ok { binding_name: String },
    Violation(CardinalityViolation),
}

impl ValidationResult {
    /// Binding this outcome refers to
    pub fn binding_name(&self) -> &str {
        match self {
            Self::Ok { binding_name } => binding_name,
            Self::Violation(violation) => &violation.binding_name,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// The violation, if the constraint was exceeded
    pub fn violation(&self) -> Option<&CardinalityViolation> {
        match self {
            Self::Ok { .. } => None,
            Self::Violation(violation) => Some(violation),
        }
    }
}

/// Anything that can report the current size of a named binding
pub trait BindingSizes {
    /// Size of the binding, `None` when it is absent
    fn binding_size(&self, name: &str) -> Option<usize>;
}

impl<T> BindingSizes for BTreeMap<String, BTreeSet<T>> {
    fn binding_size(&self, name: &str) -> Option<usize> {
        self.get(name).map(BTreeSet::len)
    }
}

impl<T, S, H> BindingSizes for HashMap<String, HashSet<T, S>, H>
where
    T: Eq + Hash,
    S: BuildHasher,
    H: BuildHasher,
{
    fn binding_size(&self, name: &str) -> Option<usize> {
        self.get(name).map(HashSet::len)
    }
}

impl<B: BindingSizes + ?Sized> BindingSizes for &B {
    fn binding_size(&self, name: &str) -> Option<usize> {
        (**self).binding_size(name)
    }
}

/// Stateless predicate comparing binding sizes against a constraint table
#[derive(Debug, Clone, Copy, Default)]
pub struct CardinalityValidator;

impl CardinalityValidator {
    /// Check every constraint and return one outcome per constraint, in table order.
    ///
    /// Absent bindings count as empty. The entity id is only used for
    /// diagnostics; unsaved records validate the same way as stored ones.
    pub fn validate<B>(
        entity_id: Option<EntityId>,
        bindings: &B,
        specs: &[ConstraintSpec],
    ) -> Vec<ValidationResult>
    where
        B: BindingSizes + ?Sized,
    {
        let results: Vec<ValidationResult> = specs
            .iter()
            .map(|spec| {
                let actual_count = bindings.binding_size(&spec.binding_name).unwrap_or(0);
                if actual_count > spec.max_count {
                    ValidationResult::Violation(CardinalityViolation::new(
                        spec.binding_name.clone(),
                        spec.max_count,
                        actual_count,
                    ))
                } else {
                    ValidationResult::Ok { binding_name: spec.binding_name.clone() }
                }
            })
            .collect();

        tracing::debug!(
            entity = ?entity_id,
            constraints = specs.len(),
            violations = results.iter().filter(|r| !r.is_ok()).count(),
            "cardinality check"
        );

        results
    }

    /// Only the violated constraints, in table order
    pub fn violations<B>(
        entity_id: Option<EntityId>,
        bindings: &B,
        specs: &[ConstraintSpec],
    ) -> Vec<CardinalityViolation>
    where
        B: BindingSizes + ?Sized,
    {
        Self::validate(entity_id, bindings, specs)
            .into_iter()
            .filter_map(|result| match result {
                ValidationResult::Violation(violation) => Some(violation),
                ValidationResult::Ok { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn specs() -> Vec<ConstraintSpec> {
        vec![ConstraintSpec::new("technologies", 3), ConstraintSpec::new("fields", 3)]
    }

    fn bindings(technologies: &[&str], fields: &[&str]) -> BTreeMap<String, BTreeSet<String>> {
        let mut map = BTreeMap::new();
        map.insert("technologies".to_string(), technologies.iter().map(|s| s.to_string()).collect());
        map.insert("fields".to_string(), fields.iter().map(|s| s.to_string()).collect());
        map
    }

    #[test]
    fn test_one_binding_over_limit() {
        let input = bindings(&["t1", "t2", "t3", "t4"], &["c1", "c2"]);
        let results = CardinalityValidator::validate(Some(EntityId(1)), &input, &specs());

        assert_eq!(
            results,
            vec![
                ValidationResult::Violation(CardinalityViolation::new("technologies", 3, 4)),
                ValidationResult::Ok { binding_name: "fields".to_string() },
            ]
        );
    }

    #[test]
    fn test_within_limits() {
        let input = bindings(&["t1", "t2", "t3"], &["c1"]);
        let results = CardinalityValidator::validate(None, &input, &specs());

        assert!(results.iter().all(ValidationResult::is_ok));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_every_violation_is_reported() {
        let input = bindings(&["t1", "t2", "t3", "t4"], &["c1", "c2", "c3", "c4"]);
        let violations = CardinalityValidator::violations(None, &input, &specs());

        assert_eq!(
            violations,
            vec![
                CardinalityViolation::new("technologies", 3, 4),
                CardinalityViolation::new("fields", 3, 4),
            ]
        );
    }

    #[test]
    fn test_absent_bindings_count_as_empty() {
        let input: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
        let results = CardinalityValidator::validate(None, &input, &specs());

        assert_eq!(
            results,
            vec![
                ValidationResult::Ok { binding_name: "technologies".to_string() },
                ValidationResult::Ok { binding_name: "fields".to_string() },
            ]
        );
    }

    #[test]
    fn test_results_follow_spec_order() {
        let input = bindings(&["t1"], &["c1", "c2", "c3", "c4"]);
        let reversed: Vec<_> = specs().into_iter().rev().collect();
        let results = CardinalityValidator::validate(None, &input, &reversed);

        let names: Vec<_> = results.iter().map(ValidationResult::binding_name).collect();
        assert_eq!(names, vec!["fields", "technologies"]);
        assert!(results[0].violation().is_some());
    }

    #[test]
    fn test_repeated_calls_agree() {
        let input = bindings(&["t1", "t2", "t3", "t4"], &[]);
        let first = CardinalityValidator::validate(None, &input, &specs());
        let second = CardinalityValidator::validate(None, &input, &specs());
        assert_eq!(first, second);
        assert_eq!(input["technologies"].len(), 4);
    }

    #[test]
    fn test_hash_based_bindings() {
        let mut input: HashMap<String, HashSet<EntityId>> = HashMap::new();
        input.insert("technologies".to_string(), (1..=5).map(EntityId).collect());

        let violations = CardinalityValidator::violations(None, &input, &specs());
        assert_eq!(violations, vec![CardinalityViolation::new("technologies", 3, 5)]);
    }

    #[rstest]
    #[case(0, 0, true)]
    #[case(0, 1, false)]
    #[case(3, 2, true)]
    #[case(3, 3, true)]
    #[case(3, 4, false)]
    fn test_limit_boundary(#[case] max_count: usize, #[case] size: u64, #[case] ok: bool) {
        let mut input: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
        input.insert("tags".to_string(), (0..size).collect());

        let results =
            CardinalityValidator::validate(None, &input, &[ConstraintSpec::new("tags", max_count)]);
        assert_eq!(results[0].is_ok(), ok);
        if let Some(violation) = results[0].violation() {
            assert_eq!(violation.actual_count, size as usize);
            assert_eq!(violation.max_count, max_count);
        }
    }
}
