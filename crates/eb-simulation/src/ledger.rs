use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use eb_core::conserved::{ConservedQuantities, QuantityKind};
use eb_core::entity::EntityId;
use serde::{Deserialize, Serialize};

const MAX_VIOLATIONS: usize = 1_000;
const MAX_AUDIT_ENTRIES: usize = 10_000;

/// Numeric tolerance used when comparing conserved totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Mass, charge and each momentum axis pass iff `|Δ| <= absolute`.
    pub absolute: f64,
    /// Energy passes iff `|Δ| / max(|expected|, 1) <= energy_relative`.
    pub energy_relative: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: 1e-9,
            energy_relative: 0.05,
        }
    }
}

impl Tolerance {
    /// Compare one component. `None` means it passed.
    pub fn check(&self, quantity: QuantityKind, expected: f64, observed: f64) -> Option<Discrepancy> {
        let delta = (observed - expected).abs();
        let passed = match quantity {
            QuantityKind::Energy => delta / expected.abs().max(1.0) <= self.energy_relative,
            _ => delta <= self.absolute,
        };
        // NaN never passes
        if passed {
            None
        } else {
            Some(Discrepancy {
                quantity,
                expected,
                observed,
                drift: observed - expected,
            })
        }
    }

    /// Every failing component of `observed` against `expected`.
    pub fn compare(
        &self,
        expected: &ConservedQuantities,
        observed: &ConservedQuantities,
    ) -> Vec<Discrepancy> {
        QuantityKind::ALL
            .iter()
            .filter_map(|q| self.check(*q, expected.get(*q), observed.get(*q)))
            .collect()
    }
}

/// The kind of transformation the ledger saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// An entity started contributing to the totals.
    Add,
    /// An entity stopped contributing to the totals.
    Remove,
    /// Children merged into one aggregate.
    Aggregation,
    /// Reactants turned into products.
    Reaction,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Aggregation => "aggregation",
            Self::Reaction => "reaction",
        };
        write!(f, "{s}")
    }
}

/// One failing component of a validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    /// The component that failed.
    pub quantity: QuantityKind,
    /// Value before the transformation.
    pub expected: f64,
    /// Value after the transformation.
    pub observed: f64,
    /// `observed - expected`.
    pub drift: f64,
}

/// A failed validation. One per failing call, listing every failing component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Kind of transformation.
    pub operation: Operation,
    /// Entities involved.
    pub entity_ids: Vec<EntityId>,
    /// Totals before.
    pub expected: ConservedQuantities,
    /// Totals after.
    pub observed: ConservedQuantities,
    /// Every failing component.
    pub discrepancies: Vec<Discrepancy>,
    /// Caller-supplied reason.
    pub reason: String,
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// Kind of transformation.
    pub operation: Operation,
    /// Entities involved.
    pub entity_ids: Vec<EntityId>,
    /// Totals before.
    pub before: ConservedQuantities,
    /// Totals after.
    pub after: ConservedQuantities,
    /// `after - before`.
    pub delta: ConservedQuantities,
}

/// Snapshot of ledger counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    /// Failed validations since the last clear.
    pub total_violations: u64,
    /// Failing components per quantity.
    pub violations_by_quantity: BTreeMap<QuantityKind, u64>,
    /// Retained audit entries.
    pub audit_trail_len: usize,
    /// Current running totals.
    pub totals: ConservedQuantities,
}

/// Records conserved totals and audits transformations against them.
///
/// Validation is advisory: a failure is recorded and logged, and the caller
/// decides whether to go ahead with the transformation.
///
/// Running totals are the sum of what each tracked entity contributed when it
/// was added. Removing an entity subtracts that same contribution, so in-place
/// changes made while it was alive never leave a residue behind.
#[derive(Debug, Clone, Default)]
pub struct ConservationLedger {
    tolerance: Tolerance,
    totals: ConservedQuantities,
    contributions: HashMap<EntityId, ConservedQuantities>,
    violations: VecDeque<Violation>,
    total_violations: u64,
    violations_by_quantity: BTreeMap<QuantityKind, u64>,
    audit: VecDeque<AuditEntry>,
}

impl ConservationLedger {
    /// An empty ledger.
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// The tolerance validations use.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    // -----------------------------------------------------------------------
    // Running totals
    // -----------------------------------------------------------------------

    /// Track `id` and add its quantities to the totals. Adding an id twice
    /// replaces its earlier contribution.
    pub fn add_entity(&mut self, id: EntityId, quantities: &ConservedQuantities) {
        let before = self.totals;
        if let Some(previous) = self.contributions.insert(id, *quantities) {
            self.totals = self.totals - previous;
        }
        self.totals += *quantities;
        self.record(Operation::Add, vec![id], before, self.totals);
    }

    /// Stop tracking `id` and subtract what it contributed when it was added.
    /// Returns that contribution, or `None` for an untracked id.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<ConservedQuantities> {
        let quantities = self.contributions.remove(&id)?;
        let before = self.totals;
        self.totals = self.totals - quantities;
        self.record(Operation::Remove, vec![id], before, self.totals);
        Some(quantities)
    }

    /// What `id` contributed to the totals, if it is tracked.
    pub fn contribution(&self, id: EntityId) -> Option<ConservedQuantities> {
        self.contributions.get(&id).copied()
    }

    /// Number of entities contributing to the totals.
    pub fn tracked_count(&self) -> usize {
        self.contributions.len()
    }

    /// Current running totals.
    pub fn totals(&self) -> ConservedQuantities {
        self.totals
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check that merging `child_ids` into one aggregate preserved every quantity.
    pub fn validate_aggregation(
        &mut self,
        child_ids: &[EntityId],
        child_totals: &ConservedQuantities,
        aggregate_totals: &ConservedQuantities,
        reason: &str,
    ) -> bool {
        self.validate(
            Operation::Aggregation,
            child_ids.to_vec(),
            child_totals,
            aggregate_totals,
            reason,
        )
    }

    /// Check a reaction-shaped transformation. Violations reference reactants then products.
    pub fn validate_reaction(
        &mut self,
        reactant_ids: &[EntityId],
        product_ids: &[EntityId],
        reactant_totals: &ConservedQuantities,
        product_totals: &ConservedQuantities,
        reason: &str,
    ) -> bool {
        let ids = reactant_ids.iter().chain(product_ids).copied().collect();
        self.validate(
            Operation::Reaction,
            ids,
            reactant_totals,
            product_totals,
            reason,
        )
    }

    fn validate(
        &mut self,
        operation: Operation,
        entity_ids: Vec<EntityId>,
        expected: &ConservedQuantities,
        observed: &ConservedQuantities,
        reason: &str,
    ) -> bool {
        self.record(operation, entity_ids.clone(), *expected, *observed);

        let discrepancies = self.tolerance.compare(expected, observed);
        if discrepancies.is_empty() {
            return true;
        }

        let failing: Vec<String> = discrepancies.iter().map(|d| d.quantity.to_string()).collect();
        tracing::warn!(
            %operation,
            reason,
            failing = %failing.join(","),
            entities = entity_ids.len(),
            "conservation violation"
        );

        for d in &discrepancies {
            *self.violations_by_quantity.entry(d.quantity).or_insert(0) += 1;
        }
        self.total_violations += 1;
        self.violations.push_back(Violation {
            operation,
            entity_ids,
            expected: *expected,
            observed: *observed,
            discrepancies,
            reason: reason.to_string(),
        });
        if self.violations.len() > MAX_VIOLATIONS {
            self.violations.pop_front();
        }
        false
    }

    fn record(
        &mut self,
        operation: Operation,
        entity_ids: Vec<EntityId>,
        before: ConservedQuantities,
        after: ConservedQuantities,
    ) {
        self.audit.push_back(AuditEntry {
            operation,
            entity_ids,
            before,
            after,
            delta: after - before,
        });
        if self.audit.len() > MAX_AUDIT_ENTRIES {
            self.audit.pop_front();
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Retained violations, oldest first.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Retained audit entries, oldest first.
    pub fn audit_trail(&self) -> impl Iterator<Item = &AuditEntry> {
        self.audit.iter()
    }

    /// Counters and totals.
    pub fn statistics(&self) -> LedgerStats {
        LedgerStats {
            total_violations: self.total_violations,
            violations_by_quantity: self.violations_by_quantity.clone(),
            audit_trail_len: self.audit.len(),
            totals: self.totals,
        }
    }

    /// Forget violations but keep totals and the audit trail.
    pub fn clear_violations(&mut self) {
        self.violations.clear();
        self.total_violations = 0;
        self.violations_by_quantity.clear();
    }

    /// Back to an empty ledger with the same tolerance.
    pub fn reset(&mut self) {
        *self = Self::new(self.tolerance);
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;

    fn q(mass: f64, energy: f64, charge: f64, momentum: DVec3) -> ConservedQuantities {
        ConservedQuantities::new(mass, energy, charge, momentum)
    }

    #[test]
    fn matching_aggregation_passes() {
        let mut ledger = ConservationLedger::default();
        let ids = [EntityId::new(), EntityId::new()];
        let totals = q(3.0, 10.0, 0.0, DVec3::new(1.0, -2.0, 0.5));
        assert!(ledger.validate_aggregation(&ids, &totals, &totals, "merge"));
        assert_eq!(ledger.violations().count(), 0);
        assert_eq!(ledger.statistics().total_violations, 0);
    }

    #[test]
    fn mismatch_appends_exactly_one_violation() {
        let mut ledger = ConservationLedger::default();
        let ids = [EntityId::new(), EntityId::new()];
        let children = q(3.0, 10.0, 1.0, DVec3::X);
        let aggregate = q(3.5, 10.0, 0.0, DVec3::Y);

        assert!(!ledger.validate_aggregation(&ids, &children, &aggregate, "lossy merge"));

        let violations: Vec<_> = ledger.violations().collect();
        assert_eq!(violations.len(), 1);
        let v = violations[0];
        assert_eq!(v.entity_ids, ids.to_vec());
        assert_eq!(v.reason, "lossy merge");
        let failing: Vec<_> = v.discrepancies.iter().map(|d| d.quantity).collect();
        assert_eq!(
            failing,
            vec![
                QuantityKind::Mass,
                QuantityKind::Charge,
                QuantityKind::MomentumX,
                QuantityKind::MomentumY
            ]
        );
        assert_eq!(ledger.statistics().total_violations, 1);
        assert_eq!(
            ledger.statistics().violations_by_quantity.get(&QuantityKind::Mass),
            Some(&1)
        );
    }

    #[test]
    fn energy_uses_relative_drift() {
        let mut ledger = ConservationLedger::default();
        let id = [EntityId::new()];
        let expected = q(1.0, 1000.0, 0.0, DVec3::ZERO);
        assert!(ledger.validate_aggregation(&id, &expected, &q(1.0, 1040.0, 0.0, DVec3::ZERO), ""));
        assert!(!ledger.validate_aggregation(&id, &expected, &q(1.0, 1060.0, 0.0, DVec3::ZERO), ""));
    }

    #[test]
    fn nan_never_passes() {
        let tolerance = Tolerance::default();
        assert!(tolerance.check(QuantityKind::Mass, 1.0, f64::NAN).is_some());
        assert!(tolerance.check(QuantityKind::Energy, 1.0, f64::NAN).is_some());
    }

    #[test]
    fn reaction_violation_lists_reactants_then_products() {
        let mut ledger = ConservationLedger::default();
        let reactants = [EntityId::new(), EntityId::new()];
        let product = [EntityId::new()];
        let ok = ledger.validate_reaction(
            &reactants,
            &product,
            &q(2.0, 0.0, 0.0, DVec3::ZERO),
            &q(2.0, 500.0, 0.0, DVec3::ZERO),
            "bond formation",
        );
        assert!(!ok);
        let v = ledger.violations().next().unwrap();
        assert_eq!(v.operation, Operation::Reaction);
        assert_eq!(v.entity_ids, vec![reactants[0], reactants[1], product[0]]);
    }

    #[test]
    fn running_totals_and_audit_trail() {
        let mut ledger = ConservationLedger::default();
        let a = EntityId::new();
        let qa = q(2.0, 4.0, 1.0, DVec3::X);
        ledger.add_entity(a, &qa);
        ledger.add_entity(EntityId::new(), &qa);
        assert_eq!(ledger.remove_entity(a), Some(qa));
        assert_eq!(ledger.totals(), qa);
        assert_eq!(ledger.statistics().audit_trail_len, 3);
        let last = ledger.audit_trail().last().unwrap();
        assert_eq!(last.operation, Operation::Remove);
        assert_eq!(last.delta.mass, -2.0);
    }

    #[test]
    fn violation_list_is_bounded_but_counter_is_not() {
        let mut ledger = ConservationLedger::default();
        let id = [EntityId::new()];
        let a = q(1.0, 0.0, 0.0, DVec3::ZERO);
        let b = q(2.0, 0.0, 0.0, DVec3::ZERO);
        for _ in 0..(MAX_VIOLATIONS + 5) {
            ledger.validate_aggregation(&id, &a, &b, "");
        }
        assert_eq!(ledger.violations().count(), MAX_VIOLATIONS);
        assert_eq!(ledger.statistics().total_violations, (MAX_VIOLATIONS + 5) as u64);
    }

    #[test]
    fn clear_and_reset() {
        let mut ledger = ConservationLedger::default();
        let id = [EntityId::new()];
        ledger.add_entity(id[0], &q(1.0, 0.0, 0.0, DVec3::ZERO));
        ledger.validate_aggregation(&id, &q(1.0, 0.0, 0.0, DVec3::ZERO), &ConservedQuantities::ZERO, "");

        ledger.clear_violations();
        assert_eq!(ledger.statistics().total_violations, 0);
        assert_eq!(ledger.totals().mass, 1.0);

        ledger.reset();
        assert_eq!(ledger.totals(), ConservedQuantities::ZERO);
        assert_eq!(ledger.statistics().audit_trail_len, 0);
    }

    #[test]
    fn removal_subtracts_the_recorded_contribution() {
        let mut ledger = ConservationLedger::default();
        let id = EntityId::new();
        ledger.add_entity(id, &q(2.0, 100.0, 0.0, DVec3::X));

        assert_eq!(ledger.remove_entity(id).map(|c| c.energy), Some(100.0));
        assert_eq!(ledger.totals(), ConservedQuantities::ZERO);
        assert_eq!(ledger.tracked_count(), 0);
    }

    #[test]
    fn removing_an_untracked_id_is_a_noop() {
        let mut ledger = ConservationLedger::default();
        ledger.add_entity(EntityId::new(), &q(1.0, 1.0, 0.0, DVec3::ZERO));
        let trail = ledger.statistics().audit_trail_len;

        assert_eq!(ledger.remove_entity(EntityId::new()), None);
        assert_eq!(ledger.totals().mass, 1.0);
        assert_eq!(ledger.statistics().audit_trail_len, trail);
    }

    #[test]
    fn re_adding_replaces_the_contribution() {
        let mut ledger = ConservationLedger::default();
        let id = EntityId::new();
        ledger.add_entity(id, &q(1.0, 0.0, 0.0, DVec3::ZERO));
        ledger.add_entity(id, &q(3.0, 0.0, 0.0, DVec3::ZERO));
        assert_eq!(ledger.totals().mass, 3.0);
        assert_eq!(ledger.contribution(id).map(|c| c.mass), Some(3.0));
    }

    #[test]
    fn mass_tolerance_does_not_grow_with_magnitude() {
        let tolerance = Tolerance::default();
        assert!(tolerance.check(QuantityKind::Mass, 1.0e6, 1.0e6 + 1e-6).is_some());
        assert!(tolerance.check(QuantityKind::MomentumX, -5.0e4, -5.0e4 - 1e-6).is_some());
        assert!(tolerance.check(QuantityKind::Charge, 3.0, 3.0 + 1e-12).is_none());
    }
}
