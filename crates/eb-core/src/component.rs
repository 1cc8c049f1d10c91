use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Scale};
use crate::error::EbError;

/// Element symbol to atom count. Keys are unique and iterate in symbol order.
pub type ElementCounts = BTreeMap<String, u32>;

/// Scale-specific data carried by an entity.
///
/// The variant *is* the entity's scale: an organism always carries a genome,
/// phenotype and energy store, a molecule always carries element counts, and
/// so on. Laws never check for loose optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scale", rename_all = "snake_case")]
pub enum Body {
    /// A single atom: one element with count 1.
    Atomic(ChemicalBody),
    /// A molecule with its element counts.
    Molecular(ChemicalBody),
    /// A composite formed by aggregation.
    Material(MaterialBody),
    /// A living organism.
    Organismal(OrganismBody),
    /// A population tracked as a count.
    Population(PopulationBody),
    /// A built structure.
    Structural(StructuralBody),
}

impl Body {
    /// The scale this body belongs to.
    pub fn scale(&self) -> Scale {
        match self {
            Self::Atomic(_) => Scale::Atomic,
            Self::Molecular(_) => Scale::Molecular,
            Self::Material(_) => Scale::Material,
            Self::Organismal(_) => Scale::Organismal,
            Self::Population(_) => Scale::Population,
            Self::Structural(_) => Scale::Structural,
        }
    }

    /// Element counts for chemical bodies and aggregates.
    pub fn element_counts(&self) -> Option<&ElementCounts> {
        match self {
            Self::Atomic(c) | Self::Molecular(c) => Some(&c.element_counts),
            Self::Material(m) => Some(&m.element_counts),
            _ => None,
        }
    }

    /// The organism payload, if any.
    pub fn as_organism(&self) -> Option<&OrganismBody> {
        match self {
            Self::Organismal(o) => Some(o),
            _ => None,
        }
    }

    /// Mutable organism payload, if any.
    pub fn as_organism_mut(&mut self) -> Option<&mut OrganismBody> {
        match self {
            Self::Organismal(o) => Some(o),
            _ => None,
        }
    }

    /// The aggregate payload, if any.
    pub fn as_material(&self) -> Option<&MaterialBody> {
        match self {
            Self::Material(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable population payload, if any.
    pub fn as_population_mut(&mut self) -> Option<&mut PopulationBody> {
        match self {
            Self::Population(p) => Some(p),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Chemistry
// ---------------------------------------------------------------------------

/// Composition of an atom or molecule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChemicalBody {
    /// Element symbol to atom count.
    pub element_counts: ElementCounts,
}

impl ChemicalBody {
    /// Wrap an existing count map.
    pub fn new(element_counts: ElementCounts) -> Self {
        Self { element_counts }
    }

    /// Build from `(symbol, count)` pairs. Repeated symbols are summed.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        let mut element_counts = ElementCounts::new();
        for (symbol, count) in pairs {
            *element_counts.entry(symbol.to_string()).or_insert(0) += count;
        }
        Self { element_counts }
    }
}

/// Union two element-count maps by summing counts per symbol.
pub fn union_counts(a: &ElementCounts, b: &ElementCounts) -> ElementCounts {
    let mut merged = a.clone();
    for (symbol, count) in b {
        *merged.entry(symbol.clone()).or_insert(0) += count;
    }
    merged
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

/// A composite formed by aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialBody {
    /// Weak back-references to the constituents. Never an ownership relation.
    pub aggregate_of: Vec<EntityId>,
    /// Energy carried over from the constituents at formation time.
    pub conserved_energy: f64,
    /// Union of the constituents' element counts.
    pub element_counts: ElementCounts,
}

// ---------------------------------------------------------------------------
// Organism
// ---------------------------------------------------------------------------

/// Genome, phenotype and energy reserve of an organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismBody {
    /// Heritable base sequence.
    pub genome: Genome,
    /// Expressed traits, including `fitness`.
    pub phenotype: Phenotype,
    /// Biological energy reserve. Zero or below means starvation.
    pub energy_stores: f64,
    /// Ancestry of this organism.
    pub lineage: Lineage,
    /// Production and upkeep rates, when the organism has them.
    pub metabolism: Option<Metabolism>,
}

impl OrganismBody {
    /// A founder organism with an empty phenotype and no metabolism.
    pub fn new(genome: Genome, energy_stores: f64) -> Self {
        Self {
            genome,
            phenotype: Phenotype::default(),
            energy_stores,
            lineage: Lineage::default(),
            metabolism: None,
        }
    }
}

/// Ancestry bookkeeping set at reproduction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    /// Inherited from the earliest ancestor. `None` for founders.
    pub lineage_id: Option<EntityId>,
    /// 0 for founders, parent + 1 for offspring.
    pub generation: u32,
    /// Direct parent. `None` for founders.
    pub parent_id: Option<EntityId>,
}

impl Lineage {
    /// Lineage of a child born to `parent_id` whose own lineage is `self`.
    pub fn child_of(&self, parent_id: EntityId) -> Self {
        Self {
            lineage_id: Some(self.lineage_id.unwrap_or(parent_id)),
            generation: self.generation + 1,
            parent_id: Some(parent_id),
        }
    }
}

/// Fixed energy income and upkeep of an organism.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metabolism {
    /// Energy gained per second.
    pub energy_production: f64,
    /// Energy spent per second on upkeep.
    pub maintenance_cost: f64,
}

/// One symbol of the four-letter genome alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Base {
    /// Adenine.
    A,
    /// Cytosine.
    C,
    /// Guanine.
    G,
    /// Thymine.
    T,
}

impl Base {
    /// Every base, in alphabet order.
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

    /// The upper-case letter for this base.
    pub fn to_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::G => 'G',
            Self::T => 'T',
        }
    }

    /// Parse one letter, case-insensitively.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Self::A),
            'C' => Some(Self::C),
            'G' => Some(Self::G),
            'T' => Some(Self::T),
            _ => None,
        }
    }
}

/// A finite base sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Genome(Vec<Base>);

impl Genome {
    /// Wrap a base vector.
    pub fn from_bases(bases: Vec<Base>) -> Self {
        Self(bases)
    }

    /// The bases in order.
    pub fn bases(&self) -> &[Base] {
        &self.0
    }

    /// Number of bases.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for an empty genome.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of positions where two genomes differ. Extra tail bases count as differences.
    pub fn hamming(&self, other: &Genome) -> usize {
        let common = self
            .0
            .iter()
            .zip(&other.0)
            .filter(|(a, b)| a != b)
            .count();
        common + self.0.len().abs_diff(other.0.len())
    }
}

impl FromStr for Genome {
    type Err = EbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .enumerate()
            .map(|(position, symbol)| {
                Base::from_char(symbol).ok_or(EbError::InvalidGenome { symbol, position })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl TryFrom<String> for Genome {
    type Error = EbError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Genome> for String {
    fn from(g: Genome) -> Self {
        g.to_string()
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for base in &self.0 {
            write!(f, "{}", base.to_char())?;
        }
        Ok(())
    }
}

/// Trait name to numeric value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phenotype(BTreeMap<String, f64>);

impl Phenotype {
    /// Trait key holding the derived fitness.
    pub const FITNESS: &'static str = "fitness";

    /// Look up a trait.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Insert or replace a trait.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Derived fitness written by the selection law. `None` until the first pass.
    pub fn fitness(&self) -> Option<f64> {
        self.get(Self::FITNESS)
    }

    /// Write the derived fitness.
    pub fn set_fitness(&mut self, value: f64) {
        self.set(Self::FITNESS, value);
    }

    /// Every trait in name order.
    pub fn traits(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Phenotype {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// Population & structure
// ---------------------------------------------------------------------------

/// Logistic population model of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationBody {
    /// Individuals, kept continuous.
    pub count: f64,
    /// Count the environment can sustain (K).
    pub carrying_capacity: f64,
    /// Intrinsic growth rate per second (r).
    pub growth_rate: f64,
    /// 1 for producers, higher for consumers.
    pub trophic_level: u8,
}

/// A shelter or other built structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralBody {
    /// 0.0 (collapsed) ..= 1.0 (intact).
    pub integrity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genome_round_trips_through_string() {
        let genome: Genome = "ACGTTGCA".parse().unwrap();
        assert_eq!(genome.len(), 8);
        assert_eq!(genome.to_string(), "ACGTTGCA");
    }

    #[test]
    fn genome_rejects_foreign_symbols() {
        let err = "ACGU".parse::<Genome>().unwrap_err();
        match err {
            EbError::InvalidGenome { symbol, position } => {
                assert_eq!(symbol, 'U');
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hamming_counts_substitutions_and_length_difference() {
        let a: Genome = "AAAA".parse().unwrap();
        let b: Genome = "AATAGG".parse().unwrap();
        assert_eq!(a.hamming(&b), 3);
    }

    #[test]
    fn lineage_child_inherits_or_starts_from_parent() {
        let parent = EntityId::new();
        let founder = Lineage::default();
        let child = founder.child_of(parent);
        assert_eq!(child.lineage_id, Some(parent));
        assert_eq!(child.generation, 1);

        let grandchild = child.child_of(EntityId::new());
        assert_eq!(grandchild.lineage_id, Some(parent));
        assert_eq!(grandchild.generation, 2);
    }

    #[test]
    fn union_counts_sums_shared_symbols() {
        let water = ChemicalBody::from_pairs([("H", 2), ("O", 1)]);
        let methane = ChemicalBody::from_pairs([("C", 1), ("H", 4)]);
        let merged = union_counts(&water.element_counts, &methane.element_counts);
        assert_eq!(merged.get("H"), Some(&6));
        assert_eq!(merged.get("O"), Some(&1));
        assert_eq!(merged.get("C"), Some(&1));
    }

    #[test]
    fn body_scale_matches_variant() {
        let body = Body::Molecular(ChemicalBody::default());
        assert_eq!(body.scale(), Scale::Molecular);
        assert!(body.element_counts().is_some());
        assert!(body.as_organism().is_none());
    }

    #[test]
    fn phenotype_fitness_accessors() {
        let mut p: Phenotype = [("speed", 1.5)].into_iter().collect();
        assert!(p.fitness().is_none());
        p.set_fitness(0.75);
        assert_eq!(p.fitness(), Some(0.75));
        assert_eq!(p.get("speed"), Some(1.5));
    }

    #[test]
    fn genome_serializes_as_string() {
        let genome: Genome = "GATTACA".parse().unwrap();
        let json = serde_json::to_string(&genome).unwrap();
        assert_eq!(json, "\"GATTACA\"");
        let back: Genome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, genome);
    }
}
