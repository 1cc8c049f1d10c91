//! Element table: atomic masses and pairwise bond energies.

use serde::Serialize;

use crate::component::ElementCounts;

/// One row of the element table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Element {
    /// Chemical symbol, e.g. `"Fe"`.
    pub symbol: &'static str,
    /// English name.
    pub name: &'static str,
    /// Proton count.
    pub atomic_number: u8,
    /// Unified atomic mass units.
    pub atomic_mass: f64,
    /// Pauling scale. Zero for noble gases.
    pub electronegativity: f64,
}

/// Every element the chemistry laws know about.
pub const ELEMENTS: [Element; 7] = [
    Element {
        symbol: "H",
        name: "Hydrogen",
        atomic_number: 1,
        atomic_mass: 1.008,
        electronegativity: 2.20,
    },
    Element {
        symbol: "He",
        name: "Helium",
        atomic_number: 2,
        atomic_mass: 4.003,
        electronegativity: 0.0,
    },
    Element {
        symbol: "C",
        name: "Carbon",
        atomic_number: 6,
        atomic_mass: 12.011,
        electronegativity: 2.55,
    },
    Element {
        symbol: "N",
        name: "Nitrogen",
        atomic_number: 7,
        atomic_mass: 14.007,
        electronegativity: 3.04,
    },
    Element {
        symbol: "O",
        name: "Oxygen",
        atomic_number: 8,
        atomic_mass: 15.999,
        electronegativity: 3.44,
    },
    Element {
        symbol: "Si",
        name: "Silicon",
        atomic_number: 14,
        atomic_mass: 28.085,
        electronegativity: 1.90,
    },
    Element {
        symbol: "Fe",
        name: "Iron",
        atomic_number: 26,
        atomic_mass: 55.845,
        electronegativity: 1.83,
    },
];

/// Bond energies in kJ/mol. Each unordered pair appears once.
const BOND_ENERGIES: [(&str, &str, f64); 16] = [
    ("H", "H", 436.0),
    ("H", "C", 413.0),
    ("H", "O", 467.0),
    ("H", "N", 391.0),
    ("C", "C", 346.0),
    ("C", "O", 358.0),
    ("C", "N", 305.0),
    ("N", "N", 945.0),
    ("N", "O", 201.0),
    ("O", "O", 498.0),
    ("Si", "Si", 226.0),
    ("Si", "O", 452.0),
    ("Si", "C", 301.0),
    ("Si", "H", 323.0),
    ("Fe", "Fe", 118.0),
    ("Fe", "O", 407.0),
];

/// Look up an element by symbol.
pub fn element(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Bond energy between two elements. Symmetric; unknown pairs bond at zero.
pub fn bond_energy(a: &str, b: &str) -> f64 {
    BOND_ENERGIES
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map_or(0.0, |(_, _, e)| *e)
}

/// Sum of atomic masses. Unknown symbols contribute nothing.
pub fn molecular_mass(counts: &ElementCounts) -> f64 {
    counts
        .iter()
        .filter_map(|(symbol, n)| element(symbol).map(|e| e.atomic_mass * f64::from(*n)))
        .sum()
}

/// Rough bond energy of a composition.
///
/// Every distinct pair bonds `min(n_a, n_b)` times; like atoms pair off.
pub fn composition_bond_energy(counts: &ElementCounts) -> f64 {
    let entries: Vec<(&String, u32)> = counts.iter().map(|(s, n)| (s, *n)).collect();
    let mut total = 0.0;
    for (i, (a, na)) in entries.iter().enumerate() {
        total += bond_energy(a, a) * f64::from(na / 2);
        for (b, nb) in &entries[i + 1..] {
            total += bond_energy(a, b) * f64::from((*na).min(*nb));
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ChemicalBody;

    #[test]
    fn bond_energy_is_symmetric() {
        assert_eq!(bond_energy("H", "O"), 467.0);
        assert_eq!(bond_energy("O", "H"), 467.0);
        assert_eq!(bond_energy("Si", "O"), bond_energy("O", "Si"));
    }

    #[test]
    fn noble_and_unknown_pairs_do_not_bond() {
        assert_eq!(bond_energy("He", "H"), 0.0);
        assert_eq!(bond_energy("Xx", "O"), 0.0);
    }

    #[test]
    fn water_mass_and_bonds() {
        let water = ChemicalBody::from_pairs([("H", 2), ("O", 1)]).element_counts;
        assert!((molecular_mass(&water) - 18.015).abs() < 1e-9);
        // H-H once (2 H pair off), H-O once (min(2, 1))
        assert_eq!(composition_bond_energy(&water), 436.0 + 467.0);
    }

    #[test]
    fn lookup_by_symbol() {
        assert_eq!(element("Fe").map(|e| e.atomic_number), Some(26));
        assert!(element("Xx").is_none());
    }
}
