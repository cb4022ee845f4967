use ctdbrec::cluster::{DatabaseMap, VnnMap};
use proptest::prelude::*;

proptest! {
    /// Database-map equality is defined as set equality; any permutation
    /// of the same ids must compare equal.
    #[test]
    fn database_map_equality_ignores_order(mut ids in prop::collection::vec(0u32..1000, 0..20)) {
        let a = DatabaseMap::new(ids.clone());
        ids.reverse();
        let b = DatabaseMap::new(ids);
        prop_assert_eq!(a, b);
    }

    /// Two routing maps agree iff both generation and the full ordered
    /// sequence match.
    #[test]
    fn vnnmap_agreement_requires_identical_generation_and_sequence(
        generation in any::<u32>(),
        sequence in prop::collection::vec(0u32..64, 1..10),
    ) {
        let a = VnnMap::new(generation, sequence.clone());
        let b = VnnMap::new(generation, sequence.clone());
        prop_assert!(a.agrees_with(&b));

        let different_generation = VnnMap::new(generation.wrapping_add(1), sequence.clone());
        prop_assert!(!a.agrees_with(&different_generation));
    }

    /// Reversing a sequence of length > 1 with at least two distinct
    /// elements always changes agreement, since order is significant.
    #[test]
    fn vnnmap_agreement_is_order_sensitive(
        generation in any::<u32>(),
        sequence in prop::collection::vec(0u32..64, 2..10),
    ) {
        let a = VnnMap::new(generation, sequence.clone());
        let mut reversed = sequence.clone();
        reversed.reverse();
        let b = VnnMap::new(generation, reversed.clone());
        if reversed != sequence {
            prop_assert!(!a.agrees_with(&b));
        }
    }
}
