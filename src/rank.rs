/// Orders candidates longest first, ties broken lexicographically. Length is
/// counted in characters. Duplicates are kept.
pub fn rank(mut candidates: Vec<String>) -> Vec<String> {
    candidates.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    candidates
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ranked_order_is_length_then_lexicographic(
            candidates in prop::collection::vec(any::<String>(), 0..12)
        ) {
            let ranked = rank(candidates.clone());
            for pair in ranked.windows(2) {
                let (a, b) = (pair[0].chars().count(), pair[1].chars().count());
                prop_assert!(a > b || (a == b && pair[0] <= pair[1]), "{:?}", pair);
            }
        }

        /// Ranking only reorders: every candidate survives, duplicates included.
        #[test]
        fn ranking_is_a_permutation(candidates in prop::collection::vec("[A-Z0-9]{0,6}", 0..12)) {
            let mut expected = candidates.clone();
            let mut ranked = rank(candidates);
            expected.sort();
            ranked.sort();
            prop_assert_eq!(ranked, expected);
        }
    }
}
