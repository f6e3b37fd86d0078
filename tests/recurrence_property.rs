// tests/recurrence_property.rs

//! Property tests for recurrence field expansion.

use std::collections::BTreeSet;

use proptest::prelude::*;

use jobflow::recurrence::{CronField, FieldKind};

/// Strategy producing a mix of single values and valid ranges within the
/// minute field's 0-59 span, plus the set of integers they describe.
fn minute_tokens_strategy() -> impl Strategy<Value = (Vec<String>, BTreeSet<u32>)> {
    let single = (0u32..=59)
        .prop_map(|v| (v.to_string(), BTreeSet::from([v])))
        .boxed();
    let range = (0u32..=58)
        .prop_flat_map(|low| {
            ((low + 1)..=59).prop_map(move |high| {
                (format!("{low}-{high}"), (low..=high).collect::<BTreeSet<u32>>())
            })
        })
        .boxed();

    proptest::collection::vec(prop_oneof![single, range], 1..8).prop_map(|tokens| {
        let mut rendered = Vec::new();
        let mut expected = BTreeSet::new();
        for (text, values) in tokens {
            rendered.push(text);
            expected.extend(values);
        }
        (rendered, expected)
    })
}

proptest! {
    /// Parsing a rendered field yields exactly the union of its tokens' spans.
    #[test]
    fn expansion_is_exact_union((tokens, expected) in minute_tokens_strategy()) {
        let input = tokens.join(",");
        let field = CronField::parse(FieldKind::Minute, &input).unwrap();

        let expanded = field.expanded().expect("non-star field has a set");
        prop_assert_eq!(expanded, &expected);

        for v in 0u32..=59 {
            prop_assert_eq!(field.matches(v), expected.contains(&v));
        }
    }

    /// Any token containing an out-of-range value is rejected.
    #[test]
    fn out_of_range_single_is_rejected(v in 60u32..=500) {
        prop_assert!(CronField::parse(FieldKind::Minute, &v.to_string()).is_err());
    }

    /// Ranges whose upper bound does not exceed the lower bound are rejected.
    #[test]
    fn non_increasing_range_is_rejected(low in 0u32..=59, delta in 0u32..=59) {
        let high = low.saturating_sub(delta);
        let input = format!("{low}-{high}");
        prop_assert!(CronField::parse(FieldKind::Minute, &input).is_err());
    }
}
