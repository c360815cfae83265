//! Property tests for model summaries.
//!
//! - Valid and missing partitions reproduce the input exactly
//! - Hit rates stay within [0, 100]
//! - With one record per transaction the model rank is the plain mean
//! - Popularity rankings without missing qualifiers never mention them

use std::collections::BTreeMap;

use proptest::collection::vec;
use proptest::prelude::*;
use rankeval::data::{EvalRecord, MISSING_RANK};
use rankeval::evaluation::ModelSummary;

const QUALIFIERS: [&str; 5] = ["P17", "P31", "P106", "P279", "P569"];

// =============================================================================
// Strategy Helpers
// =============================================================================

/// A rank that is missing roughly one time in five.
fn rank() -> impl Strategy<Value = u32> {
    prop_oneof![4 => 1u32..200, 1 => Just(MISSING_RANK)]
}

/// Records over a handful of transactions, several per transaction.
fn records(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<EvalRecord>> {
    vec((0u32..8, 0..QUALIFIERS.len(), rank()), len).prop_map(|raw| {
        let mut records: Vec<EvalRecord> = raw
            .into_iter()
            .map(|(trans_id, q, rank)| EvalRecord::ranked(trans_id, QUALIFIERS[q], rank))
            .collect();
        records.sort_by_key(|r| r.trans_id);
        records
    })
}

fn summarise(records: Vec<EvalRecord>) -> ModelSummary {
    let mut pop: BTreeMap<String, u64> = BTreeMap::new();
    for r in &records {
        *pop.entry(r.left_out.clone()).or_insert(0) += 1;
    }
    let trans_count = records.last().map_or(0, |r| u64::from(r.trans_id) + 1);
    let eval_count = records.len().max(1) as u64;
    ModelSummary::new(7, trans_count, eval_count, 1_000, pop, records).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_partition_is_exact(input in records(0..60)) {
        let summary = summarise(input.clone());

        prop_assert_eq!(summary.valid().len() + summary.missing().len(), input.len());
        prop_assert!(summary.valid().iter().all(|r| r.rank != MISSING_RANK));
        prop_assert!(summary.missing().iter().all(|r| r.rank == MISSING_RANK));

        let mut rejoined: Vec<EvalRecord> =
            summary.valid().iter().chain(summary.missing()).cloned().collect();
        let mut expected = input;
        let order = |a: &EvalRecord, b: &EvalRecord| {
            (a.trans_id, &a.left_out, a.rank).cmp(&(b.trans_id, &b.left_out, b.rank))
        };
        rejoined.sort_by(order);
        expected.sort_by(order);
        prop_assert_eq!(rejoined, expected);
    }

    #[test]
    fn prop_hit_rate_bounded(input in records(1..60)) {
        let summary = summarise(input);
        prop_assume!(!summary.valid().is_empty());

        for r in [1, 5, 10] {
            let rate = summary.hit_rate(r, None).unwrap();
            prop_assert!((0.0..=100.0).contains(&rate), "hits@{} = {} out of range", r, rate);
        }
    }

    #[test]
    fn prop_hit_rates_are_monotone_in_cutoff(input in records(1..60)) {
        let summary = summarise(input);
        prop_assume!(!summary.valid().is_empty());

        let at1 = summary.hit_rate(1, None).unwrap();
        let at5 = summary.hit_rate(5, None).unwrap();
        let at10 = summary.hit_rate(10, None).unwrap();
        prop_assert!(at1 <= at5 && at5 <= at10);
    }

    #[test]
    fn prop_single_record_transactions_average_plainly(ranks in vec(1u32..500, 1..40)) {
        let input: Vec<EvalRecord> = ranks
            .iter()
            .enumerate()
            .map(|(i, &rank)| EvalRecord::ranked(i as u32, "P31", rank))
            .collect();
        let summary = summarise(input);

        let plain = ranks.iter().map(|&r| f64::from(r)).sum::<f64>() / ranks.len() as f64;
        let averaged = summary.average_rank(None).unwrap();
        prop_assert!((averaged - plain).abs() < 1e-4, "{} vs {}", averaged, plain);
    }

    #[test]
    fn prop_popularity_excludes_missing(input in records(0..60), ascending in any::<bool>()) {
        let summary = summarise(input);
        let missing = summary.qualifiers(true);

        let ranked = summary.qualifiers_by_popularity(ascending, false);
        prop_assert!(ranked.iter().all(|q| !missing.contains(q)));

        let everything = summary.qualifiers_by_popularity(ascending, true);
        prop_assert_eq!(everything.len(), summary.qualifier_pop().len());
    }

    #[test]
    fn prop_grouped_tables_are_shared(input in records(1..60)) {
        let summary = summarise(input);
        let first = summary.grouped_statistics("LeftOut").unwrap();
        let second = summary.grouped_statistics("LeftOut").unwrap();
        prop_assert!(std::sync::Arc::ptr_eq(&first, &second));

        let counted: u64 = first.iter().map(|row| row.count).sum();
        prop_assert!(counted as usize <= summary.valid().len());
    }
}
