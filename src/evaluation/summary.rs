//! Per-model evaluation summary with lazily computed, memoized statistics.
//!
//! A [`ModelSummary`] owns the records of one model run, split once into
//! valid and missing (sentinel rank) partitions. Every derived statistic is
//! computed on first request and cached for the lifetime of the summary.
//!
//! Model-level rank and hit statistics are micro-averaged per transaction
//! first and then macro-averaged across transactions, so transactions with
//! many left-out qualifiers do not dominate the score. Per-qualifier
//! statistics are plain means over that qualifier's records.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::common::error::{EvalError, EvalResult};
use crate::common::time::TimeUnit;
use crate::data::domain::{EvalRecord, ResultFile};

use super::domain::{GroupColumn, GroupKey, GroupStats, HitCutoff, ModelStats};
use super::stats::{self, round4};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
enum StatKey {
    Qualifiers { missing: bool },
    AverageRank { qualifier: Option<String> },
    HitRate { cutoff: HitCutoff, qualifier: Option<String> },
    Grouped { column: GroupColumn },
}

#[derive(Clone, Debug)]
enum Stat {
    Scalar(f64),
    Qualifiers(Arc<BTreeSet<String>>),
    Table(Arc<Vec<GroupStats>>),
}

/// Evaluation results of a single model run.
#[derive(Debug)]
pub struct ModelSummary {
    model_id: u64,
    trans_count: u64,
    eval_count: u64,
    eval_time: u64,
    qualifier_pop: BTreeMap<String, u64>,
    valid: Vec<EvalRecord>,
    missing: Vec<EvalRecord>,
    missing_percent: f64,
    cache: RefCell<HashMap<StatKey, Stat>>,
}

impl ModelSummary {
    /// Partition `records` and set up an empty cache.
    ///
    /// Fails with `DivisionByZero` when `eval_count` is 0.
    pub fn new(
        model_id: u64,
        trans_count: u64,
        eval_count: u64,
        eval_time: u64,
        qualifier_pop: BTreeMap<String, u64>,
        records: Vec<EvalRecord>,
    ) -> EvalResult<Self> {
        if eval_count == 0 {
            return Err(EvalError::DivisionByZero(
                "missing percentage needs a non-zero evaluation count",
            ));
        }

        let (missing, valid): (Vec<_>, Vec<_>) =
            records.into_iter().partition(EvalRecord::is_missing);
        let missing_percent = missing.len() as f64 / eval_count as f64;

        Ok(Self {
            model_id,
            trans_count,
            eval_count,
            eval_time,
            qualifier_pop,
            valid,
            missing,
            missing_percent,
            cache: RefCell::new(HashMap::new()),
        })
    }

    /// Build a summary from a decoded result file, deriving the transaction count.
    pub fn from_result_file(file: ResultFile) -> EvalResult<Self> {
        let trans_count = file.transaction_count();
        Self::new(
            file.model_id,
            trans_count,
            file.eval_count,
            file.eval_time,
            file.qualifier_pop,
            file.eval_results,
        )
    }

    pub fn model_id(&self) -> u64 {
        self.model_id
    }

    pub fn trans_count(&self) -> u64 {
        self.trans_count
    }

    pub fn eval_count(&self) -> u64 {
        self.eval_count
    }

    pub fn qualifier_pop(&self) -> &BTreeMap<String, u64> {
        &self.qualifier_pop
    }

    /// Records that received a rank.
    pub fn valid(&self) -> &[EvalRecord] {
        &self.valid
    }

    /// Records whose qualifier was never recommended back.
    pub fn missing(&self) -> &[EvalRecord] {
        &self.missing
    }

    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Missing records as a fraction of all evaluations.
    pub fn missing_percent(&self) -> f64 {
        self.missing_percent
    }

    /// Number of records, valid and missing.
    pub fn len(&self) -> usize {
        self.valid.len() + self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of statistics currently memoized.
    pub fn cached_entries(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Unique qualifiers of the missing or the valid partition.
    pub fn qualifiers(&self, missing: bool) -> Arc<BTreeSet<String>> {
        let key = StatKey::Qualifiers { missing };
        if let Some(Stat::Qualifiers(set)) = self.cache.borrow().get(&key) {
            return Arc::clone(set);
        }

        let source = if missing { &self.missing } else { &self.valid };
        let set: Arc<BTreeSet<String>> =
            Arc::new(source.iter().map(|r| r.left_out.clone()).collect());
        self.cache
            .borrow_mut()
            .insert(key, Stat::Qualifiers(Arc::clone(&set)));
        set
    }

    /// How often `qualifier` was left out during evaluation.
    pub fn qualifier_popularity(&self, qualifier: &str) -> EvalResult<u64> {
        self.qualifier_pop
            .get(qualifier)
            .copied()
            .ok_or_else(|| self.unknown_qualifier(qualifier))
    }

    /// Valid records whose left-out qualifier is `qualifier`.
    pub fn qualifier_records(&self, qualifier: &str) -> EvalResult<Vec<&EvalRecord>> {
        let records: Vec<_> = self
            .valid
            .iter()
            .filter(|r| r.left_out == qualifier)
            .collect();
        if records.is_empty() {
            return Err(self.unknown_qualifier(qualifier));
        }
        Ok(records)
    }

    /// Qualifiers of the popularity table ordered by count, ties by name.
    ///
    /// With `include_missing` unset, qualifiers that appear in the missing
    /// partition are left out of the ranking altogether.
    pub fn qualifiers_by_popularity(&self, ascending: bool, include_missing: bool) -> Vec<String> {
        let excluded = if include_missing {
            None
        } else {
            Some(self.qualifiers(true))
        };

        let mut ranked: Vec<(&String, u64)> = self
            .qualifier_pop
            .iter()
            .filter(|(q, _)| excluded.as_ref().map_or(true, |set| !set.contains(*q)))
            .map(|(q, count)| (q, *count))
            .collect();

        ranked.sort_by(|(qa, ca), (qb, cb)| {
            let by_count = if ascending { ca.cmp(cb) } else { cb.cmp(ca) };
            by_count.then_with(|| qa.cmp(qb))
        });

        ranked.into_iter().map(|(q, _)| q.clone()).collect()
    }

    /// Evaluation time in `unit` ("ns", "ms" or "s"), total or per evaluation.
    pub fn eval_time(&self, unit: &str, average: bool) -> EvalResult<f64> {
        let unit: TimeUnit = unit.parse()?;
        let nanos = if average {
            self.eval_time as f64 / self.eval_count as f64
        } else {
            self.eval_time as f64
        };
        Ok(unit.from_nanos(nanos))
    }

    /// Average rank of the model, or of one qualifier.
    pub fn average_rank(&self, qualifier: Option<&str>) -> EvalResult<f64> {
        let key = StatKey::AverageRank {
            qualifier: qualifier.map(str::to_string),
        };
        self.cached_scalar(key, || {
            let value = match qualifier {
                Some(q) => {
                    let ranks: Vec<f64> = self
                        .qualifier_records(q)?
                        .iter()
                        .map(|r| f64::from(r.rank))
                        .collect();
                    stats::mean(&ranks)
                }
                None => stats::mean(&self.per_transaction(|r| f64::from(r.rank))),
            };
            Ok(round4(value))
        })
    }

    /// Percentage of hits at cutoff `r` (1, 5 or 10), for the model or one qualifier.
    pub fn hit_rate(&self, r: u32, qualifier: Option<&str>) -> EvalResult<f64> {
        let cutoff = HitCutoff::try_from(r)?;
        let key = StatKey::HitRate {
            cutoff,
            qualifier: qualifier.map(str::to_string),
        };
        self.cached_scalar(key, || {
            let hit = |r: &EvalRecord| if cutoff.hit(r) { 100.0 } else { 0.0 };
            let value = match qualifier {
                Some(q) => {
                    let hits: Vec<f64> = self.qualifier_records(q)?.into_iter().map(hit).collect();
                    stats::mean(&hits)
                }
                None => stats::mean(&self.per_transaction(hit)),
            };
            Ok(round4(value))
        })
    }

    /// Average rank and hit rates of the whole model.
    pub fn statistics(&self) -> EvalResult<ModelStats> {
        Ok(ModelStats {
            mean: self.average_rank(None)?,
            top1: self.hit_rate(1, None)?,
            top5: self.hit_rate(5, None)?,
            top10: self.hit_rate(10, None)?,
        })
    }

    /// Rank and hit statistics per value of the `groupby` column.
    ///
    /// Records are first averaged per (group value, transaction), then those
    /// per-transaction rows are summarised per group value. Repeated calls
    /// return the same shared table.
    pub fn grouped_statistics(&self, groupby: &str) -> EvalResult<Arc<Vec<GroupStats>>> {
        let column: GroupColumn = groupby.parse()?;
        let key = StatKey::Grouped { column };
        if let Some(Stat::Table(table)) = self.cache.borrow().get(&key) {
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(self.compute_grouped(column));
        tracing::debug!(
            model = self.model_id,
            column = column.name(),
            groups = table.len(),
            "computed grouped statistics"
        );
        self.cache
            .borrow_mut()
            .insert(key, Stat::Table(Arc::clone(&table)));
        Ok(table)
    }

    fn compute_grouped(&self, column: GroupColumn) -> Vec<GroupStats> {
        // micro: mean per (group value, transaction)
        let mut per_pair: BTreeMap<(GroupKey, u32), Accumulator> = BTreeMap::new();
        for record in &self.valid {
            per_pair
                .entry((column.key(record), record.trans_id))
                .or_default()
                .push(record);
        }

        // macro: summarise the per-transaction means of each group value
        let mut per_group: BTreeMap<GroupKey, Vec<[f64; 4]>> = BTreeMap::new();
        for ((group, _), acc) in per_pair {
            per_group.entry(group).or_default().push(acc.means());
        }

        per_group
            .into_iter()
            .map(|(group, rows)| {
                let column_of = |i: usize| rows.iter().map(|row| row[i]).collect::<Vec<_>>();
                let ranks = column_of(0);
                GroupStats {
                    group,
                    count: rows.len() as u64,
                    mean: round4(stats::mean(&ranks)),
                    median: round4(stats::median(&ranks)),
                    stddev: round4(stats::sample_std(&ranks)),
                    top1: round4(stats::mean(&column_of(1)) * 100.0),
                    top5: round4(stats::mean(&column_of(2)) * 100.0),
                    top10: round4(stats::mean(&column_of(3)) * 100.0),
                }
            })
            .collect()
    }

    /// Mean of `value` per transaction id, in transaction order.
    fn per_transaction<F>(&self, value: F) -> Vec<f64>
    where
        F: Fn(&EvalRecord) -> f64,
    {
        let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for record in &self.valid {
            let entry = sums.entry(record.trans_id).or_insert((0.0, 0));
            entry.0 += value(record);
            entry.1 += 1;
        }
        sums.into_values()
            .map(|(sum, n)| sum / n as f64)
            .collect()
    }

    fn cached_scalar<F>(&self, key: StatKey, compute: F) -> EvalResult<f64>
    where
        F: FnOnce() -> EvalResult<f64>,
    {
        if let Some(Stat::Scalar(value)) = self.cache.borrow().get(&key) {
            return Ok(*value);
        }
        // No borrow is held while computing: `compute` may consult the cache itself.
        let value = compute()?;
        self.cache.borrow_mut().insert(key, Stat::Scalar(value));
        Ok(value)
    }

    fn unknown_qualifier(&self, qualifier: &str) -> EvalError {
        EvalError::qualifier_not_found(qualifier, self.qualifiers(false).iter())
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Model {} with {} evaluations in {} ns",
            self.model_id, self.eval_count, self.eval_time
        )
    }
}

/// Running sums of rank and hit flags for one (group value, transaction) pair.
#[derive(Default)]
struct Accumulator {
    rank: f64,
    hits: [f64; 3],
    n: usize,
}

impl Accumulator {
    fn push(&mut self, record: &EvalRecord) {
        self.rank += f64::from(record.rank);
        for (slot, cutoff) in self.hits.iter_mut().zip(HitCutoff::ALL) {
            if cutoff.hit(record) {
                *slot += 1.0;
            }
        }
        self.n += 1;
    }

    fn means(&self) -> [f64; 4] {
        let n = self.n as f64;
        [
            self.rank / n,
            self.hits[0] / n,
            self.hits[1] / n,
            self.hits[2] / n,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorCode;
    use crate::data::domain::MISSING_RANK;
    use approx::assert_relative_eq;

    fn record(trans_id: u32, left_out: &str, rank: u32) -> EvalRecord {
        EvalRecord::ranked(trans_id, left_out, rank)
    }

    fn summary(records: Vec<EvalRecord>, pop: &[(&str, u64)]) -> ModelSummary {
        let eval_count = records.len() as u64;
        let trans_count = records.last().map(|r| u64::from(r.trans_id) + 1).unwrap_or(0);
        let pop = pop.iter().map(|(q, c)| (q.to_string(), *c)).collect();
        ModelSummary::new(9, trans_count, eval_count, 2_000_000, pop, records).unwrap()
    }

    fn two_transactions() -> ModelSummary {
        summary(
            vec![record(0, "P31", 6), record(1, "P17", 1)],
            &[("P31", 1), ("P17", 1)],
        )
    }

    #[test]
    fn worked_example() {
        let s = two_transactions();
        assert_eq!(s.average_rank(None).unwrap(), 3.5);
        assert_eq!(s.hit_rate(1, None).unwrap(), 50.0);
        assert_eq!(s.hit_rate(5, None).unwrap(), 50.0);
        assert_eq!(s.hit_rate(10, None).unwrap(), 100.0);
        assert_eq!(s.missing_percent(), 0.0);
    }

    #[test]
    fn average_rank_rounds_half_to_even() {
        let mut records: Vec<_> = (0..31).map(|t| record(t, "P31", 1)).collect();
        records.push(record(31, "P31", 2));
        let s = summary(records, &[("P31", 32)]);
        assert_eq!(s.average_rank(None).unwrap(), 1.0312);
        assert_eq!(s.hit_rate(1, None).unwrap(), 96.875);
    }

    #[test]
    fn partition_is_exact_and_disjoint() {
        let records = vec![
            record(0, "P1", 2),
            record(0, "P2", MISSING_RANK),
            record(1, "P3", 11),
            record(2, "P1", MISSING_RANK),
        ];
        let s = summary(records.clone(), &[]);
        assert_eq!(s.valid().len(), 2);
        assert_eq!(s.missing().len(), 2);
        assert!(s.valid().iter().all(|r| !r.is_missing()));
        assert!(s.missing().iter().all(EvalRecord::is_missing));

        let mut rejoined: Vec<_> = s.valid().iter().chain(s.missing()).cloned().collect();
        let mut original = records;
        let order = |r: &EvalRecord| (r.trans_id, r.left_out.clone());
        rejoined.sort_by_key(order);
        original.sort_by_key(order);
        assert_eq!(rejoined, original);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn missing_records_only_count_towards_missing_percent() {
        let s = summary(
            vec![record(0, "P31", 4), record(1, "P17", MISSING_RANK)],
            &[("P31", 1), ("P17", 1)],
        );
        assert_eq!(s.average_rank(None).unwrap(), 4.0);
        assert_eq!(s.hit_rate(5, None).unwrap(), 100.0);
        assert_eq!(s.missing_count(), 1);
        assert_eq!(s.missing_percent(), 0.5);
    }

    #[test]
    fn zero_evaluations_is_division_by_zero() {
        let err = ModelSummary::new(1, 0, 0, 0, BTreeMap::new(), Vec::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DivisionByZero);
    }

    #[test]
    fn model_average_is_micro_then_macro() {
        // transaction 0 holds three evaluations, transaction 1 only one
        let s = summary(
            vec![
                record(0, "P1", 1),
                record(0, "P2", 1),
                record(0, "P3", 1),
                record(1, "P1", 9),
            ],
            &[],
        );
        assert_eq!(s.average_rank(None).unwrap(), 5.0);
        assert_eq!(s.hit_rate(1, None).unwrap(), 50.0);
    }

    #[test]
    fn qualifier_average_is_a_plain_mean() {
        let s = summary(
            vec![
                record(0, "P1", 1),
                record(0, "P1", 2),
                record(1, "P1", 9),
                record(1, "P2", 4),
            ],
            &[("P1", 3), ("P2", 1)],
        );
        assert_eq!(s.average_rank(Some("P1")).unwrap(), 4.0);
        assert_relative_eq!(s.hit_rate(1, Some("P1")).unwrap(), 33.3333);
        assert_eq!(s.hit_rate(5, Some("P1")).unwrap(), 66.6667);
        assert_eq!(s.hit_rate(10, Some("P2")).unwrap(), 100.0);
    }

    #[test]
    fn unknown_qualifier_lists_valid_ones() {
        let s = two_transactions();
        let err = s.average_rank(Some("P999")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.to_string(),
            "qualifier P999 not found, must be one of [P17, P31]"
        );
        assert_eq!(
            s.qualifier_popularity("P999").unwrap_err().to_string(),
            err.to_string()
        );
        assert_eq!(s.qualifier_popularity("P31").unwrap(), 1);
    }

    #[test]
    fn qualifier_records_excludes_missing_partition() {
        let s = summary(
            vec![record(0, "P1", 3), record(1, "P2", MISSING_RANK)],
            &[("P1", 1), ("P2", 1)],
        );
        assert_eq!(s.qualifier_records("P1").unwrap().len(), 1);
        assert!(s.qualifier_records("P2").is_err());
    }

    #[test]
    fn qualifier_sets_are_split_by_partition() {
        let s = summary(
            vec![
                record(0, "P1", 3),
                record(0, "P2", MISSING_RANK),
                record(1, "P1", MISSING_RANK),
            ],
            &[],
        );
        let valid: Vec<_> = s.qualifiers(false).iter().cloned().collect();
        let missing: Vec<_> = s.qualifiers(true).iter().cloned().collect();
        assert_eq!(valid, vec!["P1"]);
        assert_eq!(missing, vec!["P1", "P2"]);
        assert!(Arc::ptr_eq(&s.qualifiers(true), &s.qualifiers(true)));
    }

    #[test]
    fn popularity_ranking_drops_missing_qualifiers() {
        let s = summary(
            vec![
                record(0, "P1", 1),
                record(0, "P2", MISSING_RANK),
                record(1, "P3", 4),
            ],
            &[("P1", 5), ("P2", 9), ("P3", 2), ("P4", 5)],
        );
        assert_eq!(s.qualifiers_by_popularity(false, true), ["P2", "P1", "P4", "P3"]);
        assert_eq!(s.qualifiers_by_popularity(true, true), ["P3", "P1", "P4", "P2"]);
        assert_eq!(s.qualifiers_by_popularity(false, false), ["P1", "P4", "P3"]);
    }

    #[test]
    fn eval_time_units() {
        let s = two_transactions();
        assert_eq!(s.eval_time("ms", true).unwrap(), 1.0);
        assert_eq!(s.eval_time("ns", false).unwrap(), 2_000_000.0);
        assert_eq!(s.eval_time("s", false).unwrap(), 0.002);
        let err = s.eval_time("h", false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn invalid_cutoff_leaves_cache_untouched() {
        let s = two_transactions();
        s.average_rank(None).unwrap();
        let before = s.cached_entries();
        let err = s.hit_rate(3, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(s.cached_entries(), before);
    }

    #[test]
    fn invalid_groupby_leaves_cache_untouched() {
        let s = two_transactions();
        s.grouped_statistics("NumTypes").unwrap();
        let before = s.cached_entries();
        let err = s.grouped_statistics("Popularity").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(s.cached_entries(), before);
    }

    #[test]
    fn failed_qualifier_lookup_is_not_cached() {
        let s = two_transactions();
        assert!(s.hit_rate(1, Some("P404")).is_err());
        // only the valid qualifier set used for the message is memoized
        assert_eq!(s.cached_entries(), 1);
    }

    #[test]
    fn grouped_statistics_are_shared() {
        let s = two_transactions();
        let first = s.grouped_statistics("LeftOut").unwrap();
        let second = s.grouped_statistics("LeftOut").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn grouped_statistics_micro_then_macro() {
        let mut records = vec![
            // NumTypes 1: transaction 0 averages to rank 2, transaction 1 to rank 6
            record(0, "P1", 1),
            record(0, "P2", 3),
            record(1, "P1", 6),
            // NumTypes 2: a single transaction
            record(2, "P1", 12),
        ];
        for r in records.iter_mut().take(3) {
            r.num_types = 1;
        }
        records[3].num_types = 2;
        let s = summary(records, &[]);

        let table = s.grouped_statistics("NumTypes").unwrap();
        assert_eq!(table.len(), 2);

        let one = &table[0];
        assert_eq!(one.group, GroupKey::Int(1));
        assert_eq!(one.count, 2);
        assert_eq!(one.mean, 4.0);
        assert_eq!(one.median, 4.0);
        assert_relative_eq!(one.stddev, 2.8284);
        assert_eq!(one.top1, 25.0);
        assert_eq!(one.top5, 50.0);
        assert_eq!(one.top10, 100.0);

        let two = &table[1];
        assert_eq!(two.group, GroupKey::Int(2));
        assert_eq!(two.count, 1);
        assert_eq!(two.stddev, 0.0);
        assert_eq!(two.top10, 0.0);
    }

    #[test]
    fn statistics_bundle_headline_numbers() {
        let stats = two_transactions().statistics().unwrap();
        assert_eq!(
            stats,
            ModelStats {
                mean: 3.5,
                top1: 50.0,
                top5: 50.0,
                top10: 100.0
            }
        );
    }

    #[test]
    fn display_names_model() {
        assert_eq!(
            two_transactions().to_string(),
            "Model 9 with 2 evaluations in 2000000 ns"
        );
    }
}
