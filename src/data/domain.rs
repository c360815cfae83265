//! Evaluation records and the per-model result file they arrive in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::common::error::EvalResult;

/// Rank recorded when the left-out qualifier never showed up in the recommendations.
pub const MISSING_RANK: u32 = 5843;

/// One left-out qualifier evaluated within one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRecord {
    #[serde(rename = "TransID")]
    pub trans_id: u32,
    #[serde(rename = "LeftOut")]
    pub left_out: String,
    #[serde(rename = "SetSize")]
    pub set_size: u32,
    #[serde(rename = "NumTypes")]
    pub num_types: u32,
    #[serde(rename = "NumObjTypes", default)]
    pub num_obj_types: u32,
    #[serde(rename = "NumSubjTypes", default)]
    pub num_subj_types: u32,
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "HitsAt1", deserialize_with = "flag")]
    pub hits_at_1: bool,
    #[serde(rename = "HitsAt5", deserialize_with = "flag")]
    pub hits_at_5: bool,
    #[serde(rename = "HitsAt10", deserialize_with = "flag")]
    pub hits_at_10: bool,
    #[serde(rename = "Duration", default)]
    pub duration: u64,
}

impl EvalRecord {
    /// Build a record from its rank, deriving the hit flags.
    pub fn ranked(trans_id: u32, left_out: impl Into<String>, rank: u32) -> Self {
        Self {
            trans_id,
            left_out: left_out.into(),
            set_size: 0,
            num_types: 0,
            num_obj_types: 0,
            num_subj_types: 0,
            rank,
            hits_at_1: rank <= 1,
            hits_at_5: rank <= 5,
            hits_at_10: rank <= 10,
            duration: 0,
        }
    }

    /// Whether the recommender failed to produce a rank for this record.
    pub fn is_missing(&self) -> bool {
        self.rank == MISSING_RANK
    }

    /// Number of non-type items (qualifiers) that fed the recommendation.
    pub fn num_non_types(&self) -> u32 {
        self.set_size.saturating_sub(self.num_types)
    }
}

/// Contents of one result file, as written by the evaluator for one model run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    #[serde(rename = "ModelID", deserialize_with = "model_id")]
    pub model_id: u64,
    #[serde(rename = "EvalCount")]
    pub eval_count: u64,
    #[serde(rename = "EvalTime")]
    pub eval_time: u64,
    #[serde(rename = "QualifierPop", default, deserialize_with = "null_as_default")]
    pub qualifier_pop: BTreeMap<String, u64>,
    #[serde(rename = "EvalResults", default, deserialize_with = "null_as_default")]
    pub eval_results: Vec<EvalRecord>,
}

impl ResultFile {
    /// Transactions covered by the file: last transaction id + 1, or 0 when empty.
    pub fn transaction_count(&self) -> u64 {
        self.eval_results
            .last()
            .map(|record| u64::from(record.trans_id) + 1)
            .unwrap_or(0)
    }
}

/// Source of per-model result files.
pub trait RecordSource {
    /// Every result file the source knows about, in no particular order.
    fn list(&self) -> EvalResult<Vec<PathBuf>>;
    /// Decode a single result file.
    fn load(&self, path: &Path) -> EvalResult<ResultFile>;
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(other) => Err(serde::de::Error::custom(format!(
            "hit flag must be 0 or 1, got {other}"
        ))),
    }
}

fn model_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("model id {text:?} is not an integer"))
        }),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{"TransID":3,"LeftOut":"P17","SetSize":5,"NumTypes":2,
        "NumObjTypes":1,"NumSubjTypes":1,"Rank":4,"HitsAt1":0,"HitsAt5":1,"HitsAt10":1}"#;

    #[test]
    fn decodes_integer_hit_flags() {
        let record: EvalRecord = serde_json::from_str(RECORD).unwrap();
        assert_eq!(record.trans_id, 3);
        assert_eq!(record.left_out, "P17");
        assert!(!record.hits_at_1);
        assert!(record.hits_at_5);
        assert!(record.hits_at_10);
        assert_eq!(record.duration, 0);
        assert_eq!(record.num_non_types(), 3);
    }

    #[test]
    fn rejects_out_of_range_flags() {
        let raw = RECORD.replace("\"HitsAt5\":1", "\"HitsAt5\":2");
        assert!(serde_json::from_str::<EvalRecord>(&raw).is_err());
    }

    #[test]
    fn accepts_string_model_ids_and_null_collections() {
        let raw = r#"{"ModelID":"42","EvalCount":0,"EvalTime":0,"QualifierPop":null,"EvalResults":null}"#;
        let file: ResultFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.model_id, 42);
        assert!(file.qualifier_pop.is_empty());
        assert_eq!(file.transaction_count(), 0);
    }

    #[test]
    fn rejects_non_numeric_model_ids() {
        let raw = r#"{"ModelID":"tree-a","EvalCount":0,"EvalTime":0}"#;
        let err = serde_json::from_str::<ResultFile>(raw).unwrap_err();
        assert!(err.to_string().contains("not an integer"));
    }

    #[test]
    fn transaction_count_uses_last_record() {
        let file = ResultFile {
            model_id: 1,
            eval_count: 3,
            eval_time: 0,
            qualifier_pop: BTreeMap::new(),
            eval_results: vec![
                EvalRecord::ranked(0, "P1", 1),
                EvalRecord::ranked(0, "P2", 3),
                EvalRecord::ranked(6, "P1", MISSING_RANK),
            ],
        };
        assert_eq!(file.transaction_count(), 7);
    }

    #[test]
    fn non_type_count_saturates() {
        let mut record = EvalRecord::ranked(0, "P1", 2);
        record.set_size = 1;
        record.num_types = 4;
        assert_eq!(record.num_non_types(), 0);
    }
}
