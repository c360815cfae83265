//! Statistic rows and the keys used to slice evaluation records.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::common::error::EvalError;
use crate::data::domain::EvalRecord;

/// Record column that grouped statistics can be computed over.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum GroupColumn {
    TransId,
    LeftOut,
    SetSize,
    NumTypes,
    NumObjTypes,
    NumSubjTypes,
    Rank,
    HitsAt1,
    HitsAt5,
    HitsAt10,
    Duration,
    NumNonTypes,
}

impl GroupColumn {
    pub const ALL: [GroupColumn; 12] = [
        GroupColumn::TransId,
        GroupColumn::LeftOut,
        GroupColumn::SetSize,
        GroupColumn::NumTypes,
        GroupColumn::NumObjTypes,
        GroupColumn::NumSubjTypes,
        GroupColumn::Rank,
        GroupColumn::HitsAt1,
        GroupColumn::HitsAt5,
        GroupColumn::HitsAt10,
        GroupColumn::Duration,
        GroupColumn::NumNonTypes,
    ];

    /// Column name as it appears in result files and CSV headers.
    pub fn name(self) -> &'static str {
        match self {
            GroupColumn::TransId => "TransID",
            GroupColumn::LeftOut => "LeftOut",
            GroupColumn::SetSize => "SetSize",
            GroupColumn::NumTypes => "NumTypes",
            GroupColumn::NumObjTypes => "NumObjTypes",
            GroupColumn::NumSubjTypes => "NumSubjTypes",
            GroupColumn::Rank => "Rank",
            GroupColumn::HitsAt1 => "HitsAt1",
            GroupColumn::HitsAt5 => "HitsAt5",
            GroupColumn::HitsAt10 => "HitsAt10",
            GroupColumn::Duration => "Duration",
            GroupColumn::NumNonTypes => "NumNonTypes",
        }
    }

    /// Value of this column for `record`.
    pub fn key(self, record: &EvalRecord) -> GroupKey {
        match self {
            GroupColumn::TransId => GroupKey::Int(record.trans_id.into()),
            GroupColumn::LeftOut => GroupKey::Text(record.left_out.clone()),
            GroupColumn::SetSize => GroupKey::Int(record.set_size.into()),
            GroupColumn::NumTypes => GroupKey::Int(record.num_types.into()),
            GroupColumn::NumObjTypes => GroupKey::Int(record.num_obj_types.into()),
            GroupColumn::NumSubjTypes => GroupKey::Int(record.num_subj_types.into()),
            GroupColumn::Rank => GroupKey::Int(record.rank.into()),
            GroupColumn::HitsAt1 => GroupKey::Int(record.hits_at_1.into()),
            GroupColumn::HitsAt5 => GroupKey::Int(record.hits_at_5.into()),
            GroupColumn::HitsAt10 => GroupKey::Int(record.hits_at_10.into()),
            GroupColumn::Duration => GroupKey::Int(record.duration),
            GroupColumn::NumNonTypes => GroupKey::Int(record.num_non_types().into()),
        }
    }
}

impl FromStr for GroupColumn {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupColumn::ALL
            .into_iter()
            .find(|column| column.name() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = GroupColumn::ALL.iter().map(|c| c.name()).collect();
                EvalError::invalid(format!(
                    "invalid groupby column {s}, must be one of [{}]",
                    valid.join(", ")
                ))
            })
    }
}

impl fmt::Display for GroupColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a grouping column. Integer keys order numerically.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Int(u64),
    Text(String),
}

impl GroupKey {
    /// Parse a key read back from a report; numeric text becomes an integer key.
    pub fn parse(raw: &str) -> Self {
        raw.parse()
            .map(GroupKey::Int)
            .unwrap_or_else(|_| GroupKey::Text(raw.to_string()))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Int(v) => write!(f, "{v}"),
            GroupKey::Text(v) => f.write_str(v),
        }
    }
}

/// Cutoff for hits@r.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HitCutoff {
    At1,
    At5,
    At10,
}

impl HitCutoff {
    pub const ALL: [HitCutoff; 3] = [HitCutoff::At1, HitCutoff::At5, HitCutoff::At10];

    pub fn value(self) -> u32 {
        match self {
            HitCutoff::At1 => 1,
            HitCutoff::At5 => 5,
            HitCutoff::At10 => 10,
        }
    }

    /// The record's stored hit flag for this cutoff.
    pub fn hit(self, record: &EvalRecord) -> bool {
        match self {
            HitCutoff::At1 => record.hits_at_1,
            HitCutoff::At5 => record.hits_at_5,
            HitCutoff::At10 => record.hits_at_10,
        }
    }
}

impl TryFrom<u32> for HitCutoff {
    type Error = EvalError;

    fn try_from(r: u32) -> Result<Self, Self::Error> {
        match r {
            1 => Ok(HitCutoff::At1),
            5 => Ok(HitCutoff::At5),
            10 => Ok(HitCutoff::At10),
            other => Err(EvalError::invalid(format!(
                "invalid r {other}, must be 1, 5 or 10"
            ))),
        }
    }
}

/// Statistics for one group value of one model.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupStats {
    pub group: GroupKey,
    pub count: u64,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub top1: f64,
    pub top5: f64,
    pub top10: f64,
}

/// Statistics for one group value, re-aggregated across models.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentGroupStats {
    pub group: GroupKey,
    pub count: u64,
    pub mean: f64,
    pub top1: f64,
    pub top5: f64,
    pub top10: f64,
}

/// Headline statistics of a single model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelStats {
    pub mean: f64,
    pub top1: f64,
    pub top5: f64,
    pub top10: f64,
}

/// Per-model headline statistics averaged over a batch of models.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggregateStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub top1: f64,
    pub top5: f64,
    pub top10: f64,
    /// Mean fraction of evaluations without a rank.
    pub missing: f64,
    /// Mean time per evaluation, in milliseconds.
    pub duration: f64,
}
