//! Grouped tier counts and weighted ranking per organizational dimension

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use super::error::{PipelineError, PipelineResult, Warning, WarningScope};
use super::labels::TierLabel;
use super::schema::{GENDER_COLUMN, LOCATION_COLUMN, STATUS_COLUMN, UNIT_COLUMN};

/// Points per record in each tier, shared by every dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierWeights {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

pub const TIER_WEIGHTS: TierWeights = TierWeights {
    high: 3,
    medium: 2,
    low: 1,
};

impl TierWeights {
    pub fn score(&self, high: usize, medium: usize, low: usize) -> usize {
        high * self.high + medium * self.medium + low * self.low
    }
}

/// Categorical dimension a ranking table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    Unit,
    Location,
    Status,
    Gender,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Unit,
        Dimension::Location,
        Dimension::Status,
        Dimension::Gender,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Unit => UNIT_COLUMN,
            Dimension::Location => LOCATION_COLUMN,
            Dimension::Status => STATUS_COLUMN,
            Dimension::Gender => GENDER_COLUMN,
        }
    }

    /// Snake-case key used in file names.
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Unit => "unit_kerja",
            Dimension::Location => "lokasi",
            Dimension::Status => "status",
            Dimension::Gender => "jenis_kelamin",
        }
    }

    /// Only the unit table carries a `Total` column.
    pub fn includes_total(&self) -> bool {
        matches!(self, Dimension::Unit)
    }
}

/// Counts and score for one dimension value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingRow {
    pub group: String,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    pub total_score: usize,
}

/// Groups of one dimension, sorted by `total_score` descending.
#[derive(Debug, Clone, Serialize)]
pub struct RankingTable {
    pub dimension: Dimension,
    pub rows: Vec<RankingRow>,
    pub warnings: Vec<Warning>,
}

impl RankingTable {
    pub fn get(&self, group: &str) -> Option<&RankingRow> {
        self.rows.iter().find(|r| r.group == group)
    }

    /// Tabular form: group, High, Medium, Low, [Total,] Total_Score.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![
            Column::new(
                self.dimension.column().into(),
                self.rows.iter().map(|r| r.group.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                "High".into(),
                self.rows.iter().map(|r| r.high as u64).collect::<Vec<_>>(),
            ),
            Column::new(
                "Medium".into(),
                self.rows.iter().map(|r| r.medium as u64).collect::<Vec<_>>(),
            ),
            Column::new(
                "Low".into(),
                self.rows.iter().map(|r| r.low as u64).collect::<Vec<_>>(),
            ),
        ];
        if self.dimension.includes_total() {
            columns.push(Column::new(
                "Total".into(),
                self.rows
                    .iter()
                    .map(|r| r.total.unwrap_or(r.high + r.medium + r.low) as u64)
                    .collect::<Vec<_>>(),
            ));
        }
        columns.push(Column::new(
            "Total_Score".into(),
            self.rows.iter().map(|r| r.total_score as u64).collect::<Vec<_>>(),
        ));
        DataFrame::new(columns)
    }
}

/// Count tiers per group and rank.
///
/// Every group gets all three counts (zero when absent). Groups are first
/// ordered by value ascending, then stably sorted by score descending, so
/// equal scores keep value order. Records with no group value are skipped
/// with a warning on the table.
pub fn rank_groups(
    groups: &[Option<String>],
    labels: &[TierLabel],
    dimension: Dimension,
) -> RankingTable {
    let mut counts: BTreeMap<&str, [usize; 3]> = BTreeMap::new();
    let mut skipped = 0usize;

    for (group, label) in groups.iter().zip(labels) {
        match group {
            Some(g) => counts.entry(g.as_str()).or_insert([0; 3])[label.index()] += 1,
            None => skipped += 1,
        }
    }

    let mut rows: Vec<RankingRow> = counts
        .into_iter()
        .map(|(group, c)| {
            let (low, medium, high) = (c[0], c[1], c[2]);
            RankingRow {
                group: group.to_string(),
                high,
                medium,
                low,
                total: dimension.includes_total().then_some(high + medium + low),
                total_score: TIER_WEIGHTS.score(high, medium, low),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total_score.cmp(&a.total_score));

    let mut warnings = Vec::new();
    if skipped > 0 {
        warnings.push(Warning::new(
            WarningScope::Ranking(dimension.column().to_string()),
            format!("{} record(s) with no {} value were excluded", skipped, dimension.column()),
        ));
    }
    if rows.is_empty() {
        warnings.push(Warning::new(
            WarningScope::Ranking(dimension.column().to_string()),
            "No groups to rank",
        ));
    }

    RankingTable {
        dimension,
        rows,
        warnings,
    }
}

/// Read a categorical column as optional strings.
fn group_values(df: &DataFrame, column: &str) -> PipelineResult<Vec<Option<String>>> {
    let col = df.column(column).map_err(|_| PipelineError::MissingColumns {
        columns: vec![column.to_string()],
    })?;
    let as_str = col.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Build the ranking table for one dimension of a labeled table.
pub fn aggregate_dimension(
    df: &DataFrame,
    labels: &[TierLabel],
    dimension: Dimension,
) -> PipelineResult<RankingTable> {
    let groups = group_values(df, dimension.column())?;
    Ok(rank_groups(&groups, labels, dimension))
}

/// Ranking tables for all four dimensions, in unit, location, status, gender order.
pub fn aggregate_all(df: &DataFrame, labels: &[TierLabel]) -> PipelineResult<Vec<RankingTable>> {
    Dimension::ALL
        .iter()
        .map(|&d| aggregate_dimension(df, labels, d))
        .collect()
}
