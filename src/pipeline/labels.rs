//! Completeness tiers: cluster-to-label mapping and the rule-based reference
//!
//! Cluster ids are arbitrary. The mapper ranks clusters by their median
//! completeness and hands out Low, Medium, High in that order. The rule-based
//! classifier tiers each record directly from its completeness percentage and
//! is used only as an evaluation reference.

use serde::Serialize;

use super::error::{Warning, WarningScope};

/// Records above this completeness are High.
pub const HIGH_THRESHOLD: f64 = 80.0;

/// Records above this completeness (and not High) are Medium.
pub const MEDIUM_THRESHOLD: f64 = 40.0;

/// Ordinal completeness tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TierLabel {
    Low,
    Medium,
    High,
}

impl TierLabel {
    /// Canonical order: Low, Medium, High.
    pub const ALL: [TierLabel; 3] = [TierLabel::Low, TierLabel::Medium, TierLabel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierLabel::Low => "Low",
            TierLabel::Medium => "Medium",
            TierLabel::High => "High",
        }
    }

    /// Position in the canonical order.
    pub fn index(&self) -> usize {
        match self {
            TierLabel::Low => 0,
            TierLabel::Medium => 1,
            TierLabel::High => 2,
        }
    }
}

impl std::fmt::Display for TierLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule-based tier: strictly above 80 is High, strictly above 40 is Medium.
pub fn classify_completeness(percentage: f64) -> TierLabel {
    if percentage > HIGH_THRESHOLD {
        TierLabel::High
    } else if percentage > MEDIUM_THRESHOLD {
        TierLabel::Medium
    } else {
        TierLabel::Low
    }
}

/// Cluster id to tier mapping, with the statistics it was derived from.
#[derive(Debug, Clone, Serialize)]
pub struct LabelMapping {
    /// Tier per cluster id
    pub labels: Vec<TierLabel>,
    /// Median completeness per cluster id; `None` for empty clusters
    pub medians: Vec<Option<f64>>,
    pub warnings: Vec<Warning>,
}

impl LabelMapping {
    pub fn label_of(&self, cluster: usize) -> TierLabel {
        self.labels[cluster]
    }

    /// Map every record's cluster id to its tier.
    pub fn apply(&self, assignments: &[usize]) -> Vec<TierLabel> {
        assignments.iter().map(|&c| self.labels[c]).collect()
    }
}

/// Median of a slice, averaging the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Rank clusters by median completeness and assign tiers.
///
/// Clusters are sorted by median ascending. Exact median ties are broken by
/// cluster id ascending, so the lower id receives the lower tier.
///
/// When some clusters are empty, the populated ones are spread across the tier
/// range so the lowest and highest medians still get Low and High. Two
/// populated clusters map to Low and High, a single one to Low. Empty clusters
/// take the tiers left over, in cluster id order, and each raises a warning.
pub fn map_cluster_labels(
    assignments: &[usize],
    completeness: &[f64],
    n_clusters: usize,
) -> LabelMapping {
    let mut members: Vec<Vec<f64>> = vec![Vec::new(); n_clusters];
    for (&c, &pct) in assignments.iter().zip(completeness) {
        members[c].push(pct);
    }
    let medians: Vec<Option<f64>> = members.iter().map(|m| median(m)).collect();

    let mut populated: Vec<(usize, f64)> = medians
        .iter()
        .enumerate()
        .filter_map(|(c, m)| m.map(|m| (c, m)))
        .collect();
    populated.sort_by(|(a, ma), (b, mb)| {
        ma.partial_cmp(mb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(b))
    });

    let last_tier = TierLabel::ALL.len() - 1;
    let n_tiers = n_clusters.min(TierLabel::ALL.len());
    let mut labels = vec![TierLabel::Low; n_clusters];
    let mut taken = vec![false; TierLabel::ALL.len()];
    for (rank, &(cluster, _)) in populated.iter().enumerate() {
        let tier = tier_position(rank, populated.len(), n_tiers).min(last_tier);
        labels[cluster] = TierLabel::ALL[tier];
        taken[tier] = true;
    }

    let mut free = (0..TierLabel::ALL.len()).filter(|&t| !taken[t]);
    for cluster in (0..n_clusters).filter(|&c| medians[c].is_none()) {
        let tier = free.next().unwrap_or(last_tier);
        labels[cluster] = TierLabel::ALL[tier];
    }

    let warnings = medians
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_none())
        .map(|(c, _)| {
            Warning::new(
                WarningScope::Labels,
                format!(
                    "Cluster {} is empty; its label {} is assigned to no records",
                    c, labels[c]
                ),
            )
        })
        .collect();

    LabelMapping {
        labels,
        medians,
        warnings,
    }
}

/// Tier index of the `rank`-th of `populated` clusters over `n_tiers` tiers,
/// rounded to the nearest tier with both ends pinned.
fn tier_position(rank: usize, populated: usize, n_tiers: usize) -> usize {
    if populated <= 1 || n_tiers <= 1 {
        return 0;
    }
    let span = populated - 1;
    (rank * (n_tiers - 1) + span / 2) / span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_truth_thresholds() {
        assert_eq!(classify_completeness(0.0), TierLabel::Low);
        assert_eq!(classify_completeness(40.0), TierLabel::Low);
        assert_eq!(classify_completeness(40.01), TierLabel::Medium);
        assert_eq!(classify_completeness(80.0), TierLabel::Medium);
        assert_eq!(classify_completeness(80.01), TierLabel::High);
        assert_eq!(classify_completeness(100.0), TierLabel::High);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_labels_follow_medians_not_ids() {
        // cluster 0 is the high band, cluster 2 the low band
        let assignments = [0, 0, 1, 1, 2, 2];
        let completeness = [90.0, 95.0, 50.0, 55.0, 10.0, 20.0];
        let mapping = map_cluster_labels(&assignments, &completeness, 3);

        assert_eq!(mapping.labels, vec![TierLabel::High, TierLabel::Medium, TierLabel::Low]);
        assert_eq!(
            mapping.apply(&assignments),
            vec![
                TierLabel::High,
                TierLabel::High,
                TierLabel::Medium,
                TierLabel::Medium,
                TierLabel::Low,
                TierLabel::Low
            ]
        );
        assert!(mapping.warnings.is_empty());
    }

    #[test]
    fn test_median_tie_breaks_by_cluster_id() {
        let assignments = [0, 1, 2];
        let completeness = [50.0, 50.0, 10.0];
        let mapping = map_cluster_labels(&assignments, &completeness, 3);
        assert_eq!(mapping.label_of(2), TierLabel::Low);
        assert_eq!(mapping.label_of(0), TierLabel::Medium);
        assert_eq!(mapping.label_of(1), TierLabel::High);
    }

    #[test]
    fn test_empty_cluster_leaves_extremes_to_populated_clusters() {
        let assignments = [1, 1, 2, 2];
        let completeness = [90.0, 80.0, 10.0, 20.0];
        let mapping = map_cluster_labels(&assignments, &completeness, 3);
        assert_eq!(mapping.label_of(2), TierLabel::Low);
        assert_eq!(mapping.label_of(1), TierLabel::High);
        assert_eq!(mapping.label_of(0), TierLabel::Medium);
        assert_eq!(mapping.medians[0], None);
        assert_eq!(mapping.warnings.len(), 1);
        assert!(mapping.warnings[0].message.contains("Medium"));
    }

    #[test]
    fn test_two_distinct_groups_keep_low_and_high() {
        // five complete records and five empty ones, cluster 2 unused
        let assignments = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let completeness = [100.0, 100.0, 100.0, 100.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mapping = map_cluster_labels(&assignments, &completeness, 3);

        assert_eq!(
            mapping.labels,
            vec![TierLabel::High, TierLabel::Low, TierLabel::Medium]
        );
        let actual: Vec<TierLabel> = completeness.iter().map(|&c| classify_completeness(c)).collect();
        assert_eq!(mapping.apply(&assignments), actual);
    }

    #[test]
    fn test_single_populated_cluster_is_low() {
        let mapping = map_cluster_labels(&[2, 2, 2], &[60.0, 70.0, 80.0], 3);
        assert_eq!(mapping.label_of(2), TierLabel::Low);
        assert_eq!(mapping.label_of(0), TierLabel::Medium);
        assert_eq!(mapping.label_of(1), TierLabel::High);
        assert_eq!(mapping.warnings.len(), 2);
    }

    #[test]
    fn test_tier_positions_pin_both_ends() {
        assert_eq!((0..3).map(|r| tier_position(r, 3, 3)).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!((0..2).map(|r| tier_position(r, 2, 3)).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(tier_position(0, 1, 3), 0);
    }
}
