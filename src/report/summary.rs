//! Console summary tables for a tiering run

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{
    ClassMetrics, Evaluation, MetricsTable, RankingTable, RunComparison, TierLabel, TieringRun,
    DAVIES_BOULDIN,
};

/// Ranking rows shown per dimension; the exported CSV carries all of them.
const RANKING_PREVIEW_ROWS: usize = 10;

/// Wall-clock time of each pipeline step.
#[derive(Debug, Default)]
pub struct TimingSummary {
    pub steps: Vec<(String, Duration)>,
}

impl TimingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: impl Into<String>, elapsed: Duration) {
        self.steps.push((step.into(), elapsed));
    }

    pub fn total(&self) -> Duration {
        self.steps.iter().map(|(_, d)| *d).sum()
    }

    pub fn display(&self) {
        print_section("⏱", "TIMING");

        let mut table = new_table(vec!["Step", "Time"]);
        for (step, elapsed) in &self.steps {
            table.add_row(vec![
                Cell::new(step),
                Cell::new(format!("{:.2}s", elapsed.as_secs_f64())).set_alignment(CellAlignment::Right),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(format!("{:.2}s", self.total().as_secs_f64()))
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
        ]);
        print_indented(&table);
    }
}

/// Print every result table of one run.
pub fn display_run(run: &TieringRun) {
    let title = run.algorithm.title();

    print_section("📋", &format!("{} RESULTS", title.to_uppercase()));
    print_indented(&cluster_table(run));

    print_section("📈", &format!("{} METRICS", title.to_uppercase()));
    print_indented(&metrics_table(&run.evaluation.metrics));

    print_section("🧮", "CONFUSION MATRIX (rows: rule-based, columns: predicted)");
    print_indented(&confusion_table(&run.evaluation));

    print_section("📝", "CLASSIFICATION REPORT");
    print_indented(&classification_table(&run.evaluation));

    for ranking in &run.rankings {
        print_section(
            "🏆",
            &format!("BEST {}", ranking.dimension.column().to_uppercase()),
        );
        print_indented(&ranking_table(ranking, RANKING_PREVIEW_ROWS));
        if ranking.rows.len() > RANKING_PREVIEW_ROWS {
            println!(
                "    {}",
                style(format!(
                    "... {} more group(s) in the exported report",
                    ranking.rows.len() - RANKING_PREVIEW_ROWS
                ))
                .dim()
            );
        }
    }
}

/// Print the side-by-side comparison of two runs.
pub fn display_comparison(comparison: &RunComparison) {
    print_section("⚖️", "ALGORITHM COMPARISON");

    let mut table = new_table(vec![
        "Metric",
        comparison.left.title(),
        comparison.right.title(),
    ]);
    for (left, right) in comparison
        .left_metrics
        .rows()
        .iter()
        .zip(comparison.right_metrics.rows())
    {
        let lower_is_better = left.name == DAVIES_BOULDIN;
        let (left_color, right_color) = match (left.value, right.value) {
            (Some(l), Some(r)) if l != r => {
                let left_wins = (l < r) == lower_is_better;
                if left_wins {
                    (Color::Green, Color::White)
                } else {
                    (Color::White, Color::Green)
                }
            }
            _ => (Color::White, Color::White),
        };
        table.add_row(vec![
            Cell::new(&left.name),
            Cell::new(format_metric(left.value)).fg(left_color),
            Cell::new(format_metric(right.value)).fg(right_color),
        ]);
    }
    print_indented(&table);

    println!();
    println!(
        "    Label agreement between {} and {}: {}",
        comparison.left.title(),
        comparison.right.title(),
        style(format!("{:.1}%", comparison.label_agreement * 100.0))
            .cyan()
            .bold()
    );
}

fn cluster_table(run: &TieringRun) -> Table {
    let mut table = new_table(vec!["Cluster", "Label", "Records", "Median Completeness"]);
    let sizes = run.partition.cluster_sizes();

    let mut order: Vec<usize> = (0..run.mapping.labels.len()).collect();
    order.sort_by_key(|&c| std::cmp::Reverse(run.mapping.labels[c]));

    for c in order {
        let label = run.mapping.labels[c];
        table.add_row(vec![
            Cell::new(c),
            Cell::new(label.as_str()).fg(tier_color(label)),
            Cell::new(sizes[c]).set_alignment(CellAlignment::Right),
            Cell::new(
                run.mapping.medians[c]
                    .map(|m| format!("{:.2}%", m))
                    .unwrap_or_else(|| "-".to_string()),
            )
            .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn metrics_table(metrics: &MetricsTable) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    for row in metrics.rows() {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(format_metric(row.value))
                .fg(Color::Cyan)
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn confusion_table(evaluation: &Evaluation) -> Table {
    let mut header = vec![String::new()];
    header.extend(TierLabel::ALL.iter().map(|l| format!("Pred {}", l)));
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for actual in TierLabel::ALL {
        let mut row = vec![Cell::new(format!("Actual {}", actual)).add_attribute(Attribute::Bold)];
        for predicted in TierLabel::ALL {
            let count = evaluation.confusion.get(actual, predicted);
            let cell = Cell::new(count).set_alignment(CellAlignment::Right);
            row.push(if actual == predicted && count > 0 {
                cell.fg(Color::Green)
            } else if count > 0 {
                cell.fg(Color::Red)
            } else {
                cell
            });
        }
        table.add_row(row);
    }
    table
}

pub fn classification_table(evaluation: &Evaluation) -> Table {
    let report = &evaluation.report;
    let mut table = new_table(vec!["Class", "Precision", "Recall", "F1-Score", "Support"]);

    let metric_row = |name: &str, m: &ClassMetrics| -> Vec<Cell> {
        vec![
            Cell::new(name),
            Cell::new(format!("{:.4}", m.precision)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", m.recall)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", m.f1_score)).set_alignment(CellAlignment::Right),
            Cell::new(m.support).set_alignment(CellAlignment::Right),
        ]
    };

    for (label, m) in &report.classes {
        table.add_row(metric_row(label.as_str(), m));
    }
    table.add_row(vec![
        Cell::new("accuracy").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(format!("{:.4}", report.accuracy))
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Right),
        Cell::new(report.macro_avg.support).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(metric_row("macro avg", &report.macro_avg));
    table.add_row(metric_row("weighted avg", &report.weighted_avg));
    table
}

pub fn ranking_table(ranking: &RankingTable, limit: usize) -> Table {
    let mut header = vec![ranking.dimension.column(), "High", "Medium", "Low"];
    if ranking.dimension.includes_total() {
        header.push("Total");
    }
    header.push("Total_Score");
    let mut table = new_table(header);

    for row in ranking.rows.iter().take(limit) {
        let mut cells = vec![
            Cell::new(&row.group),
            Cell::new(row.high).fg(tier_color(TierLabel::High)),
            Cell::new(row.medium).fg(tier_color(TierLabel::Medium)),
            Cell::new(row.low).fg(tier_color(TierLabel::Low)),
        ];
        if let Some(total) = row.total {
            cells.push(Cell::new(total));
        }
        cells.push(Cell::new(row.total_score).add_attribute(Attribute::Bold));
        table.add_row(cells);
    }
    table
}

fn format_metric(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "undefined".to_string())
}

fn tier_color(label: TierLabel) -> Color {
    match label {
        TierLabel::High => Color::Green,
        TierLabel::Medium => Color::Yellow,
        TierLabel::Low => Color::Red,
    }
}

fn new_table<S: ToString>(header: Vec<S>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .into_iter()
            .map(|h| Cell::new(h.to_string()).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

// Indent the table
fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{rank_groups, Dimension};

    #[test]
    fn test_ranking_table_respects_limit_and_total_column() {
        let groups: Vec<Option<String>> = ["A", "B", "C"].iter().map(|g| Some(g.to_string())).collect();
        let labels = [TierLabel::High, TierLabel::Medium, TierLabel::Low];

        let unit = rank_groups(&groups, &labels, Dimension::Unit);
        let rendered = ranking_table(&unit, 2).to_string();
        assert!(rendered.contains("Total_Score"));
        assert!(rendered.contains("Total"));
        assert!(rendered.contains('A'));
        assert!(!rendered.contains('C'));
    }

    #[test]
    fn test_undefined_metrics_render_as_text() {
        let metrics = MetricsTable {
            accuracy: 1.0,
            silhouette: None,
            calinski_harabasz: Some(12.5),
            davies_bouldin: None,
        };
        let rendered = metrics_table(&metrics).to_string();
        assert!(rendered.contains("undefined"));
        assert!(rendered.contains("12.5000"));
    }

    #[test]
    fn test_timing_total() {
        let mut timing = TimingSummary::new();
        timing.record("Load", Duration::from_millis(250));
        timing.record("Cluster", Duration::from_millis(750));
        assert_eq!(timing.total(), Duration::from_secs(1));
    }
}
