//! doctier: Document Completeness Tiering CLI Tool
//!
//! Loads a cleaned employee document checklist, clusters records into
//! completeness tiers with GMM and/or K-Means, evaluates the tiers and
//! exports ranking tables per organizational dimension.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use doctier::cli::{confirm_overwrite, Cli};
use doctier::pipeline::{
    compare_runs, dataset_stats, load_dataset, prepare_features, run_algorithm, TieringRun,
    WarningScope,
};
use doctier::report::{display_comparison, display_run, export_run, TimingSummary};
use doctier::utils::{
    print_banner, print_completion, print_config, print_count, print_info, print_step_header,
    print_step_time, print_success, print_warning, ConfigCard, StepSpinner,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.pipeline_config();
    let output_dir = (!cli.no_export).then(|| cli.output_dir());

    if let Some(dir) = &output_dir {
        if !confirm_overwrite(dir, cli.no_confirm)? {
            println!("Cancelled by user.");
            return Ok(());
        }
    }

    // Print styled banner
    print_banner(env!("CARGO_PKG_VERSION"));

    let algorithm_name = cli.algorithm.to_string();
    let policy_name = config.constant_policy.to_string();
    print_config(&ConfigCard {
        input: &cli.input,
        output_dir: output_dir.as_deref(),
        algorithm: &algorithm_name,
        seed: config.cluster.seed,
        n_documents: config.documents.len(),
        n_init: config.cluster.n_init,
        constant_policy: &policy_name,
    });

    let mut timing = TimingSummary::new();
    let mut step: u8 = 0;

    // Step 1: Load dataset
    step += 1;
    print_step_header(step, "Load Dataset");
    let step_start = Instant::now();
    let spinner = StepSpinner::start("Reading dataset...");
    let df = spinner.track(
        load_dataset(&cli.input, cli.infer_schema_length),
        "Failed to load dataset",
    )?;
    spinner.finish("Dataset loaded", 0);

    let stats = dataset_stats(&df);
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", stats.rows);
    println!("      Columns: {}", stats.columns);
    println!("      Estimated memory: {:.2} MB", stats.memory_mb);
    let elapsed = step_start.elapsed();
    timing.record("Load dataset", elapsed);
    print_step_time(elapsed);

    // Step 2: Completeness features and scaling
    step += 1;
    print_step_header(step, "Completeness Features");
    let step_start = Instant::now();
    let spinner = StepSpinner::start("Scoring completeness and standardizing features...");
    let prepared = spinner.track(
        prepare_features(&df, &config),
        "Feature construction failed",
    )?;
    spinner.finish("Features ready", prepared.scaled.warnings.len());

    print_count(
        "feature column(s) used for clustering",
        prepared.scaled.kept_columns.len(),
        Some(&format!("(of {})", prepared.table.feature_names.len())),
    );
    for warning in &prepared.scaled.warnings {
        print_warning(warning);
    }
    let elapsed = step_start.elapsed();
    timing.record("Features", elapsed);
    print_step_time(elapsed);

    // One step per algorithm: cluster, label, evaluate, aggregate
    let mut runs: Vec<TieringRun> = Vec::new();
    for algorithm in cli.algorithm.algorithms() {
        step += 1;
        print_step_header(step, &format!("{} Clustering", algorithm.title()));
        let step_start = Instant::now();
        let spinner = StepSpinner::start(format!("Fitting {}...", algorithm.title()));
        let run = spinner.track(
            run_algorithm(&prepared, algorithm, &config.cluster),
            &format!("{} failed", algorithm.title()),
        )?;
        let run_warnings: Vec<_> = run
            .warnings
            .iter()
            .filter(|w| w.scope != WarningScope::Scaler)
            .collect();
        spinner.finish(
            &format!(
                "{} converged in {} iteration(s)",
                algorithm.title(),
                run.partition.iterations
            ),
            run_warnings.len(),
        );

        let sizes = run.partition.cluster_sizes();
        print_info(&format!(
            "Cluster sizes: {}",
            sizes
                .iter()
                .enumerate()
                .map(|(c, n)| format!("{} ({}) = {}", c, run.mapping.label_of(c), n))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        for warning in run_warnings {
            print_warning(warning);
        }
        let elapsed = step_start.elapsed();
        timing.record(format!("{} clustering", algorithm.title()), elapsed);
        print_step_time(elapsed);

        display_run(&run);
        runs.push(run);
    }

    if let [left, right] = runs.as_slice() {
        display_comparison(&compare_runs(left, right));
    }

    // Final step: export
    if let Some(dir) = &output_dir {
        step += 1;
        print_step_header(step, "Save Results");
        let step_start = Instant::now();
        let spinner = StepSpinner::start("Writing output files...");
        let mut written = 0usize;
        for run in &runs {
            let paths = spinner.track(export_run(run, &config, &cli.input, dir), "Export failed")?;
            written += paths.len();
        }
        spinner.finish(&format!("Saved to {}", dir.display()), 0);
        print_success(&format!("{} file(s) written", written));
        let elapsed = step_start.elapsed();
        timing.record("Export", elapsed);
        print_step_time(elapsed);
    } else {
        print_info("Export disabled (--no-export)");
    }

    timing.display();

    // Final completion message
    print_completion();

    Ok(())
}
