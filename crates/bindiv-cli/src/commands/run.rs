use std::error::Error;
use std::path::PathBuf;

use bindiv_diff::ProcessDiffer;
use bindiv_exp::{load_plan, run_study, RunOpts};
use bindiv_stat::EmbeddingOutcome;
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Study plan YAML.
    #[arg(long)]
    pub plan: PathBuf,
    /// Output directory for results, logs and exports.
    #[arg(long)]
    pub out: PathBuf,
    /// Number of diff invocations run in parallel.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,
    /// Re-use the outputs of pairs that succeeded in an earlier run; failed pairs are re-run.
    #[arg(long, default_value_t = false)]
    pub resume: bool,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let plan = load_plan(&args.plan)?;
    let differ = ProcessDiffer::new(plan.tool.clone())
        .require_result(plan.extraction.requires_result_file())
        .resume(args.resume);
    let opts = RunOpts {
        concurrency: args.concurrency,
    };
    let report = run_study(&plan, &differ, &args.out, &opts)?;

    let summary = &report.summary;
    println!(
        "pairs: {} scheduled, {} succeeded, {} tool failed, {} no result",
        summary.scheduled, summary.succeeded, summary.tool_failed, summary.no_result
    );
    println!(
        "skipped: {} name(s), {} group(s); missing cells: {}",
        summary.skipped_names, summary.skipped_groups, summary.missing_cells
    );
    match &report.embedding {
        EmbeddingOutcome::Embedded(embedding) => println!(
            "embedding: {} points, normalized stress {:.4}",
            embedding.points.len(),
            embedding.normalized_stress
        ),
        EmbeddingOutcome::Refused { reason } => println!("cannot embed: {reason}"),
    }
    println!("report: {}", args.out.join(bindiv_exp::REPORT_FILE).display());
    Ok(())
}
