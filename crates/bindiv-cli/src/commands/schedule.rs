use std::error::Error;
use std::path::PathBuf;

use bindiv_exp::{load_plan, prepare_study};
use clap::Args;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Study plan YAML.
    #[arg(long)]
    pub plan: PathBuf,
}

pub fn run(args: &ScheduleArgs) -> Result<(), Box<dyn Error>> {
    let plan = load_plan(&args.plan)?;
    let prepared = prepare_study(&plan)?;

    for entry in &prepared.catalog.groups {
        println!(
            "group {}: {} artifact(s) in {}",
            entry.group.label,
            entry.names.len(),
            entry.group.root.display()
        );
    }
    for issue in &prepared.catalog.issues {
        println!("skipped group {}: {}", issue.label, issue.message);
    }
    for skipped in &prepared.schedule.skipped {
        println!(
            "skipped name {} (present in: {})",
            skipped.name,
            skipped.groups.join(", ")
        );
    }
    for (index, pair) in prepared.schedule.pairs.iter().enumerate() {
        println!("{index:>5}  {}  {pair}", pair.id());
    }
    println!("{} pair(s) scheduled", prepared.schedule.len());
    Ok(())
}
