use std::error::Error;
use std::fs;
use std::path::PathBuf;

use bindiv_core::serde::read_json_file;
use bindiv_exp::write_embedding_csv;
use bindiv_stat::{embed, DistanceMatrix, EmbeddingOpts, EmbeddingOutcome, MissingPolicy};
use clap::{Args, ValueEnum};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MissingArg {
    Refuse,
    Exclude,
    MaxDistance,
}

impl From<MissingArg> for MissingPolicy {
    fn from(value: MissingArg) -> Self {
        match value {
            MissingArg::Refuse => MissingPolicy::Refuse,
            MissingArg::Exclude => MissingPolicy::Exclude,
            MissingArg::MaxDistance => MissingPolicy::MaxDistance,
        }
    }
}

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Distance matrix JSON (as written to distance_matrix.json by `run`).
    #[arg(long)]
    pub matrix: PathBuf,
    /// Handling of missing cells.
    #[arg(long, value_enum, default_value_t = MissingArg::Exclude)]
    pub missing: MissingArg,
    /// Optional directory receiving embedding.csv.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &EmbedArgs) -> Result<(), Box<dyn Error>> {
    let matrix: DistanceMatrix = read_json_file(&args.matrix)?;
    let opts = EmbeddingOpts {
        missing: args.missing.into(),
        ..EmbeddingOpts::default()
    };
    let outcome = embed(&matrix, &opts);

    match &outcome {
        EmbeddingOutcome::Embedded(embedding) => {
            for point in &embedding.points {
                let coords: Vec<String> =
                    point.coords.iter().map(|value| format!("{value:.6}")).collect();
                println!("{}\t{}", point.label, coords.join("\t"));
            }
            println!(
                "stress {:.6} (normalized {:.6}) after {} iteration(s)",
                embedding.stress, embedding.normalized_stress, embedding.iterations
            );
        }
        EmbeddingOutcome::Refused { reason } => println!("cannot embed: {reason}"),
    }

    if let Some(out) = &args.out {
        fs::create_dir_all(out)?;
        let path = write_embedding_csv(&outcome, out)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
