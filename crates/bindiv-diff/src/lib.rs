//! Invocation of the external binary diffing tool and extraction of its results.

mod extract;
mod process;
mod tool;

pub use extract::{
    extract_function_scores, extract_log_similarity, extract_similarities, Extracted, Extraction,
};
pub use process::{PairLayout, ProcessDiffer};
pub use tool::{ToolSpec, OUTPUT_DIR_PLACEHOLDER, PRIMARY_PLACEHOLDER, SECONDARY_PLACEHOLDER};
