use std::path::Path;
use std::time::Duration;

use bindiv_core::errors::{BindivError, ErrorInfo};
use serde::{Deserialize, Serialize};

pub const PRIMARY_PLACEHOLDER: &str = "{primary}";
pub const SECONDARY_PLACEHOLDER: &str = "{secondary}";
pub const OUTPUT_DIR_PLACEHOLDER: &str = "{output_dir}";

/// Command line contract of the external diffing tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(default = "ToolSpec::default_program")]
    pub program: String,
    #[serde(default = "ToolSpec::default_args")]
    pub args: Vec<String>,
    /// Extension of the structured result file the tool writes.
    #[serde(default = "ToolSpec::default_result_extension")]
    pub result_extension: String,
    #[serde(default = "ToolSpec::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ToolSpec {
    fn default_program() -> String {
        "bindiff".to_string()
    }

    fn default_args() -> Vec<String> {
        vec![
            "--primary".to_string(),
            PRIMARY_PLACEHOLDER.to_string(),
            "--secondary".to_string(),
            SECONDARY_PLACEHOLDER.to_string(),
            "--output_dir".to_string(),
            OUTPUT_DIR_PLACEHOLDER.to_string(),
        ]
    }

    fn default_result_extension() -> String {
        "BinDiff".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        600
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), BindivError> {
        if self.program.trim().is_empty() {
            return Err(BindivError::Config(ErrorInfo::new(
                "bindiv_diff.tool_program",
                "tool specification missing program",
            )));
        }
        if self.timeout_secs == 0 {
            return Err(BindivError::Config(
                ErrorInfo::new("bindiv_diff.tool_timeout", "tool timeout must be positive")
                    .with_hint("set tool.timeout_secs to the longest acceptable diff duration"),
            ));
        }
        if self.result_extension.trim().is_empty() || self.result_extension.contains('/') {
            return Err(BindivError::Config(
                ErrorInfo::new(
                    "bindiv_diff.tool_extension",
                    "result extension must be a bare file extension",
                )
                .with_context("extension", self.result_extension.clone()),
            ));
        }
        for placeholder in [
            PRIMARY_PLACEHOLDER,
            SECONDARY_PLACEHOLDER,
            OUTPUT_DIR_PLACEHOLDER,
        ] {
            if !self.args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(BindivError::Config(
                    ErrorInfo::new(
                        "bindiv_diff.tool_placeholder",
                        "tool arguments missing a required placeholder",
                    )
                    .with_context("placeholder", placeholder),
                ));
            }
        }
        Ok(())
    }

    /// Substitutes the placeholders; arguments are passed verbatim, never through a shell.
    pub fn render_args(&self, primary: &Path, secondary: &Path, output_dir: &Path) -> Vec<String> {
        let primary = primary.display().to_string();
        let secondary = secondary.display().to_string();
        let output_dir = output_dir.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(PRIMARY_PLACEHOLDER, &primary)
                    .replace(SECONDARY_PLACEHOLDER, &secondary)
                    .replace(OUTPUT_DIR_PLACEHOLDER, &output_dir)
            })
            .collect()
    }
}

impl Default for ToolSpec {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            args: Self::default_args(),
            result_extension: Self::default_result_extension(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_is_valid() {
        ToolSpec::default().validate().expect("default valid");
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let spec = ToolSpec::default();
        let args = spec.render_args(
            Path::new("/a/ls.BinExport"),
            Path::new("/b/ls.BinExport"),
            Path::new("/out/work/x"),
        );
        assert_eq!(
            args,
            vec![
                "--primary",
                "/a/ls.BinExport",
                "--secondary",
                "/b/ls.BinExport",
                "--output_dir",
                "/out/work/x"
            ]
        );
    }

    #[test]
    fn missing_placeholder_is_rejected() {
        let spec = ToolSpec {
            args: vec!["{primary}".into(), "{secondary}".into()],
            ..ToolSpec::default()
        };
        let err = spec.validate().expect_err("missing output dir");
        assert_eq!(err.info().code, "bindiv_diff.tool_placeholder");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let spec = ToolSpec {
            timeout_secs: 0,
            ..ToolSpec::default()
        };
        assert!(spec.validate().is_err());
    }
}
