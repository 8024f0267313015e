use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bindiv_core::errors::{BindivError, ErrorInfo};
use bindiv_core::{ComparisonPair, DiffResult, Differ};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::tool::ToolSpec;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STDERR_MARKER: &str = "\n--- stderr ---\n";
const SUCCESS_MARKER: &str = "success";

fn io_error(code: &str, path: &Path, err: impl ToString) -> BindivError {
    BindivError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Files owned by a single comparison pair below the study output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairLayout {
    /// Private directory handed to the tool as its output directory.
    pub work_dir: PathBuf,
    /// Final location of the structured result.
    pub result_path: PathBuf,
    /// Final location of the captured log.
    pub log_path: PathBuf,
    /// Written only after a clean, complete invocation; gates `resume`.
    pub status_path: PathBuf,
}

impl PairLayout {
    pub fn new(pair: &ComparisonPair, output_dir: &Path, result_extension: &str) -> Self {
        let id = pair.id();
        Self {
            work_dir: output_dir.join("work").join(&id),
            result_path: output_dir.join(format!("{id}.{result_extension}")),
            log_path: output_dir.join("logs").join(format!("{id}.log")),
            status_path: output_dir.join("logs").join(format!("{id}.status")),
        }
    }
}

/// [`Differ`] running the external tool as a blocking child process.
///
/// Every pair runs in its own work directory, so the tool's own output naming
/// (which only encodes artifact names) can never overwrite another pair's
/// result. The produced file is then moved to a name that encodes both group
/// labels.
#[derive(Debug, Clone)]
pub struct ProcessDiffer {
    tool: ToolSpec,
    require_result: bool,
    resume: bool,
}

impl ProcessDiffer {
    pub fn new(tool: ToolSpec) -> Self {
        Self {
            tool,
            require_result: true,
            resume: false,
        }
    }

    /// When false a clean exit without a structured file still counts as success
    /// (log-text extraction only needs the captured output).
    pub fn require_result(mut self, required: bool) -> Self {
        self.require_result = required;
        self
    }

    /// Re-use outputs of pairs that previously succeeded instead of invoking the
    /// tool again. Failed, timed-out and interrupted pairs are always re-run.
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn tool(&self) -> &ToolSpec {
        &self.tool
    }

    fn resume_existing(&self, layout: &PairLayout) -> Option<DiffResult> {
        let marker = fs::read_to_string(&layout.status_path).ok()?;
        if marker.trim() != SUCCESS_MARKER || !layout.log_path.is_file() {
            return None;
        }
        let has_result = layout.result_path.is_file();
        if self.require_result && !has_result {
            return None;
        }
        let text = fs::read_to_string(&layout.log_path).ok()?;
        let (stdout, stderr) = match text.split_once(STDERR_MARKER) {
            Some((stdout, stderr)) => (stdout.to_string(), stderr.to_string()),
            None => (text, String::new()),
        };
        let result_path = has_result.then(|| layout.result_path.clone());
        Some(
            DiffResult::success(stdout, result_path)
                .with_stderr(stderr)
                .with_log_path(&layout.log_path),
        )
    }

    fn invoke(
        &self,
        pair: &ComparisonPair,
        layout: &PairLayout,
    ) -> Result<DiffResult, BindivError> {
        prepare_layout(layout)?;
        let args = self
            .tool
            .render_args(&pair.primary.path, &pair.secondary.path, &layout.work_dir);
        debug!(program = %self.tool.program, ?args, %pair, "invoking diff tool");

        let child = Command::new(&self.tool.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(err) => {
                remove_work_dir(&layout.work_dir);
                let detail = format!("failed to start {}: {err}", self.tool.program);
                write_log(&layout.log_path, "", &detail)?;
                return Ok(DiffResult::tool_error(detail.clone())
                    .with_stderr(detail)
                    .with_log_path(&layout.log_path));
            }
        };
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());
        let waited = wait_with_timeout(&mut child, self.tool.timeout());
        // grandchildren may still hold the pipes after a kill; detach the readers then
        let (stdout, stderr) = if waited.is_ok() {
            (join_reader(stdout_reader), join_reader(stderr_reader))
        } else {
            (String::new(), String::new())
        };
        write_log(&layout.log_path, &stdout, &stderr)?;

        let failure = match waited {
            Ok(status) if status.success() => None,
            Ok(status) => Some(format!("tool exited with {status}")),
            Err(detail) => Some(detail),
        };
        if let Some(detail) = failure {
            remove_work_dir(&layout.work_dir);
            return Ok(DiffResult::tool_error(detail)
                .with_log(stdout)
                .with_stderr(stderr)
                .with_log_path(&layout.log_path));
        }

        let produced = find_result(&layout.work_dir, &self.tool.result_extension);
        let result_path = match produced {
            Some(path) => {
                move_into_place(&path, &layout.result_path)?;
                Some(layout.result_path.clone())
            }
            None => None,
        };
        remove_work_dir(&layout.work_dir);

        if result_path.is_none() && self.require_result {
            return Ok(DiffResult::no_result(format!(
                "tool produced no .{} result",
                self.tool.result_extension
            ))
            .with_log(stdout)
            .with_stderr(stderr)
            .with_log_path(&layout.log_path));
        }
        fs::write(&layout.status_path, SUCCESS_MARKER)
            .map_err(|err| io_error("bindiv_diff.status_write", &layout.status_path, err))?;
        Ok(DiffResult::success(stdout, result_path)
            .with_stderr(stderr)
            .with_log_path(&layout.log_path))
    }
}

impl Differ for ProcessDiffer {
    fn diff(&self, pair: &ComparisonPair, output_dir: &Path) -> DiffResult {
        let layout = PairLayout::new(pair, output_dir, &self.tool.result_extension);
        if self.resume {
            if let Some(existing) = self.resume_existing(&layout) {
                debug!(%pair, log = %layout.log_path.display(), "re-using existing diff outputs");
                return existing;
            }
        }
        match self.invoke(pair, &layout) {
            Ok(result) => result,
            Err(err) => {
                warn!(%pair, error = %err, "diff invocation failed");
                DiffResult::tool_error(err.to_string())
            }
        }
    }
}

fn prepare_layout(layout: &PairLayout) -> Result<(), BindivError> {
    if let Some(parent) = layout.log_path.parent() {
        fs::create_dir_all(parent).map_err(|err| io_error("bindiv_diff.log_dir", parent, err))?;
    }
    if layout.status_path.exists() {
        fs::remove_file(&layout.status_path)
            .map_err(|err| io_error("bindiv_diff.stale_status", &layout.status_path, err))?;
    }
    if layout.work_dir.exists() {
        fs::remove_dir_all(&layout.work_dir)
            .map_err(|err| io_error("bindiv_diff.work_dir", &layout.work_dir, err))?;
    }
    fs::create_dir_all(&layout.work_dir)
        .map_err(|err| io_error("bindiv_diff.work_dir", &layout.work_dir, err))?;
    if layout.result_path.exists() {
        fs::remove_file(&layout.result_path)
            .map_err(|err| io_error("bindiv_diff.stale_result", &layout.result_path, err))?;
    }
    Ok(())
}

fn spawn_reader<R>(stream: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    stream.map(|mut stream| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = stream.read_to_end(&mut bytes);
            bytes
        })
    })
}

fn join_reader(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, String> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(err) => {
                terminate(child);
                return Err(format!("waiting for tool failed: {err}"));
            }
        }
        if started.elapsed() >= timeout {
            terminate(child);
            return Err(format!("tool timed out after {}s", timeout.as_secs()));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn write_log(path: &Path, stdout: &str, stderr: &str) -> Result<(), BindivError> {
    let mut text = stdout.to_string();
    if !stderr.is_empty() {
        text.push_str(STDERR_MARKER);
        text.push_str(stderr);
    }
    fs::write(path, text).map_err(|err| io_error("bindiv_diff.log_write", path, err))
}

fn find_result(work_dir: &Path, extension: &str) -> Option<PathBuf> {
    WalkDir::new(work_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some(extension))
}

fn move_into_place(from: &Path, to: &Path) -> Result<(), BindivError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|err| io_error("bindiv_diff.result_move", to, err))?;
    let _ = fs::remove_file(from);
    Ok(())
}

fn remove_work_dir(work_dir: &Path) {
    let _ = fs::remove_dir_all(work_dir);
}
