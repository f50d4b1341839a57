//! File and process adapters for the collaborator traits.
//!
//! - [`TextFileSource`]: UTF-8 text documents (already OCR'd or exported)
//! - [`FileKnowledgeSource`]: reference notes read from disk
//! - [`CommandGenerator`]: a local model runner fed through stdin
//! - [`JsonFileSink`]: pretty-printed JSON records

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use labreport_contracts::{
    error::{LabReportError, LabReportResult},
    record::LabReport,
};
use labreport_core::traits::{Generator, KnowledgeSource, RecordSink, TextSource};

use crate::config::GeneratorConfig;

const STDERR_EXCERPT_CHARS: usize = 200;

// ── Text source ───────────────────────────────────────────────────────────────

/// Reads a document as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFileSource;

impl TextSource for TextFileSource {
    fn read_text(&self, document: &Path) -> LabReportResult<String> {
        let bytes = fs::read(document).map_err(|e| LabReportError::AcquisitionFailed {
            reason: format!("failed to read '{}': {}", document.display(), e),
        })?;
        String::from_utf8(bytes).map_err(|e| LabReportError::AcquisitionFailed {
            reason: format!("'{}' is not UTF-8 text: {}", document.display(), e),
        })
    }
}

// ── Knowledge source ──────────────────────────────────────────────────────────

/// Reference context read from a file on every call.
///
/// A missing path or unreadable file yields an empty context.
#[derive(Debug, Clone, Default)]
pub struct FileKnowledgeSource {
    path: Option<PathBuf>,
}

impl FileKnowledgeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// A source with no backing file.
    pub fn none() -> Self {
        Self::default()
    }
}

impl KnowledgeSource for FileKnowledgeSource {
    fn context(&self) -> String {
        let Some(path) = &self.path else {
            return String::new();
        };
        match fs::read_to_string(path) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "knowledge file unavailable, using empty context");
                String::new()
            }
        }
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// Runs an external program with the prompt on stdin and returns its stdout.
///
/// Spawn failure, a non-zero exit status, or exceeding `timeout_secs` is
/// reported as `GeneratorUnavailable`. The call is never retried.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    config: GeneratorConfig,
}

impl CommandGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    fn wait(&self, child: &mut Child, deadline: Option<Instant>) -> LabReportResult<ExitStatus> {
        let Some(deadline) = deadline else {
            return child.wait().map_err(|e| unavailable(format!("wait failed: {e}")));
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        match child
            .wait_timeout(remaining)
            .map_err(|e| unavailable(format!("wait failed: {e}")))?
        {
            Some(status) => Ok(status),
            None => {
                // Already-exited races are harmless here.
                let _ = child.kill();
                let _ = child.wait();
                Err(unavailable(format!(
                    "'{}' did not finish within {}s",
                    self.config.program,
                    self.config.timeout_secs.unwrap_or_default()
                )))
            }
        }
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, prompt: &str) -> LabReportResult<String> {
        let started = Instant::now();
        debug!(
            program = %self.config.program,
            args = ?self.config.args,
            prompt_chars = prompt.chars().count(),
            "starting generator process"
        );

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(format!("failed to start '{}': {}", self.config.program, e)))?;

        // Each pipe gets its own thread so a runner that writes before it has
        // read the whole prompt cannot block on a full pipe. Results come back
        // over channels so collecting them honours the same deadline as the
        // process itself; a grandchild holding stdout open cannot stall us.
        let mut stdin = child.stdin.take().ok_or_else(|| unavailable("stdin not captured".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| unavailable("stdout not captured".into()))?;
        let stderr = child.stderr.take().ok_or_else(|| unavailable("stderr not captured".into()))?;

        let prompt = prompt.to_string();
        let writer = pump(move || stdin.write_all(prompt.as_bytes()));
        let out_reader = pump(move || read_all(stdout));
        let err_reader = pump(move || read_all(stderr));

        let deadline = self.config.timeout_secs.map(|secs| started + Duration::from_secs(secs));
        let status = self.wait(&mut child, deadline)?;

        let out = match recv_by(&out_reader, deadline) {
            Ok(read) => read.map_err(|e| unavailable(format!("failed to read stdout: {e}")))?,
            Err(RecvTimeoutError::Timeout) => {
                warn!(program = %self.config.program, "generator output still open at deadline");
                return Err(unavailable(format!(
                    "'{}' exited but its output stayed open past {}s",
                    self.config.program,
                    self.config.timeout_secs.unwrap_or_default()
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(unavailable("stdout reader panicked".into()));
            }
        };
        let err = recv_by(&err_reader, deadline).ok().and_then(Result::ok).unwrap_or_default();
        if let Ok(Err(e)) = writer.try_recv() {
            debug!(error = %e, "generator closed stdin before the full prompt was written");
        }

        if !status.success() {
            let stderr_text = String::from_utf8_lossy(&err);
            let excerpt: String = stderr_text.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            warn!(program = %self.config.program, %status, stderr = %excerpt, "generator exited with failure");
            return Err(unavailable(format!(
                "'{}' exited with {}: {}",
                self.config.program, status, excerpt
            )));
        }

        let raw = String::from_utf8_lossy(&out).trim().to_string();
        info!(
            program = %self.config.program,
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_chars = raw.chars().count(),
            "generator finished"
        );
        Ok(raw)
    }
}

/// Run `job` on its own thread and hand its result back over a channel.
fn pump<T: Send + 'static>(job: impl FnOnce() -> T + Send + 'static) -> Receiver<T> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may be gone after a deadline; the result is dropped.
        let _ = tx.send(job());
    });
    rx
}

fn read_all(mut pipe: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).map(|_| buf)
}

/// Receive from `rx`, giving up at `deadline` when one is set.
fn recv_by<T>(rx: &Receiver<T>, deadline: Option<Instant>) -> Result<T, RecvTimeoutError> {
    match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

fn unavailable(reason: String) -> LabReportError {
    LabReportError::GeneratorUnavailable { reason }
}

// ── Record sink ───────────────────────────────────────────────────────────────

/// Writes each record as pretty JSON.
///
/// When `path` is an existing directory the record is written to
/// `<path>/<report_id>_report.json`; otherwise `path` is the file itself.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where `report` will be written.
    pub fn target(&self, report: &LabReport) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}_report.json", report.report_id.0))
        } else {
            self.path.clone()
        }
    }
}

impl RecordSink for JsonFileSink {
    fn write(&self, report: &LabReport) -> LabReportResult<()> {
        let target = self.target(report);
        let json = serde_json::to_string_pretty(report).map_err(|e| LabReportError::SinkFailed {
            reason: format!("failed to serialize report {}: {}", report.report_id.0, e),
        })?;
        fs::write(&target, json).map_err(|e| LabReportError::SinkFailed {
            reason: format!("failed to write '{}': {}", target.display(), e),
        })?;

        info!(report_id = %report.report_id.0, path = %target.display(), "report written");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use chrono::Utc;

    use labreport_contracts::{
        error::LabReportError,
        reasoning::RepairReport,
        record::{LabReport, ReportId},
    };
    use labreport_core::{
        gateway::all_normal_result,
        traits::{Generator, KnowledgeSource, RecordSink, TextSource},
    };

    use super::{CommandGenerator, FileKnowledgeSource, JsonFileSink, TextFileSource};
    use crate::config::GeneratorConfig;

    fn report() -> LabReport {
        LabReport {
            report_id: ReportId("abcd1234".to_string()),
            patient_name: "Jane Roe".to_string(),
            generated_at: Utc::now(),
            rows: vec![],
            severity_score: 0,
            reasoning: all_normal_result(),
            repairs: RepairReport::default(),
        }
    }

    fn command(program: &str, args: &[&str]) -> GeneratorConfig {
        GeneratorConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_secs: None,
        }
    }

    // ── Text source ──────────────────────────────────────────────────────────

    #[test]
    fn reads_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "Hemoglobin: 12.2 g/dL").unwrap();

        assert_eq!(TextFileSource.read_text(&path).unwrap(), "Hemoglobin: 12.2 g/dL");
    }

    #[test]
    fn missing_or_binary_document_is_acquisition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("scan.pdf");
        std::fs::write(&binary, [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        for path in [dir.path().join("absent.txt"), binary] {
            let err = TextFileSource.read_text(&path).unwrap_err();
            assert!(matches!(err, LabReportError::AcquisitionFailed { .. }), "{path:?}: {err}");
        }
    }

    // ── Knowledge source ─────────────────────────────────────────────────────

    #[test]
    fn knowledge_file_is_read_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.txt");
        std::fs::write(&path, "\nCRP rises in acute inflammation.\n").unwrap();

        assert_eq!(FileKnowledgeSource::new(&path).context(), "CRP rises in acute inflammation.");
    }

    #[test]
    fn absent_knowledge_is_empty() {
        assert_eq!(FileKnowledgeSource::none().context(), "");
        assert_eq!(FileKnowledgeSource::new("/nonexistent/kb.txt").context(), "");
    }

    // ── Generator ────────────────────────────────────────────────────────────

    #[cfg(unix)]
    #[test]
    fn command_receives_prompt_on_stdin() {
        let generator = CommandGenerator::new(command("cat", &[]));
        let out = generator.generate("{\"risk_score\": 10}\n").unwrap();

        assert_eq!(out, "{\"risk_score\": 10}");
    }

    #[test]
    fn missing_program_is_unavailable() {
        let generator = CommandGenerator::new(command("labreport-no-such-runner", &[]));
        let err = generator.generate("prompt").unwrap_err();

        assert!(matches!(err, LabReportError::GeneratorUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_unavailable_with_stderr() {
        let generator =
            CommandGenerator::new(command("sh", &["-c", "echo model not found >&2; exit 3"]));
        let err = generator.generate("prompt").unwrap_err();

        assert!(matches!(err, LabReportError::GeneratorUnavailable { .. }));
        assert!(err.to_string().contains("model not found"), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn timeout_is_unavailable() {
        let mut config = command("sleep", &["5"]);
        config.timeout_secs = Some(1);

        let err = CommandGenerator::new(config).generate("prompt").unwrap_err();

        assert!(err.to_string().contains("did not finish within 1s"), "got: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn output_held_open_by_grandchild_is_bounded_by_timeout() {
        let mut config = command("sh", &["-c", "sleep 5 & echo partial"]);
        config.timeout_secs = Some(1);

        let started = Instant::now();
        let err = CommandGenerator::new(config).generate("prompt").unwrap_err();

        assert!(matches!(err, LabReportError::GeneratorUnavailable { .. }));
        assert!(err.to_string().contains("output stayed open"), "got: {err}");
        assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn fast_command_within_timeout_succeeds() {
        let mut config = command("cat", &[]);
        config.timeout_secs = Some(5);

        let out = CommandGenerator::new(config).generate("{}").unwrap();
        assert_eq!(out, "{}");
    }

    // ── Record sink ──────────────────────────────────────────────────────────

    #[test]
    fn sink_writes_pretty_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        JsonFileSink::new(&path).write(&report()).unwrap();

        let written: LabReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.report_id.0, "abcd1234");
        assert_eq!(written.reasoning.risk_score, 0.0);
    }

    #[test]
    fn sink_into_directory_names_file_by_report_id() {
        let dir = tempfile::tempdir().unwrap();

        let sink = JsonFileSink::new(dir.path());
        sink.write(&report()).unwrap();

        assert!(dir.path().join("abcd1234_report.json").is_file());
    }

    #[test]
    fn unwritable_target_is_sink_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("missing").join("out.json"));

        let err = sink.write(&report()).unwrap_err();
        assert!(matches!(err, LabReportError::SinkFailed { .. }));
    }
}
