//! Subprocess transport: one interpreter process per question.

use super::{AnswerBackend, BackendError, BackendRequest};
use crate::rag::protocol::{self, ParsedOutcome};
use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};

/// Marker printed by the default probe command.
pub const PROBE_MARKER: &str = "RAG_PROBE_OK";

/// Bridge executed by the interpreter: reads the JSON request from stdin, runs the engine and
/// prints the marker-delimited payload.
const PYTHON_BRIDGE: &str = r#"
import json, sys
try:
    request = json.load(sys.stdin)
    sys.path.insert(0, '.')
    from rag_engine import OptimizedEnhancedRAG
    rag = OptimizedEnhancedRAG()
    rag.setup()
    result = rag.optimized_query(request['question'], top_k=int(request['maxSources']))
    sources = [
        {
            'content': chunk.get('content', ''),
            'page': chunk.get('metadata', {}).get('page', 0),
            'score': float(chunk.get('final_score', chunk.get('score', 0))),
            'category': chunk.get('category'),
        }
        for chunk in result.get('relevant_chunks', [])
    ]
    payload = {
        'success': True,
        'answer': result.get('answer', ''),
        'sources': sources,
        'category': result.get('category_hint', 'general'),
        'methods': result.get('methods', []),
        'queryTime': result.get('query_time', 0),
        'chunksProcessed': len(rag.chunks),
    }
    print('RESULT_START')
    print(json.dumps(payload))
    print('RESULT_END')
except Exception as exc:
    print('ERROR_START')
    print(json.dumps({'success': False, 'error': str(exc), 'type': type(exc).__name__}))
    print('ERROR_END')
"#;

const STDERR_LOG_LIMIT: usize = 2_000;

/// How to launch the answering engine and how to probe its runtime.
#[derive(Debug, Clone)]
pub struct BackendCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    probe_args: Vec<String>,
    probe_marker: String,
    probe_timeout: Duration,
}

impl BackendCommand {
    /// Launch `program` with no arguments; the probe runs the program bare.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            probe_args: Vec::new(),
            probe_marker: PROBE_MARKER.to_string(),
            probe_timeout: Duration::from_secs(10),
        }
    }

    /// Run the bundled bridge under a Python interpreter inside `engine_dir`.
    pub fn python_engine(runtime: impl Into<String>, engine_dir: impl Into<PathBuf>) -> Self {
        Self::new(runtime)
            .with_args(["-c", PYTHON_BRIDGE])
            .with_working_dir(engine_dir)
            .with_probe(["-c", "print('RAG_PROBE_OK')"], PROBE_MARKER)
    }

    /// Replace the query arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run the process inside `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Replace the probe arguments and the marker its stdout must contain.
    pub fn with_probe<I, S>(mut self, args: I, marker: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probe_args = args.into_iter().map(Into::into).collect();
        self.probe_marker = marker.into();
        self
    }

    /// Bound the probe's runtime.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Answer backend that spawns the external engine for every question.
///
/// No process is reused between questions and nothing here limits how many run at once;
/// the orchestrator owns admission control.
pub struct ExternalProcessBackend {
    command: BackendCommand,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    question: &'a str,
    max_sources: usize,
    temperature: f32,
}

struct CapturedOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ExternalProcessBackend {
    /// Build a backend around the given launch description.
    pub fn new(command: BackendCommand) -> Self {
        Self { command }
    }

    async fn run(&self, request: &BackendRequest) -> Result<CapturedOutput, BackendError> {
        let payload = encode_request(request)?;
        let mut command = self.command.command(&self.command.args);
        command.stdin(Stdio::piped());

        let mut child = command.spawn().map_err(|err| {
            BackendError::Unavailable(format!("failed to spawn {}: {err}", self.command.program))
        })?;
        tracing::debug!(
            program = %self.command.program,
            pid = child.id(),
            "Spawned answering engine"
        );

        match tokio::time::timeout_at(request.deadline, collect_output(&mut child, payload)).await
        {
            Ok(result) => result.map_err(|err| {
                BackendError::Unavailable(format!("failed to read engine output: {err}"))
            }),
            Err(_) => {
                terminate(&mut child).await;
                Err(BackendError::Timeout)
            }
        }
    }
}

#[async_trait]
impl AnswerBackend for ExternalProcessBackend {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn probe(&self) -> Result<(), BackendError> {
        let mut command = self.command.command(&self.command.probe_args);
        command.stdin(Stdio::null());

        let output = tokio::time::timeout(self.command.probe_timeout, command.output())
            .await
            .map_err(|_| BackendError::Unavailable("runtime probe timed out".into()))?
            .map_err(|err| {
                BackendError::Unavailable(format!(
                    "failed to run {}: {err}",
                    self.command.program
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains(&self.command.probe_marker) {
            Ok(())
        } else {
            Err(BackendError::Unavailable(format!(
                "probe output did not contain {} (exit status {})",
                self.command.probe_marker, output.status
            )))
        }
    }

    async fn answer(&self, request: BackendRequest) -> Result<ParsedOutcome, BackendError> {
        let captured = self.run(&request).await?;
        let stdout = String::from_utf8_lossy(&captured.stdout);
        let stderr = String::from_utf8_lossy(&captured.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = %tail(&stderr, STDERR_LOG_LIMIT), "Engine diagnostics");
        }

        let outcome = protocol::parse(&stdout).map_err(|err| BackendError::Protocol(err.to_string()))?;
        if outcome == ParsedOutcome::NotFound {
            tracing::warn!(
                status = %captured.status,
                stdout_bytes = captured.stdout.len(),
                stderr = %tail(&stderr, STDERR_LOG_LIMIT),
                "Engine output contained no marker region"
            );
        }
        Ok(outcome)
    }
}

fn encode_request(request: &BackendRequest) -> Result<Vec<u8>, BackendError> {
    let wire = WireRequest {
        question: &request.question,
        max_sources: request.max_sources,
        temperature: request.temperature,
    };
    let mut payload = serde_json::to_vec(&wire)
        .map_err(|err| BackendError::Unavailable(format!("failed to encode request: {err}")))?;
    payload.push(b'\n');
    Ok(payload)
}

async fn collect_output(child: &mut Child, payload: Vec<u8>) -> io::Result<CapturedOutput> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (_, stdout, stderr) = tokio::join!(
        write_request(stdin, payload),
        read_pipe(stdout),
        read_pipe(stderr)
    );
    let status = child.wait().await?;

    Ok(CapturedOutput {
        status,
        stdout: stdout?,
        stderr: stderr?,
    })
}

async fn write_request(stdin: Option<ChildStdin>, payload: Vec<u8>) {
    let Some(mut stdin) = stdin else {
        return;
    };
    // The engine may exit without reading its input; a broken pipe is not a failure here.
    if let Err(err) = stdin.write_all(&payload).await {
        tracing::debug!(error = %err, "Engine closed stdin early");
        return;
    }
    if let Err(err) = stdin.shutdown().await {
        tracing::debug!(error = %err, "Failed to close engine stdin");
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

/// Kill the child and reap it so no zombie is left behind.
async fn terminate(child: &mut Child) {
    let pid = child.id();
    match child.kill().await {
        Ok(()) => tracing::warn!(pid, "Terminated answering engine after deadline"),
        Err(err) => tracing::warn!(pid, error = %err, "Failed to terminate answering engine"),
    }
}

fn tail(text: &str, limit: usize) -> &str {
    let trimmed = text.trim_end();
    if limit == 0 {
        return "";
    }
    match trimmed.char_indices().rev().nth(limit - 1) {
        Some((cut, _)) => &trimmed[cut..],
        None => trimmed,
    }
}
