use crate::error::{ConfigError, ResponseError};
use crate::logging::append_league_log;
use serde_json::Value;
use std::{
  path::PathBuf,
  sync::mpsc::{self, Receiver, Sender},
  thread::JoinHandle,
  time::Duration,
};
use tracing::{debug, warn};

pub type JobId = u64;

/// What a league request was for. Completions are routed by this tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobKind {
  ReportMatch,
  TeamNameQuery { identities: Vec<String> },
}

impl JobKind {
  pub fn label(&self) -> &'static str {
    match self {
      JobKind::ReportMatch => "reportMatch",
      JobKind::TeamNameQuery { .. } => "teamNameQuery",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeagueJob {
  pub id: JobId,
  pub kind: JobKind,
  /// Form-encoded POST body.
  pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
  Done(String),
  Timeout,
  Error { code: i32, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobCompletion {
  pub id: JobId,
  pub kind: JobKind,
  pub outcome: JobOutcome,
}

/// Fire-and-forget delivery of league requests. The transport numbers each
/// job; completions come back later through `poll_completions`, never from
/// `dispatch` itself.
pub trait JobTransport {
  fn dispatch(&mut self, kind: JobKind, body: String) -> JobId;

  fn poll_completions(&mut self) -> Vec<JobCompletion> {
    Vec::new()
  }
}

// ── Responses ──────────────────────────────────────────────────────────

/// A usable league answer body.
#[derive(Clone, Debug, PartialEq)]
pub enum LeagueResponse {
  Text(String),
  Structured(Value),
}

pub fn is_markup(body: &str) -> bool {
  let lower = body.to_ascii_lowercase();
  lower.contains("<html") || lower.contains("<!doctype")
}

/// Sorts a response body into plain text or JSON. Empty bodies and HTML
/// pages are errors; anything opening with `{` or `[` must parse as JSON.
pub fn classify_response(body: &str) -> Result<LeagueResponse, ResponseError> {
  let trimmed = body.trim();
  if trimmed.is_empty() {
    return Err(ResponseError::Empty);
  }
  if is_markup(trimmed) {
    return Err(ResponseError::Markup);
  }
  if trimmed.starts_with('{') || trimmed.starts_with('[') {
    return Ok(LeagueResponse::Structured(serde_json::from_str(trimmed)?));
  }
  Ok(LeagueResponse::Text(trimmed.to_string()))
}

pub fn value_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(raw) => Some(raw.clone()),
    Value::Number(num) => Some(num.to_string()),
    _ => None,
  }
}

// ── HTTP transport ─────────────────────────────────────────────────────

pub struct HttpTransport {
  jobs: Option<Sender<LeagueJob>>,
  completions: Receiver<JobCompletion>,
  worker: Option<JoinHandle<()>>,
  next_id: JobId,
}

impl HttpTransport {
  pub fn spawn(url: &str, timeout: Duration, log_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
    let client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("league-overseer/", env!("CARGO_PKG_VERSION")))
      .build()?;
    let (job_tx, job_rx) = mpsc::channel::<LeagueJob>();
    let (done_tx, done_rx) = mpsc::channel::<JobCompletion>();
    let url = url.to_string();
    let worker = std::thread::Builder::new()
      .name("league-http".to_string())
      .spawn(move || run_worker(client, url, log_dir, job_rx, done_tx))
      .map_err(ConfigError::Worker)?;
    Ok(HttpTransport {
      jobs: Some(job_tx),
      completions: done_rx,
      worker: Some(worker),
      next_id: 1,
    })
  }
}

impl JobTransport for HttpTransport {
  fn dispatch(&mut self, kind: JobKind, body: String) -> JobId {
    let id = self.next_id;
    self.next_id += 1;
    let Some(sender) = self.jobs.as_ref() else {
      warn!(job = id, "league transport is shut down, dropping job");
      return id;
    };
    if sender.send(LeagueJob { id, kind, body }).is_err() {
      warn!(job = id, "league worker is gone, dropping job");
    }
    id
  }

  fn poll_completions(&mut self) -> Vec<JobCompletion> {
    self.completions.try_iter().collect()
  }
}

impl Drop for HttpTransport {
  fn drop(&mut self) {
    // Closing the channel lets the worker finish queued jobs and exit.
    self.jobs.take();
    if let Some(worker) = self.worker.take() {
      let _ = worker.join();
    }
  }
}

fn run_worker(
  client: reqwest::blocking::Client,
  url: String,
  log_dir: Option<PathBuf>,
  jobs: Receiver<LeagueJob>,
  completions: Sender<JobCompletion>,
) {
  for job in jobs {
    append_league_log(
      log_dir.as_deref(),
      "League request",
      &format!("url: {url}\nkind: {}\nbody: {}", job.kind.label(), job.body),
    );
    let outcome = post_form(&client, &url, &job.body);
    let summary = match &outcome {
      JobOutcome::Done(body) => format!("done\nbody:\n{body}"),
      JobOutcome::Timeout => "timed out".to_string(),
      JobOutcome::Error { code, message } => format!("error {code}: {message}"),
    };
    append_league_log(log_dir.as_deref(), "League response", &summary);
    debug!(job = job.id, kind = job.kind.label(), "league job finished");
    let completion = JobCompletion {
      id: job.id,
      kind: job.kind,
      outcome,
    };
    if completions.send(completion).is_err() {
      break;
    }
  }
}

fn post_form(client: &reqwest::blocking::Client, url: &str, body: &str) -> JobOutcome {
  let resp = match client
    .post(url)
    .header("Content-Type", "application/x-www-form-urlencoded")
    .body(body.to_string())
    .send()
  {
    Ok(resp) => resp,
    Err(e) if e.is_timeout() => return JobOutcome::Timeout,
    Err(e) => {
      return JobOutcome::Error {
        code: e.status().map(|s| i32::from(s.as_u16())).unwrap_or(-1),
        message: e.to_string(),
      }
    }
  };
  let status = resp.status();
  let text = match resp.text() {
    Ok(text) => text,
    Err(e) if e.is_timeout() => return JobOutcome::Timeout,
    Err(e) => {
      return JobOutcome::Error {
        code: i32::from(status.as_u16()),
        message: format!("read failed: {e}"),
      }
    }
  };
  if !status.is_success() {
    return JobOutcome::Error {
      code: i32::from(status.as_u16()),
      message: text,
    };
  }
  JobOutcome::Done(text)
}
