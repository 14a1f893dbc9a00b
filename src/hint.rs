/// Hint service: asks an external text-generation model for a nudge.
///
/// The service is a pluggable `HintSource`. Whatever the source does, the
/// player only ever sees text: `request_hint` turns every failure into a
/// fixed encouragement string. Requests run on a worker thread owned by a
/// `HintDesk` so the game loop keeps animating while the model thinks.

use std::fmt;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::{GameConfig, HintConfig};

/// Shown when the service answered with nothing.
pub const FALLBACK_EMPTY: &str = "Keep going! You can definitely crack this code.";
/// Shown when the service could not be reached or failed.
pub const FALLBACK_ERROR: &str = "Keep trying! Think carefully about your next step.";

#[derive(Clone, Debug, PartialEq)]
pub struct HintRequest {
    pub level_name: String,
    pub story: String,
    /// Program tokens (`MOVE_UP`, `REPEAT_2`, ...), in order.
    pub program: Vec<String>,
}

#[derive(Debug)]
pub enum HintError {
    NotConfigured,
    Transport(String),
    Status(u16),
    Malformed(String),
}

impl fmt::Display for HintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HintError::NotConfigured => write!(f, "hint service has no API key"),
            HintError::Transport(e) => write!(f, "hint service unreachable: {}", e),
            HintError::Status(code) => write!(f, "hint service returned HTTP {}", code),
            HintError::Malformed(e) => write!(f, "hint service reply malformed: {}", e),
        }
    }
}

impl std::error::Error for HintError {}

pub trait HintSource: Send + Sync {
    fn fetch(&self, req: &HintRequest) -> Result<String, HintError>;
}

/// What the player sees, plus the swallowed error for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct HintReply {
    pub text: String,
    pub error: Option<String>,
}

/// Ask `source`, never failing.
pub fn request_hint(source: &dyn HintSource, req: &HintRequest) -> HintReply {
    match source.fetch(req) {
        Ok(text) if !text.trim().is_empty() => HintReply {
            text: text.trim().to_string(),
            error: None,
        },
        Ok(_) => HintReply { text: FALLBACK_EMPTY.to_string(), error: None },
        Err(e) => HintReply {
            text: FALLBACK_ERROR.to_string(),
            error: Some(e.to_string()),
        },
    }
}

pub fn build_prompt(req: &HintRequest) -> String {
    let code = if req.program.is_empty() {
        "Empty".to_string()
    } else {
        req.program.join(", ")
    };
    format!(
        "A primary-school child is playing a Ramadan-themed coding game.\n\
         Level: {}\n\
         Story: {}\n\
         Current code: {}\n\n\
         Give 1 encouraging sentence and 1 short critical-thinking hint, in child-friendly English.\n\
         Do not give the answer directly, only a hint.",
        req.level_name, req.story, code
    )
}

// ══════════════════════════════════════════════════════════════
// Sources
// ══════════════════════════════════════════════════════════════

/// Used when no API key is configured; every request falls back.
pub struct OfflineHints;

impl HintSource for OfflineHints {
    fn fetch(&self, _req: &HintRequest) -> Result<String, HintError> {
        Err(HintError::NotConfigured)
    }
}

/// `generateContent` client over blocking HTTP.
pub struct GenerativeHints {
    agent: ureq::Agent,
    url: String,
    api_key: String,
    max_output_tokens: u32,
    temperature: f64,
}

impl GenerativeHints {
    pub fn new(cfg: &HintConfig, api_key: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build();
        GenerativeHints {
            agent,
            url: format!("{}/{}:generateContent", cfg.endpoint.trim_end_matches('/'), cfg.model),
            api_key,
            max_output_tokens: cfg.max_output_tokens,
            temperature: cfg.temperature,
        }
    }
}

impl HintSource for GenerativeHints {
    fn fetch(&self, req: &HintRequest) -> Result<String, HintError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": build_prompt(req) }] }],
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
                "temperature": self.temperature,
            },
        });
        let response = self.agent
            .post(&self.url)
            .query("key", &self.api_key)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => HintError::Status(code),
                other => HintError::Transport(other.to_string()),
            })?;
        let text = response
            .into_string()
            .map_err(|e| HintError::Transport(e.to_string()))?;
        parse_reply(&text)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Concatenated text of the first candidate; empty if there is none.
pub fn parse_reply(body: &str) -> Result<String, HintError> {
    let reply: GenerateResponse =
        serde_json::from_str(body).map_err(|e| HintError::Malformed(e.to_string()))?;
    Ok(reply.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
        .unwrap_or_default())
}

/// Pick the source for this run: networked if a key is available.
pub fn source_from_config(config: &GameConfig) -> Arc<dyn HintSource> {
    match config.hint_api_key() {
        Some(key) => Arc::new(GenerativeHints::new(&config.hint, key)),
        None => Arc::new(OfflineHints),
    }
}

// ══════════════════════════════════════════════════════════════
// HintDesk: one outstanding request at a time
// ══════════════════════════════════════════════════════════════

pub struct HintDesk {
    source: Arc<dyn HintSource>,
    pending: Option<Receiver<HintReply>>,
}

impl HintDesk {
    pub fn new(source: Arc<dyn HintSource>) -> Self {
        HintDesk { source, pending: None }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a request on a worker thread. Refused while one is loading.
    pub fn submit(&mut self, req: HintRequest) -> bool {
        if self.is_loading() {
            return false;
        }
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        std::thread::spawn(move || {
            let reply = request_hint(source.as_ref(), &req);
            // Receiver gone = request abandoned; nothing to do.
            let _ = tx.send(reply);
        });
        self.pending = Some(rx);
        true
    }

    /// Take the reply if it has arrived.
    pub fn poll(&mut self) -> Option<HintReply> {
        let rx = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(reply) => {
                self.pending = None;
                Some(reply)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                Some(HintReply {
                    text: FALLBACK_ERROR.to_string(),
                    error: Some("hint worker stopped without replying".to_string()),
                })
            }
        }
    }

    /// Forget the outstanding request; a late reply is discarded.
    pub fn abandon(&mut self) {
        self.pending = None;
    }
}
