//! Reflection generation.
//!
//! The generator is an opaque external capability: given the day's task and
//! the normalized entry, it returns a short empathetic note plus one
//! concrete next action. It may fail or time out; callers always recover
//! with [`fallback_reflection`] because a degraded reflection is preferable
//! to a failed check-in.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::model::Reflection;
use crate::report::ReportDigest;
use crate::tasks::DailyTask;

/// Maximum chars kept from a generated note.
pub const NOTE_LIMIT: usize = 300;
/// Maximum chars kept from a generated next action.
pub const NEXT_LIMIT: usize = 40;

const SYSTEM_PROMPT: &str = "You are a reflection assistant. Output JSON only, no markdown, no \
     explanation. The output must contain exactly the fields `note` and \
     `next`. Ground both in the day's task and the user's entry; never \
     restate the entry verbatim. `note`: a warm, specific response in 2-4 \
     sentences. `next`: one action startable within 10 minutes, tied to the \
     task and the entry. No medical or psychological diagnosis, no \
     medication advice.";

/// Fixed neutral reflection used whenever generation is degraded.
pub fn fallback_reflection() -> Reflection {
    Reflection {
        note: "Thank you for writing today's entry down. Even a few words are a way of \
               looking after yourself and marking that today happened. Stopping to record \
               it gives the day a shape. This step does not need to be perfect; it already \
               counts."
            .to_string(),
        next: "Write one kind sentence to yourself.".to_string(),
    }
}

/// A generator for reflections and report summaries.
///
/// Implementations are expected to bound their own IO; callers additionally
/// wrap every invocation in a timeout and fall back on any failure.
#[allow(async_fn_in_trait)]
pub trait ReflectionGenerator {
    /// Generate a reflection for one day's entry.
    async fn reflect(&self, task: &DailyTask, normalized_text: &str) -> Result<Reflection>;

    /// Generate a report summary from derived counts only.
    ///
    /// The digest carries no raw participant text, so generated summaries
    /// cannot echo it. Default implementation reports the capability as
    /// unavailable, which keeps rule-based templates in charge.
    async fn summarize(&self, _digest: &ReportDigest) -> Result<String> {
        Err(CoreError::UpstreamUnavailable(
            "report summarization not supported by this generator".to_string(),
        ))
    }
}

/// Generator that is always unavailable. Used when no endpoint is
/// configured; every caller falls back to fixed content.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGenerator;

impl ReflectionGenerator for NullGenerator {
    async fn reflect(&self, _task: &DailyTask, _normalized_text: &str) -> Result<Reflection> {
        Err(CoreError::UpstreamUnavailable(
            "no reflection generator configured".to_string(),
        ))
    }
}

/// Chat-completions-backed generator.
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpGenerator {
    /// Build a generator against an OpenAI-compatible chat endpoint.
    ///
    /// The HTTP client carries its own request timeout, independent of the
    /// pipeline-level timeout around each call.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::UpstreamUnavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn complete(&self, system: &str, user: String) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("generator request: {e}")))?;
        if !resp.status().is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "generator returned HTTP {}",
                resp.status()
            )));
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::UpstreamUnavailable(format!("generator response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                CoreError::UpstreamUnavailable("generator returned no choices".to_string())
            })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl ReflectionGenerator for HttpGenerator {
    async fn reflect(&self, task: &DailyTask, normalized_text: &str) -> Result<Reflection> {
        let user = format!(
            "Task title: {}\nTask instruction: {}\nHint: {}\nUser entry: {}\n\
             Respond to the task and entry with JSON only.",
            task.title,
            task.instruction,
            task.hint.unwrap_or(""),
            normalized_text,
        );
        let raw = self.complete(SYSTEM_PROMPT, user).await?;
        parse_reflection(&raw)
    }

    async fn summarize(&self, digest: &ReportDigest) -> Result<String> {
        let user = format!(
            "A participant logged {} day(s) of a 28-day challenge in this period and \
             attached {} mint reference(s). Their current streak is {}. Write 2-3 \
             encouraging sentences about the cadence. Plain text, no lists.",
            digest.total, digest.minted, digest.streak,
        );
        let text = self
            .complete("You summarize progress in a warm, concrete voice.", user)
            .await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CoreError::UpstreamUnavailable(
                "generator returned empty summary".to_string(),
            ));
        }
        Ok(trimmed.to_string())
    }
}

/// Parse a model response into a valid reflection.
///
/// Tolerates prose around the JSON object (first `{` to last `}`); enforces
/// both fields present and non-empty; truncates to the field limits.
///
/// # Errors
/// `UpstreamUnavailable` when no valid object can be recovered.
pub fn parse_reflection(raw: &str) -> Result<Reflection> {
    let obj = extract_json(raw).ok_or_else(|| {
        CoreError::UpstreamUnavailable("generator output is not JSON".to_string())
    })?;
    let note = truncate_chars(obj.note.trim(), NOTE_LIMIT);
    let next = truncate_chars(obj.next.trim(), NEXT_LIMIT);
    if note.is_empty() || next.is_empty() {
        return Err(CoreError::UpstreamUnavailable(
            "generator output missing note or next".to_string(),
        ));
    }
    Ok(Reflection { note, next })
}

#[derive(Deserialize)]
struct RawReflection {
    #[serde(default)]
    note: String,
    #[serde(default)]
    next: String,
}

fn extract_json(raw: &str) -> Option<RawReflection> {
    if let Ok(obj) = serde_json::from_str::<RawReflection>(raw) {
        return Some(obj);
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

fn truncate_chars(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        s.to_string()
    } else {
        s.chars().take(limit).collect()
    }
}
