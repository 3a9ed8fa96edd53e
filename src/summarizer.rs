//! Summarisation orchestrator.
//!
//! Builds a style/length-conditioned prompt, throttles outbound calls with a
//! shared rate limiter, and walks an ordered ladder of request variants until
//! one produces usable text. Generative backends reject requests for
//! content-policy reasons that are sensitive to exact prompt phrasing, model
//! version, and delivery mode, so semantics-preserving variations recover
//! many false-positive refusals.

use crate::backend::{Delivery, GenerationParams, GenerationRequest, TextGenerator};
use crate::config::AgentConfig;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Inputs shorter than this after cleaning carry nothing worth sending
/// to the backend.
pub const MIN_INPUT_LEN: usize = 40;

const EXHAUSTED_MESSAGE: &str = "Unable to summarise this article. \
The content may be triggering the backend's server-side safety filters.\n\
Try:\n\
  - a different news source (Reuters, BBC, AP News)\n\
  - a less sensitive topic\n\
  - waiting a minute or two before retrying";

const EMPTY_INPUT_MESSAGE: &str = "Nothing to summarise. \
The article text was empty or too short after cleaning; try a different link.";

/// The only two failure shapes callers ever see. Backend fault detail is
/// logged inside the ladder and never surfaces here.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SummarizeError {
    #[error("{}", EMPTY_INPUT_MESSAGE)]
    EmptyInput,
    #[error("{}", EXHAUSTED_MESSAGE)]
    Exhausted,
}

/// Voice of the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    Simple,
    Technical,
}

impl SummaryStyle {
    fn clause(self) -> &'static str {
        match self {
            SummaryStyle::Simple => {
                "Rewrite in simple English. Short sentences, easy words. \
                 Be factual and direct.\n\n"
            }
            SummaryStyle::Technical => {
                "Rewrite professionally. Technical terms, full depth. \
                 Be comprehensive and direct.\n\n"
            }
        }
    }

    fn label(self) -> &'static str {
        match self {
            SummaryStyle::Simple => "simple, plain-language",
            SummaryStyle::Technical => "technical, professional",
        }
    }
}

/// Target size of the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLength {
    Concise,
    Detailed,
}

impl SummaryLength {
    fn clause(self) -> &'static str {
        match self {
            SummaryLength::Concise => {
                "MAXIMUM 6-8 bullet points only. \
                 EACH BULLET: only ONE sentence, max 15 words. \
                 Extract ONLY the most critical facts. \
                 NO paragraphs, NO explanations, NO context.\n\n"
            }
            SummaryLength::Detailed => {
                "Write a comprehensive analysis of 4 to 6 paragraphs, \
                 up to 100-150 words per paragraph. \
                 Include context, analysis, implications and examples. \
                 Cover all major points thoroughly.\n\n"
            }
        }
    }

    fn max_output_tokens(self) -> u32 {
        match self {
            SummaryLength::Concise => 1024,
            SummaryLength::Detailed => 2048,
        }
    }
}

/// One summarisation request, immutable once constructed
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub text: String,
    pub style: SummaryStyle,
    pub length: SummaryLength,
}

/// Shared throttle for outbound backend calls.
///
/// A leaky-bucket-of-one: whoever holds the guard waits out the remainder
/// of the minimum interval since the last successful call. The timestamp
/// only moves on confirmed success, measured at completion time, and the
/// whole read-check-sleep-update sequence happens under one lock so
/// concurrent callers cannot both observe a stale elapsed value.
pub struct RateLimiter {
    min_interval: Duration,
    last_success: Mutex<Option<Instant>>,
}

/// Held for the duration of one throttled call; dropping it without
/// [`ThrottleGuard::mark_success`] leaves the timestamp untouched.
pub struct ThrottleGuard<'a> {
    slot: MutexGuard<'a, Option<Instant>>,
}

impl ThrottleGuard<'_> {
    pub fn mark_success(mut self) {
        *self.slot = Some(Instant::now());
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_success: Mutex::new(None),
        }
    }

    /// Wait until the minimum interval since the last success has elapsed
    pub async fn throttle(&self) -> ThrottleGuard<'_> {
        let slot = self.last_success.lock().await;
        if let Some(last) = *slot {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(?wait, "throttling before backend call");
                sleep(wait).await;
            }
        }
        ThrottleGuard { slot }
    }
}

/// Summarise cleaned article text through the fallback ladder.
///
/// Returns the first usable result, or [`SummarizeError::Exhausted`] with a
/// remediation message once every variant has been tried.
pub async fn summarize(
    backend: &dyn TextGenerator,
    limiter: &RateLimiter,
    agent: &AgentConfig,
    request: &SummaryRequest,
) -> Result<String, SummarizeError> {
    // Gate degenerate input before taking the throttle; a doomed call
    // should not consume the shared interval.
    if request.text.trim().len() < MIN_INPUT_LEN {
        return Err(SummarizeError::EmptyInput);
    }

    let guard = limiter.throttle().await;

    for (label, attempt) in build_ladder(agent, request) {
        debug!(label, model = %attempt.model, "ladder attempt");
        match backend.generate(&attempt).await {
            Ok(text) if !text.trim().is_empty() => {
                guard.mark_success();
                return Ok(text.trim().to_string());
            }
            Ok(_) => warn!(label, "ladder attempt returned blank text"),
            Err(err) => warn!(label, %err, "ladder attempt failed"),
        }
    }

    Err(SummarizeError::Exhausted)
}

/// The ordered request variants. Each is attempted independently; a failure
/// or blank result advances to the next.
fn build_ladder(
    agent: &AgentConfig,
    request: &SummaryRequest,
) -> Vec<(&'static str, GenerationRequest)> {
    let full_prompt = build_prompt(request);
    let tuned = GenerationParams {
        temperature: Some(0.5),
        top_p: Some(0.8),
        top_k: Some(40),
        max_output_tokens: Some(request.length.max_output_tokens()),
        relax_safety: true,
    };

    vec![
        (
            "full prompt, safety relaxed",
            GenerationRequest {
                model: agent.primary_model.clone(),
                prompt: full_prompt.clone(),
                params: tuned,
                delivery: Delivery::Unary,
            },
        ),
        (
            "reworded prompt",
            GenerationRequest {
                model: agent.primary_model.clone(),
                prompt: format!(
                    "Please analyse and summarise the following article in a {} style:\n\n{}",
                    request.style.label(),
                    request.text
                ),
                params: GenerationParams::default(),
                delivery: Delivery::Unary,
            },
        ),
        (
            "secondary model",
            GenerationRequest {
                model: agent.secondary_model.clone(),
                prompt: full_prompt.clone(),
                params: GenerationParams {
                    max_output_tokens: Some(2048),
                    ..GenerationParams::default()
                },
                delivery: Delivery::Unary,
            },
        ),
        (
            "streamed delivery",
            GenerationRequest {
                model: agent.primary_model.clone(),
                prompt: full_prompt,
                params: GenerationParams::default(),
                delivery: Delivery::Streamed,
            },
        ),
        (
            "neutral prompt",
            GenerationRequest {
                model: agent.primary_model.clone(),
                prompt: format!("Summarize:\n{}", request.text),
                params: GenerationParams::default(),
                delivery: Delivery::Unary,
            },
        ),
    ]
}

/// Style clause, then length clause, then the article text
fn build_prompt(request: &SummaryRequest) -> String {
    format!(
        "{}{}Article:\n{}",
        request.style.clause(),
        request.length.clause(),
        request.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    const ARTICLE: &str =
        "scientist found water mars rover drilled deep crater confirming ancient lake";

    /// Scripted outcome for one ladder attempt
    enum Script {
        Text(&'static str),
        Blank,
        Fail,
    }

    struct ScriptedBackend {
        script: StdMutex<Vec<Script>>,
        seen: StdMutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Script>) -> Self {
            Self {
                script: StdMutex::new(script),
                seen: StdMutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedBackend {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
            self.seen.lock().unwrap().push(request.clone());
            let mut script = self.script.lock().unwrap();
            match script.remove(0) {
                Script::Text(text) => Ok(text.to_string()),
                Script::Blank => Ok("   ".to_string()),
                Script::Fail => Err(BackendError::EmptyResponse),
            }
        }
    }

    fn request(style: SummaryStyle, length: SummaryLength) -> SummaryRequest {
        SummaryRequest {
            text: ARTICLE.to_string(),
            style,
            length,
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_millis(0))
    }

    #[tokio::test]
    async fn first_usable_result_wins() {
        let backend = ScriptedBackend::new(vec![Script::Text("A concise summary.")]);
        let result = summarize(
            &backend,
            &limiter(),
            &AgentConfig::default(),
            &request(SummaryStyle::Simple, SummaryLength::Concise),
        )
        .await;
        assert_eq!(result.unwrap(), "A concise summary.");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn ladder_falls_through_to_the_last_variant() {
        let backend = ScriptedBackend::new(vec![
            Script::Fail,
            Script::Blank,
            Script::Fail,
            Script::Fail,
            Script::Text("Neutral prompt got through."),
        ]);
        let result = summarize(
            &backend,
            &limiter(),
            &AgentConfig::default(),
            &request(SummaryStyle::Technical, SummaryLength::Detailed),
        )
        .await;
        assert_eq!(result.unwrap(), "Neutral prompt got through.");
        assert_eq!(backend.calls(), 5);

        let seen = backend.seen.lock().unwrap();
        let agent = AgentConfig::default();
        let models: Vec<&str> = seen.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(
            models,
            vec![
                agent.primary_model.as_str(),
                agent.primary_model.as_str(),
                agent.secondary_model.as_str(),
                agent.primary_model.as_str(),
                agent.primary_model.as_str(),
            ]
        );
        let deliveries: Vec<Delivery> = seen.iter().map(|r| r.delivery).collect();
        assert_eq!(
            deliveries,
            vec![
                Delivery::Unary,
                Delivery::Unary,
                Delivery::Unary,
                Delivery::Streamed,
                Delivery::Unary,
            ]
        );
        // only the first variant relaxes safety filters
        assert!(seen[0].params.relax_safety);
        assert!(seen.iter().skip(1).all(|r| !r.params.relax_safety));
        assert!(seen[4].prompt.starts_with("Summarize:"));
    }

    #[tokio::test]
    async fn exhausted_ladder_returns_remediation_not_fault_detail() {
        let backend = ScriptedBackend::new(vec![
            Script::Fail,
            Script::Fail,
            Script::Fail,
            Script::Fail,
            Script::Fail,
        ]);
        let result = summarize(
            &backend,
            &limiter(),
            &AgentConfig::default(),
            &request(SummaryStyle::Simple, SummaryLength::Concise),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err, SummarizeError::Exhausted);

        let message = err.to_string();
        assert!(!message.is_empty());
        assert!(message.contains("different news source"));
        // no leaked backend internals
        assert!(!message.contains("EmptyResponse"));
        assert!(!message.contains("status"));
        assert_eq!(backend.calls(), 5);
    }

    #[tokio::test]
    async fn degenerate_input_is_rejected_before_any_backend_call() {
        let backend = ScriptedBackend::new(vec![]);
        let short = SummaryRequest {
            text: "water".to_string(),
            style: SummaryStyle::Simple,
            length: SummaryLength::Concise,
        };
        let result = summarize(&backend, &limiter(), &AgentConfig::default(), &short).await;
        assert_eq!(result.unwrap_err(), SummarizeError::EmptyInput);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_wait_out_the_minimum_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        let guard = limiter.throttle().await;
        guard.mark_success();
        assert!(start.elapsed() < Duration::from_millis(10));

        // second acquisition must be delayed by the remaining interval
        let guard = limiter.throttle().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        guard.mark_success();
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_does_not_wait_once_the_interval_has_passed() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.throttle().await.mark_success();

        sleep(Duration::from_secs(2)).await;
        let before = Instant::now();
        let guard = limiter.throttle().await;
        assert!(before.elapsed() < Duration::from_millis(10));
        drop(guard);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_calls_leave_the_timestamp_untouched() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.throttle().await.mark_success();
        sleep(Duration::from_secs(2)).await;

        // guard dropped without mark_success: the next caller measures
        // from the old success, which has already elapsed
        drop(limiter.throttle().await);
        let before = Instant::now();
        drop(limiter.throttle().await);
        assert!(before.elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn prompt_reflects_style_and_length_selection() {
        let concise = build_prompt(&request(SummaryStyle::Simple, SummaryLength::Concise));
        assert!(concise.contains("simple English"));
        assert!(concise.contains("bullet points"));
        assert!(concise.contains("Article:"));
        assert!(concise.ends_with(ARTICLE));

        let detailed = build_prompt(&request(SummaryStyle::Technical, SummaryLength::Detailed));
        assert!(detailed.contains("Technical terms"));
        assert!(detailed.contains("4 to 6 paragraphs"));
    }

    #[test]
    fn output_token_ceiling_scales_with_requested_length() {
        let agent = AgentConfig::default();
        let concise = build_ladder(&agent, &request(SummaryStyle::Simple, SummaryLength::Concise));
        assert_eq!(concise[0].1.params.max_output_tokens, Some(1024));

        let detailed =
            build_ladder(&agent, &request(SummaryStyle::Simple, SummaryLength::Detailed));
        assert_eq!(detailed[0].1.params.max_output_tokens, Some(2048));
    }
}
