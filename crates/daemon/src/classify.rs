use std::sync::Arc;
use std::time::Duration;

use readyboard_core::classifier::{classify_local, resolve_remote, validate_text};
use readyboard_core::model::{ClassificationResult, ClassificationSource};
use readyboard_core::{Error, Result};
use tokio::time::Instant;
use tracing::warn;

use crate::ports::RemoteClassifier;

/// Classifies utterances, remote backend first, keyword rules second.
pub struct IntentService {
    remote: Option<Arc<dyn RemoteClassifier>>,
    timeout: Duration,
}

impl IntentService {
    pub fn new(remote: Option<Arc<dyn RemoteClassifier>>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub fn local_only() -> Self {
        Self::new(None, Duration::ZERO)
    }

    /// Only blank text is an error; backend trouble falls through to the
    /// local rules.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let started = Instant::now();
        let text = validate_text(text)?;

        if let Some(remote) = &self.remote {
            let attempt = match tokio::time::timeout(self.timeout, remote.classify(text)).await {
                Ok(r) => r,
                Err(_) => Err(Error::backend(format!(
                    "no reply within {}ms",
                    self.timeout.as_millis()
                ))),
            };
            match attempt {
                Ok(reply) => {
                    let (language, intent, confidence, response) = resolve_remote(&reply);
                    return Ok(ClassificationResult {
                        language,
                        intent,
                        confidence,
                        response,
                        latency_ms: elapsed_ms(started),
                        source: ClassificationSource::Remote,
                    });
                }
                Err(e) => warn!(error = %e, "remote classifier failed; using local rules"),
            }
        }

        let m = classify_local(text);
        Ok(ClassificationResult {
            language: m.language,
            intent: m.intent,
            confidence: m.confidence,
            response: m.response().to_string(),
            latency_ms: elapsed_ms(started),
            source: ClassificationSource::LocalFallback,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
