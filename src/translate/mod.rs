//! The translation capability, a deterministic stub, and a test double.

use crate::error::{Result, SubvoxError};
use std::sync::Arc;
use std::time::Duration;

/// One translation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub text: String,
    /// BCP-47-ish source language code, e.g. "en".
    pub source_lang: String,
    /// Target language code, e.g. "ja".
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }
}

/// Trait for text translation.
///
/// This trait allows swapping implementations (real MT engine vs stub vs
/// mock). A failure is fatal only to the job in flight, never to the
/// pipeline.
pub trait Translator: Send + Sync {
    /// Translate the request's text into the target language.
    fn translate(&self, request: &TranslationRequest) -> Result<String>;

    /// Engine name, for logs.
    fn name(&self) -> &str;
}

/// Implement the trait for Arc<T> to allow sharing across threads.
impl<T: Translator> Translator for Arc<T> {
    fn translate(&self, request: &TranslationRequest) -> Result<String> {
        (**self).translate(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Deterministic placeholder translator.
///
/// Marks output as a provisional translation instead of translating, which
/// makes the full pipeline runnable without any MT engine installed.
#[derive(Debug, Clone, Default)]
pub struct StubTranslator;

impl StubTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Translator for StubTranslator {
    fn translate(&self, request: &TranslationRequest) -> Result<String> {
        Ok(format!("【仮訳（かやく / kayaku）】{}", request.text))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Mock translator for testing.
#[derive(Debug, Clone)]
pub struct MockTranslator {
    prefix: String,
    delay: Option<Duration>,
    should_fail: bool,
}

impl MockTranslator {
    /// Create a mock that echoes the source text behind a "mock:" prefix.
    pub fn new() -> Self {
        Self {
            prefix: "mock:".to_string(),
            delay: None,
            should_fail: false,
        }
    }

    /// Configure the prefix prepended to every translation.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Configure a per-call delay, for exercising worker timing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configure the mock to fail on every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for MockTranslator {
    fn translate(&self, request: &TranslationRequest) -> Result<String> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.should_fail {
            return Err(SubvoxError::Translation {
                message: "mock translation failure".to_string(),
            });
        }
        Ok(format!("{}{}", self.prefix, request.text))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_marks_text_as_provisional() {
        let translator = StubTranslator::new();
        let request = TranslationRequest::new("Hello there.", "en", "ja");
        let out = translator.translate(&request).unwrap();
        assert!(out.starts_with("【仮訳"));
        assert!(out.ends_with("Hello there."));
        assert_eq!(translator.name(), "stub");
    }

    #[test]
    fn mock_echoes_with_prefix() {
        let translator = MockTranslator::new().with_prefix("ja:");
        let request = TranslationRequest::new("Good morning.", "en", "ja");
        assert_eq!(translator.translate(&request).unwrap(), "ja:Good morning.");
    }

    #[test]
    fn mock_failure_is_a_translation_error() {
        let translator = MockTranslator::new().with_failure();
        let request = TranslationRequest::new("x", "en", "ja");
        let err = translator.translate(&request).unwrap_err();
        assert!(err.to_string().contains("Translation failed"));
    }

    #[test]
    fn arc_wrapper_delegates() {
        let translator = Arc::new(MockTranslator::new());
        let request = TranslationRequest::new("shared", "en", "ja");
        assert_eq!(translator.translate(&request).unwrap(), "mock:shared");
        assert_eq!(translator.name(), "mock");
    }
}
