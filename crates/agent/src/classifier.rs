//! LLM-backed classifier — asks the text generation service for a JSON
//! routing verdict.

use std::sync::Arc;
use async_trait::async_trait;
use conclave_core::capability::CapabilityDescriptor;
use conclave_core::classifier::{Classifier, ClassifierVerdict};
use conclave_core::error::ClassifierError;
use conclave_core::message::Message;
use conclave_core::provider::{Provider, ProviderRequest};
use tracing::debug;

const CLASSIFIER_PROMPT: &str = "You are a routing agent. Decide which specialist capabilities should \
answer the user's query and how they should work together.

Modes:
- \"single\": one capability answers alone (no supporting capabilities)
- \"sequential\": the primary answers first, then each supporting capability builds on the previous answers
- \"parallel\": all listed capabilities answer independently and their answers are combined

Confidence is one of \"high\", \"medium\", \"low\".

Respond with ONLY a JSON object, no prose:
{\"primary\": \"<id>\", \"supporting\": [\"<id>\", ...], \"mode\": \"single|sequential|parallel\", \
\"confidence\": \"high|medium|low\", \"rationale\": \"<one sentence>\"}

Use only the capability ids listed below.";

/// Classifier that delegates to a [`Provider`].
pub struct LlmClassifier {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 300,
        }
    }

    fn system_prompt(capabilities: &[CapabilityDescriptor]) -> String {
        let listing: Vec<String> = capabilities
            .iter()
            .map(|c| {
                if c.keywords.is_empty() {
                    format!("- {}: {}", c.id, c.label)
                } else {
                    format!("- {}: {} (topics: {})", c.id, c.label, c.keywords.join(", "))
                }
            })
            .collect();
        format!("{CLASSIFIER_PROMPT}\n\nCapabilities:\n{}", listing.join("\n"))
    }
}

/// Parse a verdict out of a model answer that may wrap the JSON in prose or
/// a code fence.
pub fn parse_verdict(text: &str) -> Result<ClassifierVerdict, ClassifierError> {
    let json = extract_json_object(text)
        .ok_or_else(|| ClassifierError::Malformed("no JSON object in answer".into()))?;
    serde_json::from_str(json).map_err(|e| ClassifierError::Malformed(e.to_string()))
}

/// The first balanced `{...}` in `s`.
fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(
        &self,
        query: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> Result<ClassifierVerdict, ClassifierError> {
        let request = ProviderRequest::new(
            &self.model,
            vec![Message::system(Self::system_prompt(capabilities)), Message::user(query)],
        )
        .with_temperature(0.0)
        .with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await?;
        debug!(provider = self.provider.name(), answer = %response.message.content, "Classifier answered");
        parse_verdict(&response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use conclave_core::classifier::{Confidence, ExecutionMode};
    use conclave_core::error::ProviderError;

    #[test]
    fn parses_fenced_json() {
        let verdict = parse_verdict(
            "Here you go:\n```json\n{\"primary\": \"database\", \"supporting\": [\"csharp\"], \
             \"mode\": \"sequential\", \"confidence\": \"high\", \"rationale\": \"uses {braces}\"}\n```",
        )
        .unwrap();
        assert_eq!(verdict.primary, "database");
        assert_eq!(verdict.supporting, vec!["csharp"]);
        assert_eq!(verdict.mode, ExecutionMode::Sequential);
        assert_eq!(verdict.confidence, Confidence::High);
        assert_eq!(verdict.rationale, "uses {braces}");
    }

    #[test]
    fn missing_optional_fields_default() {
        let verdict =
            parse_verdict(r#"{"primary":"general","mode":"single","confidence":"low"}"#).unwrap();
        assert!(verdict.supporting.is_empty());
        assert!(verdict.rationale.is_empty());
    }

    #[test]
    fn malformed_answers_are_typed_errors() {
        for bad in [
            "SQL",
            "{\"primary\": \"database\"",
            r#"{"primary":"database","mode":"solo","confidence":"high"}"#,
            r#"{"primary":"database","mode":"single","confidence":"high","extra":1}"#,
        ] {
            assert!(
                matches!(parse_verdict(bad), Err(ClassifierError::Malformed(_))),
                "accepted: {bad}"
            );
        }
    }

    #[tokio::test]
    async fn classify_sends_capabilities_and_query() {
        let provider = Arc::new(RecordingProvider::replying(
            r#"{"primary":"epicor","mode":"single","confidence":"medium"}"#,
        ));
        let classifier = LlmClassifier::new(provider.clone(), "router-model");
        let registry = test_registry();

        let verdict = classifier.classify("Set up P21 pricing", registry.all()).await.unwrap();
        assert_eq!(verdict.primary, "epicor");

        let request = &provider.requests()[0];
        assert_eq!(request.model, "router-model");
        assert_eq!(request.temperature, 0.0);
        assert!(request.messages[0].content.contains("- epicor: Epicor P21 Agent"));
        assert!(request.messages[0].content.contains("- general: General Assistant"));
        assert_eq!(request.messages[1].content, "Set up P21 pricing");
    }

    #[tokio::test]
    async fn provider_failure_is_unavailable() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 5,
        }));
        let err = LlmClassifier::new(provider, "m")
            .classify("q", test_registry().all())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
