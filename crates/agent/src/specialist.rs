//! Specialist responders — persona prompt + knowledge grounding + LLM call.
//!
//! Every registered capability is served by a [`SpecialistResponder`]; the
//! capability's [`Persona`] selects the system prompt. Knowledge snippets go
//! into the system prompt, the bounded prior transcript into the user turn.

use std::sync::Arc;
use async_trait::async_trait;
use conclave_core::capability::{CapabilityDescriptor, CapabilityId, Persona};
use conclave_core::knowledge::{KnowledgeLookup, KnowledgeQuery, KnowledgeSnippet};
use conclave_core::message::Message;
use conclave_core::provider::{Provider, ProviderRequest};
use tracing::{debug, warn};

use crate::responder::{Responder, ResponderError, ResponderOutput};
use crate::session::AgentMessage;

/// Marker a responder puts on its last line to ask for another capability.
pub const HANDOFF_PREFIX: &str = "HANDOFF:";

/// Generation and context limits for one responder.
#[derive(Debug, Clone)]
pub struct ResponderLimits {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Prior transcript entries forwarded to the model (most recent kept)
    pub max_context_messages: usize,
    pub max_snippets: usize,
}

impl Default for ResponderLimits {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            temperature: 0.7,
            max_tokens: Some(4096),
            max_context_messages: 5,
            max_snippets: 3,
        }
    }
}

/// System prompt for a persona.
pub fn persona_prompt(persona: Persona) -> &'static str {
    match persona {
        Persona::Database => {
            "You are an expert SQL and relational database specialist.\n\n\
             You help with:\n\
             - Translating business questions into correct, efficient SQL\n\
             - Explaining schemas, joins, indexes and query plans\n\
             - Data quality checks and aggregate reporting\n\n\
             Rules:\n\
             - Only produce read-only queries unless explicitly asked otherwise\n\
             - State assumptions about table and column names\n\
             - Put SQL in fenced ```sql blocks"
        }
        Persona::CSharp => {
            "You are an expert C# and .NET developer.\n\n\
             You help with:\n\
             - Modern C# language features and idioms\n\
             - ASP.NET Core, Entity Framework Core and LINQ\n\
             - Async code, dependency injection and testing\n\n\
             Rules:\n\
             - Target current LTS .NET unless told otherwise\n\
             - Include error handling in examples\n\
             - Put code in fenced ```csharp blocks"
        }
        Persona::Erp => {
            "You are an expert Epicor Prophet 21 (P21) ERP specialist.\n\n\
             You help with:\n\
             - P21 business processes: inventory, sales, purchasing, finance\n\
             - Data export and import, and the P21 SQL Server schema\n\
             - P21 web services API integration and business rules\n\n\
             Rules:\n\
             - Prioritise data integrity and business rule compliance\n\
             - Consider the performance impact on production systems\n\
             - Mention version compatibility where it matters"
        }
        Persona::General => {
            "You are a knowledgeable general assistant.\n\n\
             Answer clearly and concisely. When a question belongs to a \
             specialist domain, give the best general answer you can."
        }
    }
}

/// A responder backed by a text generation provider.
pub struct SpecialistResponder {
    descriptor: CapabilityDescriptor,
    provider: Arc<dyn Provider>,
    knowledge: Arc<dyn KnowledgeLookup>,
    limits: ResponderLimits,
}

impl SpecialistResponder {
    pub fn new(
        descriptor: CapabilityDescriptor,
        provider: Arc<dyn Provider>,
        knowledge: Arc<dyn KnowledgeLookup>,
        limits: ResponderLimits,
    ) -> Self {
        Self {
            descriptor,
            provider,
            knowledge,
            limits,
        }
    }

    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    /// Knowledge snippets for this capability. Lookup failures are logged
    /// and treated as "no snippets".
    async fn grounding(&self, query: &str) -> Vec<KnowledgeSnippet> {
        if self.limits.max_snippets == 0 {
            return Vec::new();
        }
        let request = KnowledgeQuery::new(
            self.descriptor.id.clone(),
            self.descriptor.collection.clone(),
            query,
        )
        .with_limit(self.limits.max_snippets);

        match self.knowledge.search(request).await {
            Ok(snippets) => {
                debug!(capability = %self.descriptor.id, snippets = snippets.len(), "Knowledge retrieved");
                snippets
            }
            Err(e) => {
                warn!(capability = %self.descriptor.id, error = %e, "Knowledge lookup failed, continuing without it");
                Vec::new()
            }
        }
    }

    fn system_prompt(&self, snippets: &[KnowledgeSnippet]) -> String {
        let mut prompt = persona_prompt(self.descriptor.persona).to_string();

        prompt.push_str(
            "\n\nCollaboration:\n\
             - Build on insights from other specialists when they are provided\n\
             - If another specialist should contribute, end your answer with one line \
             `HANDOFF: <capability-id>` and nothing after it",
        );

        if !snippets.is_empty() {
            prompt.push_str("\n\n**Knowledge Base Context**:\n");
            for snippet in snippets {
                prompt.push_str(&format!("\n### {}\n{}\n", snippet.title, snippet.body.trim()));
            }
        }
        prompt
    }

    fn user_message(&self, query: &str, context: &[AgentMessage]) -> String {
        let mut message = format!("User Query: {query}\n\n");

        let recent = bounded_context(context, self.limits.max_context_messages);
        if !recent.is_empty() {
            message.push_str("**Previous Agent Insights** (use these to build your response):\n\n");
            for entry in recent {
                message.push_str(&format!("--- {} ---\n{}\n\n", entry.label, entry.content));
            }
            message.push_str(&format!(
                "**Your Task**:\nReview the insights above and add your {} expertise. \
                 Build on what others have said rather than repeating it.\n",
                self.descriptor.label
            ));
        }
        message
    }
}

/// The most recent `max` entries of `context`, oldest first.
pub fn bounded_context(context: &[AgentMessage], max: usize) -> &[AgentMessage] {
    &context[context.len().saturating_sub(max)..]
}

/// Strip a trailing `HANDOFF: <id>` line, returning the remaining text and
/// the suggested id as written.
pub fn split_handoff(text: &str) -> (String, Option<CapabilityId>) {
    let trimmed = text.trim_end();
    let (body, last) = match trimmed.rsplit_once('\n') {
        Some((body, last)) => (body, last),
        None => ("", trimmed),
    };

    let marker = last.trim().trim_matches('`').trim();
    match marker.strip_prefix(HANDOFF_PREFIX) {
        Some(id) => {
            let id = id.trim().trim_matches('`').trim();
            let suggestion = (!id.is_empty()).then(|| CapabilityId::new(id));
            (body.trim_end().to_string(), suggestion)
        }
        None => (trimmed.to_string(), None),
    }
}

#[async_trait]
impl Responder for SpecialistResponder {
    fn capability(&self) -> &CapabilityId {
        &self.descriptor.id
    }

    async fn process(
        &self,
        query: &str,
        context: &[AgentMessage],
    ) -> Result<ResponderOutput, ResponderError> {
        let snippets = self.grounding(query).await;

        let messages = vec![
            Message::system(self.system_prompt(&snippets)),
            Message::user(self.user_message(query, context)),
        ];
        let mut request = ProviderRequest::new(&self.limits.model, messages)
            .with_temperature(self.limits.temperature);
        if let Some(max_tokens) = self.limits.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        debug!(
            capability = %self.descriptor.id,
            provider = self.provider.name(),
            context = context.len(),
            "Calling text generation"
        );

        let response = self.provider.complete(request).await?;
        let (content, suggestion) = split_handoff(&response.message.content);

        if content.trim().is_empty() {
            return Err(ResponderError::InvalidOutput("empty completion".into()));
        }

        Ok(ResponderOutput {
            content,
            suggested_capability: suggestion.filter(|id| *id != self.descriptor.id),
        })
    }
}
