//! Generative-text advisory service.
//!
//! The advisory service is optional enrichment. Calls run off the engine
//! thread; their results come back tagged with the id they were issued under,
//! and only the newest request of each kind is allowed to land.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use gostream_ipc::{MoodReport, Suggestions};

use crate::error::AdvisoryError;

/// Default REST endpoint for the Gemini API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const SUGGESTED_TITLES: usize = 3;
const SUGGESTED_TAGS: usize = 5;

/// Title/tag suggestions and chat mood analysis.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Three titles, five tags and a description for `topic`.
    async fn suggest(&self, topic: &str) -> Result<Suggestions, AdvisoryError>;

    /// Overall mood of `messages`.
    async fn analyze_mood(&self, messages: &[String]) -> Result<MoodReport, AdvisoryError>;
}

/// Used when no API key is configured. Every call fails.
#[derive(Debug, Default, Clone)]
pub struct DisabledAdvisor;

#[async_trait]
impl Advisor for DisabledAdvisor {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn suggest(&self, _topic: &str) -> Result<Suggestions, AdvisoryError> {
        Err(AdvisoryError::Disabled)
    }

    async fn analyze_mood(&self, _messages: &[String]) -> Result<MoodReport, AdvisoryError> {
        Err(AdvisoryError::Disabled)
    }
}

/// Gemini `generateContent` client asking for schema-constrained JSON.
pub struct GeminiAdvisor {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiAdvisor {
    /// Create a client for `model`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: GEMINI_API_BASE.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        prompt: String,
        schema: Value,
    ) -> Result<T, AdvisoryError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );

        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        debug!(model = %self.model, "Calling advisory service");
        let body: Value = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_candidate(&body)
    }
}

#[async_trait]
impl Advisor for GeminiAdvisor {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(name = "advisory_suggest", skip(self))]
    async fn suggest(&self, topic: &str) -> Result<Suggestions, AdvisoryError> {
        let prompt = format!(
            "Suggest {SUGGESTED_TITLES} viral stream titles, {SUGGESTED_TAGS} relevant tags, \
             and a 2-sentence SEO description for a stream about: {topic}"
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "titles": { "type": "ARRAY", "items": { "type": "STRING" } },
                "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                "description": { "type": "STRING" },
            },
            "required": ["titles", "tags", "description"],
        });

        let suggestions: Suggestions = self.generate(prompt, schema).await?;
        validate_suggestions(suggestions)
    }

    #[instrument(name = "advisory_mood", skip(self, messages), fields(count = messages.len()))]
    async fn analyze_mood(&self, messages: &[String]) -> Result<MoodReport, AdvisoryError> {
        let prompt = format!(
            "Analyze the overall mood of these chat messages and give a summary: {}",
            messages.join(" | ")
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "mood": {
                    "type": "STRING",
                    "description": "Single word mood like positive, toxic, hyped, curious",
                },
                "summary": { "type": "STRING" },
            },
            "required": ["mood", "summary"],
        });

        self.generate(prompt, schema).await
    }
}

/// Extract and decode the JSON text of the first candidate.
fn parse_candidate<T: DeserializeOwned>(body: &Value) -> Result<T, AdvisoryError> {
    #[derive(Deserialize)]
    struct Part {
        text: Option<String>,
    }
    #[derive(Deserialize)]
    struct Content {
        #[serde(default)]
        parts: Vec<Part>,
    }
    #[derive(Deserialize)]
    struct Candidate {
        content: Content,
    }
    #[derive(Deserialize)]
    struct Response {
        #[serde(default)]
        candidates: Vec<Candidate>,
    }

    let response = Response::deserialize(body)
        .map_err(|e| AdvisoryError::InvalidResponse(e.to_string()))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| AdvisoryError::InvalidResponse("No candidates returned".to_string()))?;

    serde_json::from_str(&text).map_err(|e| AdvisoryError::InvalidResponse(e.to_string()))
}

fn validate_suggestions(suggestions: Suggestions) -> Result<Suggestions, AdvisoryError> {
    if suggestions.titles.len() != SUGGESTED_TITLES || suggestions.tags.len() != SUGGESTED_TAGS {
        return Err(AdvisoryError::InvalidResponse(format!(
            "Expected {} titles and {} tags, got {} and {}",
            SUGGESTED_TITLES,
            SUGGESTED_TAGS,
            suggestions.titles.len(),
            suggestions.tags.len()
        )));
    }
    Ok(suggestions)
}

/// Id under which an advisory request was issued.
pub type RequestId = u64;

/// The two kinds of advisory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryKind {
    /// Title/tag suggestions.
    Suggest,

    /// Chat mood.
    Mood,
}

/// A request ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryRequest {
    /// Suggestions for the given topic.
    Suggest { id: RequestId, topic: String },

    /// Mood of the given messages.
    Mood { id: RequestId, messages: Vec<String> },
}

impl AdvisoryRequest {
    /// Request id.
    pub fn id(&self) -> RequestId {
        match self {
            Self::Suggest { id, .. } | Self::Mood { id, .. } => *id,
        }
    }
}

/// A finished advisory call.
#[derive(Debug)]
pub enum AdvisoryReply {
    /// Result of a suggestion request.
    Suggestions {
        id: RequestId,
        result: Result<Suggestions, AdvisoryError>,
    },

    /// Result of a mood request.
    Mood {
        id: RequestId,
        result: Result<MoodReport, AdvisoryError>,
    },
}

/// Run `request` against `advisor`.
pub async fn dispatch(advisor: &dyn Advisor, request: AdvisoryRequest) -> AdvisoryReply {
    match request {
        AdvisoryRequest::Suggest { id, topic } => AdvisoryReply::Suggestions {
            id,
            result: advisor.suggest(&topic).await,
        },
        AdvisoryRequest::Mood { id, messages } => AdvisoryReply::Mood {
            id,
            result: advisor.analyze_mood(&messages).await,
        },
    }
}

/// Tracks the newest request of each kind so superseded replies are dropped.
#[derive(Debug, Default)]
pub struct AdvisoryTracker {
    next_id: RequestId,
    latest_suggest: Option<RequestId>,
    latest_mood: Option<RequestId>,
}

impl AdvisoryTracker {
    /// Create a tracker with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a new request of `kind`, superseding any older one.
    pub fn issue(&mut self, kind: AdvisoryKind) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        *self.slot(kind) = Some(id);
        id
    }

    /// Returns true (and clears the slot) if `id` is the newest request of `kind`.
    pub fn accept(&mut self, kind: AdvisoryKind, id: RequestId) -> bool {
        let slot = self.slot(kind);
        if *slot == Some(id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    fn is_pending(&self, kind: AdvisoryKind) -> bool {
        match kind {
            AdvisoryKind::Suggest => self.latest_suggest.is_some(),
            AdvisoryKind::Mood => self.latest_mood.is_some(),
        }
    }

    fn slot(&mut self, kind: AdvisoryKind) -> &mut Option<RequestId> {
        match kind {
            AdvisoryKind::Suggest => &mut self.latest_suggest,
            AdvisoryKind::Mood => &mut self.latest_mood,
        }
    }
}
