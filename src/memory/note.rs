//! Memory note model: a persisted semantic unit with searchable text and an
//! optional embedding.

use crate::ids::NoteId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed enumeration of note categories. Unknown strings parse to [`SourceType::Fact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Decision,
    Experiment,
    ExternalSource,
    Fact,
    Issue,
    PlanStep,
    Preference,
    Requirement,
    Retrospective,
    Summary,
    ToolResult,
    UserMessage,
}

impl SourceType {
    pub fn parse(value: &str) -> Self {
        match value {
            "decision" => SourceType::Decision,
            "experiment" => SourceType::Experiment,
            "external_source" => SourceType::ExternalSource,
            "fact" => SourceType::Fact,
            "issue" => SourceType::Issue,
            "plan_step" => SourceType::PlanStep,
            "preference" => SourceType::Preference,
            "requirement" => SourceType::Requirement,
            "retrospective" => SourceType::Retrospective,
            "summary" => SourceType::Summary,
            "tool_result" => SourceType::ToolResult,
            "user_message" => SourceType::UserMessage,
            _ => SourceType::Fact,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Decision => "decision",
            SourceType::Experiment => "experiment",
            SourceType::ExternalSource => "external_source",
            SourceType::Fact => "fact",
            SourceType::Issue => "issue",
            SourceType::PlanStep => "plan_step",
            SourceType::Preference => "preference",
            SourceType::Requirement => "requirement",
            SourceType::Retrospective => "retrospective",
            SourceType::Summary => "summary",
            SourceType::ToolResult => "tool_result",
            SourceType::UserMessage => "user_message",
        }
    }
}

const MIN_IMPORTANCE: u8 = 1;
const MAX_IMPORTANCE: u8 = 5;
pub const DEFAULT_IMPORTANCE: u8 = 2;

fn clamp_importance(value: u8) -> u8 {
    value.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}

/// A long-term semantic note. Created via the builder chain below; written,
/// retrieved, and deleted only through a [`super::MemoryStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNote {
    pub id: NoteId,
    pub source_type: SourceType,
    pub raw_content: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub importance: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryNote {
    pub fn new(
        id: impl Into<NoteId>,
        source_type: SourceType,
        raw_content: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            source_type,
            raw_content: raw_content.into(),
            summary: summary.into(),
            context_description: String::new(),
            keywords: Vec::new(),
            tags: Vec::new(),
            importance: DEFAULT_IMPORTANCE,
            user_id: None,
            session_id: None,
            task_id: None,
            created_at: now,
            updated_at: now,
            embedding: None,
        }
    }

    pub fn with_context_description(mut self, value: impl Into<String>) -> Self {
        self.context_description = value.into();
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = clamp_importance(importance);
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// `raw_content ⊕ " " ⊕ summary ⊕ " " ⊕ context_description`, omitting
    /// empty fields along with their separators.
    pub fn searchable_text(&self) -> String {
        [
            self.raw_content.as_str(),
            self.summary.as_str(),
            self.context_description.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
    }
}
