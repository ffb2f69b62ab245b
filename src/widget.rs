// src/widget.rs
//! State of the floating chat widget: whether it is shown, what the
//! transcript holds, and which answers are still being waited on.

use std::fmt;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::backend::{QueryRequest, QueryResponse};
use crate::error::BackendResult;
use crate::timestamps::{self, Timestamp};

pub const TITLE: &str = "YouTube AI Assistant";
pub const WELCOME: &str = "Welcome! Ask a question about the video.";
pub const THINKING: &str = "Thinking...";
pub const NO_ANSWER: &str = "No answer found.";
pub const BACKEND_FAILURE: &str = "Error communicating with backend.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Closed,
    Open,
}

impl Visibility {
    fn flipped(self) -> Self {
        match self {
            Self::Closed => Self::Open,
            Self::Open => Self::Closed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    Notice,
    You,
    Bot,
}

/// A seek button under an answer.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub start: f64,
    /// `M:SS` form of `start`.
    pub label: String,
    pub snippet: Option<String>,
    /// Backend metadata that came with the timestamp.
    pub extra: Map<String, Value>,
}

impl From<Timestamp> for Marker {
    fn from(ts: Timestamp) -> Self {
        Self {
            label: timestamps::format_time(ts.start),
            start: ts.start,
            snippet: ts.text,
            extra: ts.extra,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EntryBody {
    Text(String),
    Thinking,
    Answer { text: String, markers: Vec<Marker> },
    Failed,
}

#[derive(Clone, Debug)]
pub struct ChatEntry {
    pub id: EntryId,
    pub speaker: Speaker,
    pub body: EntryBody,
    pub posted_at: DateTime<Utc>,
}

impl fmt::Display for ChatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.speaker {
            Speaker::Notice => {}
            Speaker::You => write!(f, "You: ")?,
            Speaker::Bot => write!(f, "Bot: ")?,
        }
        match &self.body {
            EntryBody::Text(text) => write!(f, "{text}"),
            EntryBody::Thinking => write!(f, "{THINKING}"),
            EntryBody::Failed => write!(f, "{BACKEND_FAILURE}"),
            EntryBody::Answer { text, markers } => {
                write!(f, "{text}")?;
                for (i, marker) in markers.iter().enumerate() {
                    write!(f, "\n  [{}] {}", i + 1, marker.label)?;
                    if let Some(snippet) = &marker.snippet {
                        write!(f, "  {snippet}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A question that has been posted to the transcript and now needs an answer.
#[derive(Clone, Debug)]
pub struct PendingQuestion {
    /// The "Thinking..." entry the answer will replace.
    pub placeholder: EntryId,
    pub request: QueryRequest,
}

#[derive(Debug)]
pub struct ChatWidget {
    visibility: Visibility,
    entries: Vec<ChatEntry>,
    /// Placeholder id -> index into `entries`.
    pending: FxHashMap<EntryId, usize>,
    next_id: u64,
    min_gap_secs: f64,
}

impl ChatWidget {
    pub fn new(min_gap_secs: f64) -> Self {
        let mut widget = Self {
            visibility: Visibility::default(),
            entries: Vec::new(),
            pending: FxHashMap::default(),
            next_id: 0,
            min_gap_secs,
        };
        widget.push(Speaker::Notice, EntryBody::Text(WELCOME.to_string()));
        widget
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn toggle(&mut self) -> Visibility {
        self.visibility = self.visibility.flipped();
        self.visibility
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> Option<&ChatEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Posts `question` and a "Thinking..." placeholder. The caller must
    /// already have resolved `video_id`.
    pub fn begin_question(&mut self, video_id: &str, question: &str) -> PendingQuestion {
        self.push(Speaker::You, EntryBody::Text(question.to_string()));
        let placeholder = self.push(Speaker::Bot, EntryBody::Thinking);
        self.pending.insert(placeholder, self.entries.len() - 1);
        debug!(%placeholder, "question posted");

        PendingQuestion {
            placeholder,
            request: QueryRequest::new(video_id, question),
        }
    }

    /// Replaces the placeholder with the final answer or the failure notice.
    /// Returns `false` if `placeholder` is not waiting for an answer.
    pub fn finish(
        &mut self,
        placeholder: EntryId,
        outcome: BackendResult<QueryResponse>,
    ) -> bool {
        let Some(index) = self.pending.remove(&placeholder) else {
            debug!(%placeholder, "ignoring answer for unknown placeholder");
            return false;
        };

        let body = match outcome {
            Ok(reply) => {
                let markers = reply
                    .timestamps
                    .map(|list| timestamps::select(&list, self.min_gap_secs))
                    .unwrap_or_default()
                    .into_iter()
                    .map(Marker::from)
                    .collect();
                EntryBody::Answer {
                    text: reply
                        .answer
                        .filter(|text| !text.is_empty())
                        .unwrap_or_else(|| NO_ANSWER.to_string()),
                    markers,
                }
            }
            Err(_) => EntryBody::Failed,
        };

        let entry = &mut self.entries[index];
        entry.body = body;
        entry.posted_at = Utc::now();
        true
    }

    pub fn marker(&self, entry: EntryId, index: usize) -> Option<&Marker> {
        match &self.entry(entry)?.body {
            EntryBody::Answer { markers, .. } => markers.get(index),
            _ => None,
        }
    }

    /// Most recent answer that rendered at least one marker.
    pub fn latest_with_markers(&self) -> Option<EntryId> {
        self.entries.iter().rev().find_map(|entry| match &entry.body {
            EntryBody::Answer { markers, .. } if !markers.is_empty() => Some(entry.id),
            _ => None,
        })
    }

    fn push(&mut self, speaker: Speaker, body: EntryBody) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(ChatEntry {
            id,
            speaker,
            body,
            posted_at: Utc::now(),
        });
        id
    }
}
