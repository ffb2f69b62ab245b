// src/assistant.rs

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::backend::AnswerBackend;
use crate::error::{AssistantError, PlayerError};
use crate::player::{VideoPlayer, VideoSource};
use crate::widget::{ChatWidget, EntryId, Visibility};

/// Everything the host can ask the widget to do.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetEvent {
    ToggleRequested,
    SubmitRequested { question: String },
    MarkerSelected { entry: EntryId, marker: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Dispatched {
    Toggled(Visibility),
    /// Blank question; nothing was posted.
    Ignored,
    /// The placeholder now holds the final answer or the failure notice.
    Answered(EntryId),
    Seeked { start: f64 },
    /// The page had no video to seek.
    NoPlayer,
}

/// Owns the widget state and the collaborators it talks to.
pub struct Assistant {
    widget: Mutex<ChatWidget>,
    backend: Arc<dyn AnswerBackend>,
    source: Arc<dyn VideoSource>,
    player: Arc<dyn VideoPlayer>,
}

impl Assistant {
    pub fn new(
        min_gap_secs: f64,
        backend: Arc<dyn AnswerBackend>,
        source: Arc<dyn VideoSource>,
        player: Arc<dyn VideoPlayer>,
    ) -> Self {
        Self {
            widget: Mutex::new(ChatWidget::new(min_gap_secs)),
            backend,
            source,
            player,
        }
    }

    pub fn widget(&self) -> &Mutex<ChatWidget> {
        &self.widget
    }

    pub async fn dispatch(&self, event: WidgetEvent) -> Result<Dispatched, AssistantError> {
        debug!(?event, "dispatching");
        match event {
            WidgetEvent::ToggleRequested => Ok(Dispatched::Toggled(self.widget.lock().await.toggle())),
            WidgetEvent::SubmitRequested { question } => self.submit(&question).await,
            WidgetEvent::MarkerSelected { entry, marker } => self.seek(entry, marker).await,
        }
    }

    async fn submit(&self, question: &str) -> Result<Dispatched, AssistantError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(Dispatched::Ignored);
        }

        let video_id = self
            .source
            .video_id()
            .await
            .ok_or(AssistantError::MissingVideoId)?;

        let pending = self.widget.lock().await.begin_question(&video_id, question);

        // The lock is released while the request is in flight.
        let outcome = self.backend.query(&pending.request).await;
        if let Err(err) = &outcome {
            error!(%video_id, "backend request failed: {err}");
        }

        self.widget.lock().await.finish(pending.placeholder, outcome);
        Ok(Dispatched::Answered(pending.placeholder))
    }

    async fn seek(&self, entry: EntryId, marker: usize) -> Result<Dispatched, AssistantError> {
        let start = self
            .widget
            .lock()
            .await
            .marker(entry, marker)
            .map(|m| m.start)
            .ok_or(AssistantError::UnknownMarker { entry, marker })?;

        let played = match self.player.seek(start).await {
            Ok(()) => self.player.play().await,
            Err(err) => Err(err),
        };

        match played {
            Ok(()) => Ok(Dispatched::Seeked { start }),
            Err(PlayerError::Unavailable) => {
                debug!(start, "no video element, seek skipped");
                Ok(Dispatched::NoPlayer)
            }
            Err(err) => Err(err.into()),
        }
    }
}
