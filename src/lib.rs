//! Ask questions about a YouTube video's transcript and jump to the parts of
//! the video the answer came from.

pub mod assistant;
pub mod backend;
pub mod browser;
pub mod config;
pub mod error;
pub mod js_scripts;
pub mod player;
pub mod timestamps;
pub mod widget;

pub use assistant::{Assistant, Dispatched, WidgetEvent};
pub use backend::{AnswerBackend, QueryRequest, QueryResponse, RagClient};
pub use config::AssistantConfig;
pub use timestamps::{Timestamp, format_time, select};
