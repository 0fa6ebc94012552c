pub mod client;
pub mod config;
pub mod error;
pub mod markdown;
pub mod markup;
pub mod readiness;
pub mod state;
pub mod view;
pub mod widget;

// Re-export main types for convenience
pub use client::{ChatBackend, HttpBackend};
pub use config::{ProbeMode, ScriptTag, Settings, WidgetConfig};
pub use error::WidgetError;
pub use state::{ChatMessage, ChatRole, Transcript};
pub use view::WidgetView;
pub use widget::{ChatWidget, WidgetEvent, WidgetEvents};
