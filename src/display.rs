//! Display surface: where a turn's output goes.

use std::path::{Path, PathBuf};

/// Output boundary of the assistant.
///
/// Receives whole answers, streamed fragments, artifact paths, and terse
/// user-facing notices. Diagnostics never go here; they go to `tracing`.
pub trait DisplaySurface {
    /// A complete text block.
    fn show_text(&mut self, text: &str);

    /// One fragment of a streamed answer, shown as soon as it arrives.
    fn show_fragment(&mut self, fragment: &str);

    /// The streamed answer is complete.
    fn finish_stream(&mut self) {}

    /// An artifact (image file) produced by a tool.
    fn show_artifact(&mut self, path: &Path);

    /// A short user-facing notice, e.g. a generic failure message.
    fn show_notice(&mut self, notice: &str);
}

/// One call made on a [`RecordingDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Text(String),
    Fragment(String),
    StreamFinished,
    Artifact(PathBuf),
    Notice(String),
}

/// A [`DisplaySurface`] that records everything shown to it.
#[derive(Debug, Default, Clone)]
pub struct RecordingDisplay {
    pub events: Vec<DisplayEvent>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenation of all text blocks and fragments.
    pub fn rendered_text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Text(t) | DisplayEvent::Fragment(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn artifacts(&self) -> Vec<&Path> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Artifact(p) => Some(p.as_path()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Notice(n) => Some(n.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySurface for RecordingDisplay {
    fn show_text(&mut self, text: &str) {
        self.events.push(DisplayEvent::Text(text.to_string()));
    }

    fn show_fragment(&mut self, fragment: &str) {
        self.events.push(DisplayEvent::Fragment(fragment.to_string()));
    }

    fn finish_stream(&mut self) {
        self.events.push(DisplayEvent::StreamFinished);
    }

    fn show_artifact(&mut self, path: &Path) {
        self.events.push(DisplayEvent::Artifact(path.to_path_buf()));
    }

    fn show_notice(&mut self, notice: &str) {
        self.events.push(DisplayEvent::Notice(notice.to_string()));
    }
}
