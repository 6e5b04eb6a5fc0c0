//! # Conversion Events
//!
//! A conversion reports through one ordered stream:
//!
//! ```text
//! Started, Progress("frame=12 fps=25 ..."), ..., Finished(Ok(()) | Err(..))
//! ```
//!
//! `Started` appears only if ffmpeg was actually spawned. `Finished` is always
//! the last item and the stream closes right after it, so a consumer can tell
//! a failed run from a clean one without looking anywhere else. Every event
//! also renders as a plain status string (`Display`).

use crate::error::ConversionFailure;
use futures::Stream;
use serde::Serialize;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Status string of the first event of every started conversion
pub const STARTED_MESSAGE: &str = "Converting started";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionEvent {
    /// ffmpeg is running
    Started,
    /// One normalized line (or legacy stats group) from ffmpeg's stderr
    Progress(String),
    /// ffmpeg is gone and its stderr is exhausted
    Finished(Result<(), ConversionFailure>),
}

impl ConversionEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// Failure carried by a terminal event, if any
    pub fn failure(&self) -> Option<&ConversionFailure> {
        match self {
            Self::Finished(Err(failure)) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for ConversionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str(STARTED_MESSAGE),
            Self::Progress(line) => f.write_str(line),
            Self::Finished(Ok(())) => f.write_str("Converting finished"),
            Self::Finished(Err(failure)) => write!(f, "Converting failed: {}", failure),
        }
    }
}

/// JSON line form of an event, for programmatic consumers
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonEvent<'a> {
    #[serde(rename = "started")]
    Started { message: &'a str },

    #[serde(rename = "progress")]
    Progress { line: &'a str },

    #[serde(rename = "finished")]
    Finished {
        success: bool,
        error: Option<String>,
    },
}

impl<'a> From<&'a ConversionEvent> for JsonEvent<'a> {
    fn from(event: &'a ConversionEvent) -> Self {
        match event {
            ConversionEvent::Started => Self::Started {
                message: STARTED_MESSAGE,
            },
            ConversionEvent::Progress(line) => Self::Progress { line },
            ConversionEvent::Finished(outcome) => Self::Finished {
                success: outcome.is_ok(),
                error: outcome.as_ref().err().map(ToString::to_string),
            },
        }
    }
}

impl JsonEvent<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Receiving end of a conversion; ends after `Finished`
///
/// Keep reading until `None`. Dropping it early is allowed: the supervisor
/// keeps draining ffmpeg's stderr so the process still runs to completion.
#[derive(Debug)]
pub struct ConversionEvents {
    inner: ReceiverStream<ConversionEvent>,
}

impl ConversionEvents {
    pub(crate) fn new(rx: mpsc::Receiver<ConversionEvent>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Next event, or `None` once the stream is closed
    pub async fn recv(&mut self) -> Option<ConversionEvent> {
        self.inner.next().await
    }

    /// Drain the whole stream
    pub async fn collect_all(mut self) -> Vec<ConversionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for ConversionEvents {
    type Item = ConversionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
