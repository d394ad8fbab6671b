//! Progress reporting from an import task to whoever is watching it.
//!
//! Every line goes to the process log through the `log` facade and, when a
//! consumer is attached, into an unbounded channel that the HTTP handler
//! turns into server-sent events.

use futures::stream::{self, Stream};
use log::Level;
use std::fmt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::{CancellationToken, DropGuard};

const LOG_TARGET: &str = "mealie_import::progress";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A human readable line, already prefixed with its severity
    Message(String),
    /// The import task has finished, successfully or not
    Done,
}

/// Producer half handed to importers and the publisher.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    sender: Option<UnboundedSender<ProgressEvent>>,
    cancel: CancellationToken,
}

impl ProgressSink {
    /// A sink that only writes to the log.
    pub fn detached() -> Self {
        Self {
            sender: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        let message = message.to_string();
        log::log!(target: LOG_TARGET, level, "{}", message);
        if let Some(sender) = &self.sender {
            // A closed channel means nobody is listening any more
            let _ = sender.send(ProgressEvent::Message(format!("{}: {}", level, message)));
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }

    /// Signals the consumer that no more lines will follow.
    pub fn done(&self) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(ProgressEvent::Done);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Consumer half: a finite stream of events ending with `Done`.
///
/// Dropping it cancels the producing import.
pub struct ProgressStream {
    receiver: UnboundedReceiver<ProgressEvent>,
    _cancel_on_drop: DropGuard,
}

impl ProgressStream {
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    /// Yields events up to and including `Done`, or until every sink is gone.
    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut progress = state?;
            let event = progress.next_event().await?;
            let next = if event == ProgressEvent::Done {
                None
            } else {
                Some(progress)
            };
            Some((event, next))
        })
    }
}

/// Creates a connected sink/stream pair for one import.
pub fn channel() -> (ProgressSink, ProgressStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let stream = ProgressStream {
        receiver,
        _cancel_on_drop: cancel.clone().drop_guard(),
    };
    let sink = ProgressSink {
        sender: Some(sender),
        cancel,
    };
    (sink, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_lines_are_tagged_with_level() {
        let (sink, mut stream) = channel();
        sink.info("Loading recipe");
        sink.error("Something broke");

        assert_eq!(
            stream.next_event().await,
            Some(ProgressEvent::Message("INFO: Loading recipe".to_string()))
        );
        assert_eq!(
            stream.next_event().await,
            Some(ProgressEvent::Message("ERROR: Something broke".to_string()))
        );
    }

    #[tokio::test]
    async fn test_stream_stops_after_done() {
        let (sink, stream) = channel();
        sink.warn("careful");
        sink.done();
        sink.info("ignored");

        let events: Vec<_> = stream.into_stream().collect().await;
        assert_eq!(
            events,
            vec![
                ProgressEvent::Message("WARN: careful".to_string()),
                ProgressEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_ends_when_sinks_dropped() {
        let (sink, stream) = channel();
        sink.info("only line");
        drop(sink);

        let events: Vec<_> = stream.into_stream().collect().await;
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_detached_sink_does_not_panic() {
        let sink = ProgressSink::detached();
        sink.info("nobody listens");
        sink.done();
        assert!(!sink.is_cancelled());
    }

    #[test]
    fn test_dropping_stream_cancels_import() {
        let (sink, stream) = channel();
        assert!(!sink.is_cancelled());
        drop(stream);
        assert!(sink.is_cancelled());
        // Lines sent after the consumer left are discarded
        sink.info("still running");
    }

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let (sink, _stream) = channel();
        let clone = sink.clone();
        sink.cancellation_token().cancel();
        assert!(clone.is_cancelled());
    }
}
