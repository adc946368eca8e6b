//! Presentation side: voice, overlay and error channel.
//!
//! The worker never calls these collaborators directly. It sends `Delivery`
//! messages over a channel, and `Presentation` drains them in order on its own
//! thread.

use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;

use crate::error::PipelineError;
use crate::render::RenderData;

/// Speaks text asynchronously. Scope ends at submitting the utterance.
pub trait VoiceOutput: Send {
    fn speak(&mut self, text: &str);
}

/// Draws overlay geometry. Scope ends at submitting render data.
pub trait Renderer: Send {
    fn render(&mut self, data: &RenderData);
}

/// Receives initialization, reconfiguration and detection failures.
pub trait ErrorSink: Send {
    fn on_error(&mut self, error: &PipelineError);
}

/// One result handed from the worker to the presentation context.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Alert { sequence: u64, text: String },
    Render { sequence: u64, data: RenderData },
    Error { sequence: u64, error: PipelineError },
}

impl Delivery {
    pub fn sequence(&self) -> u64 {
        match self {
            Delivery::Alert { sequence, .. }
            | Delivery::Render { sequence, .. }
            | Delivery::Error { sequence, .. } => *sequence,
        }
    }
}

pub struct Presentation {
    voice: Box<dyn VoiceOutput>,
    renderer: Box<dyn Renderer>,
    errors: Box<dyn ErrorSink>,
}

impl Presentation {
    pub fn new(
        voice: Box<dyn VoiceOutput>,
        renderer: Box<dyn Renderer>,
        errors: Box<dyn ErrorSink>,
    ) -> Self {
        Self {
            voice,
            renderer,
            errors,
        }
    }

    /// Presentation that only writes to the log.
    pub fn logging() -> Self {
        Self::new(
            Box::new(LogVoice),
            Box::new(LogRenderer),
            Box::new(LogErrorSink),
        )
    }

    pub fn dispatch(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Alert { text, .. } => self.voice.speak(&text),
            Delivery::Render { data, .. } => self.renderer.render(&data),
            Delivery::Error { error, .. } => self.errors.on_error(&error),
        }
    }

    /// Drain `rx` on a dedicated thread until every sender is dropped.
    pub fn spawn(mut self, rx: Receiver<Delivery>) -> JoinHandle<u64> {
        std::thread::spawn(move || {
            let mut delivered = 0u64;
            for delivery in rx {
                self.dispatch(delivery);
                delivered += 1;
            }
            delivered
        })
    }
}

pub struct LogVoice;

impl VoiceOutput for LogVoice {
    fn speak(&mut self, text: &str) {
        log::info!("alert: {}", text);
    }
}

pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, data: &RenderData) {
        log::debug!(
            "overlay: {} boxes on {}x{} source (scale {:.2})",
            data.boxes.len(),
            data.source_width,
            data.source_height,
            data.scale
        );
    }
}

pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn on_error(&mut self, error: &PipelineError) {
        log::error!("{}: {}", error.kind(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl VoiceOutput for Journal {
        fn speak(&mut self, text: &str) {
            self.0.lock().unwrap().push(format!("speak:{text}"));
        }
    }

    impl Renderer for Journal {
        fn render(&mut self, data: &RenderData) {
            self.0
                .lock()
                .unwrap()
                .push(format!("render:{}", data.boxes.len()));
        }
    }

    impl ErrorSink for Journal {
        fn on_error(&mut self, error: &PipelineError) {
            self.0.lock().unwrap().push(format!("error:{}", error.kind()));
        }
    }

    #[test]
    fn deliveries_are_dispatched_in_order() {
        let journal = Journal::default();
        let presentation = Presentation::new(
            Box::new(journal.clone()),
            Box::new(journal.clone()),
            Box::new(journal.clone()),
        );
        let (tx, rx) = mpsc::channel();
        let handle = presentation.spawn(rx);

        tx.send(Delivery::Error {
            sequence: 0,
            error: PipelineError::DetectionFailed {
                reason: "boom".to_string(),
            },
        })
        .unwrap();
        tx.send(Delivery::Alert {
            sequence: 1,
            text: "Vehicle 1 on left".to_string(),
        })
        .unwrap();
        tx.send(Delivery::Render {
            sequence: 1,
            data: crate::render::build(&[], 10, 10, crate::render::ViewSize::new(10, 10)),
        })
        .unwrap();
        drop(tx);

        assert_eq!(handle.join().unwrap(), 3);
        assert_eq!(
            *journal.0.lock().unwrap(),
            vec![
                "error:detection_failed".to_string(),
                "speak:Vehicle 1 on left".to_string(),
                "render:0".to_string(),
            ]
        );
    }
}
