//! Worker-side sink for records and progress.

use curvature_core::{OutputLog, OutputRecord, Stage};
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::{PipelineMessage, ProgressEvent};
use crate::state::RunResult;

/// Sends messages over the bounded channel and keeps the record log the
/// run digest is computed from.
///
/// Must run outside of an async context: a full channel blocks the caller.
pub(crate) struct Emitter {
    tx: mpsc::Sender<PipelineMessage>,
    log: OutputLog,
    percent: u8,
    closed: bool,
}

impl Emitter {
    pub(crate) fn new(tx: mpsc::Sender<PipelineMessage>) -> Self {
        Self {
            tx,
            log: OutputLog::new(),
            percent: 0,
            closed: false,
        }
    }

    pub(crate) fn record(&mut self, record: OutputRecord) {
        self.log.push(record.clone());
        self.send(PipelineMessage::Record(record));
    }

    pub(crate) fn records(&mut self, records: impl IntoIterator<Item = OutputRecord>) {
        for record in records {
            self.record(record);
        }
    }

    /// Clamped to `0..=100` and to the last value sent; repeats are dropped.
    pub(crate) fn progress(&mut self, stage: Stage, percent: u8) {
        let percent = percent.min(100);
        if percent <= self.percent {
            return;
        }
        self.percent = percent;
        self.send(PipelineMessage::Progress(ProgressEvent { stage, percent }));
    }

    pub(crate) fn log(&self) -> &OutputLog {
        &self.log
    }

    pub(crate) fn finish(mut self, result: RunResult) {
        self.send(PipelineMessage::Terminal(Box::new(result)));
    }

    fn send(&mut self, message: PipelineMessage) {
        if self.closed {
            return;
        }
        if self.tx.blocking_send(message).is_err() {
            debug!("message receiver dropped");
            self.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<PipelineMessage>) -> Vec<PipelineMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    #[test]
    fn test_progress_is_monotonic() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut emitter = Emitter::new(tx);
        emitter.progress(Stage::Input, 1);
        emitter.progress(Stage::Christoffel, 40);
        emitter.progress(Stage::Christoffel, 35);
        emitter.progress(Stage::Christoffel, 40);
        emitter.progress(Stage::Divergence, 250);

        let percents: Vec<u8> = drain(&mut rx)
            .into_iter()
            .filter_map(|m| match m {
                PipelineMessage::Progress(p) => Some(p.percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![1, 40, 100]);
    }

    #[test]
    fn test_records_are_logged_in_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut emitter = Emitter::new(tx);
        emitter.records([
            OutputRecord::diagnostic("a"),
            OutputRecord::diagnostic("b"),
        ]);
        assert_eq!(emitter.log().len(), 2);

        let texts: Vec<String> = drain(&mut rx)
            .iter()
            .filter_map(|m| m.as_record().map(|r| r.to_string()))
            .collect();
        assert_eq!(texts, vec!["# a", "# b"]);
    }

    #[test]
    fn test_dropped_receiver_keeps_logging() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut emitter = Emitter::new(tx);
        emitter.record(OutputRecord::diagnostic("lost"));
        emitter.record(OutputRecord::diagnostic("also lost"));
        assert_eq!(emitter.log().len(), 2);
    }
}
