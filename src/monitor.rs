use crate::decoder::TransferDecoder;
use crate::error::MonitorError;
use crate::filter::EventFilter;
use crate::reporter::Reporter;
use crate::source::{LogSource, LogStream};
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Cancelled,
    /// The source had nothing more to deliver.
    Exhausted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Listening,
    Terminated(Termination),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reported: u64,
    pub skipped: u64,
    /// `None` while the run is still going.
    pub termination: Option<Termination>,
}

/// Requests that a running monitor stop.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        CancelSignal(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the handle is gone.
    pub async fn cancelled(&mut self) {
        let closed = self.0.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Decodes and reports every entry a log source yields.
pub struct Monitor<R> {
    decoder: TransferDecoder,
    reporter: R,
    state: MonitorState,
    summary: RunSummary,
}

impl<R: Reporter> Monitor<R> {
    pub fn new(decoder: TransferDecoder, reporter: R) -> Self {
        Monitor {
            decoder,
            reporter,
            state: MonitorState::Idle,
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    pub async fn run<S>(
        &mut self,
        source: &S,
        filter: &EventFilter,
        mut cancel: CancelSignal,
    ) -> Result<RunSummary, MonitorError>
    where
        S: LogSource + ?Sized,
    {
        self.summary = RunSummary::default();

        let opened = tokio::select! {
            biased;

            _ = cancel.cancelled() => None,
            opened = source.open(filter) => Some(opened),
        };

        match opened {
            Some(Ok(entries)) => self.consume(entries, cancel).await,
            Some(Err(e)) => Err(self.fail(e)),
            None => {
                info!("Cancelled before the log source was open");
                Ok(self.finish(Termination::Cancelled))
            }
        }
    }

    /// Drives an already opened stream until it ends, fails or is cancelled.
    pub async fn consume(
        &mut self,
        mut entries: LogStream,
        mut cancel: CancelSignal,
    ) -> Result<RunSummary, MonitorError> {
        self.state = MonitorState::Listening;
        self.summary = RunSummary::default();
        info!("Listening for transfers");

        let termination = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break Termination::Cancelled,

                next = entries.next() => match next {
                    Some(Ok(entry)) => {
                        if entry.removed {
                            warn!(
                                "Log at block {:?} was removed by a reorg, reporting as delivered",
                                entry.block_number
                            );
                        }
                        match self.decoder.decode(&entry) {
                            Ok(record) => {
                                self.reporter.report(&record);
                                self.summary.reported += 1;
                            }
                            Err(e) => {
                                warn!("Skipping log from tx {:?}: {}", entry.transaction_hash, e);
                                self.summary.skipped += 1;
                            }
                        }
                    }
                    Some(Err(e)) if e.is_fatal() => return Err(self.fail(e)),
                    Some(Err(e)) => {
                        warn!("Skipping log: {}", e);
                        self.summary.skipped += 1;
                    }
                    None => break Termination::Exhausted,
                },
            }
        };

        Ok(self.finish(termination))
    }

    fn finish(&mut self, termination: Termination) -> RunSummary {
        self.state = MonitorState::Terminated(termination);
        self.summary.termination = Some(termination);
        debug!("Monitor terminated: {:?}", termination);
        info!(
            "Reported {} transfers, skipped {} malformed logs",
            self.summary.reported, self.summary.skipped
        );
        self.summary
    }

    fn fail(&mut self, error: MonitorError) -> MonitorError {
        self.state = MonitorState::Terminated(Termination::Failed);
        self.summary.termination = Some(Termination::Failed);
        error
    }
}
