use crate::libs::error::LiveMapError;
use crate::libs::worker::{aggregate, Job};
use crossbeam::channel::{Receiver, Sender, TryRecvError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

pub type JobId = u64;

struct Request {
    id: JobId,
    job: Job,
    reply: Sender<Response>,
}

/// What comes back over the worker boundary; failures travel as plain messages.
#[derive(Debug)]
pub struct Response {
    pub id: JobId,
    pub result: Result<Vec<f64>, String>,
}

/// Handle for one dispatched job. Resolves exactly once.
#[derive(Debug)]
pub struct PendingJob {
    id: JobId,
    reply: Receiver<Response>,
}

impl PendingJob {
    pub fn id(&self) -> JobId {
        self.id
    }
}

#[derive(Debug, PartialEq)]
pub enum Resolution {
    Fresh(Vec<f64>),
    /// A newer job was dispatched before this one came back
    Stale,
}

/// Request/response wrapper around one persistent aggregation thread.
///
/// Jobs run strictly in submission order. There is no cancellation: an old
/// job finishes, and its result is reported as [`Resolution::Stale`] once a
/// newer job id has been handed out.
pub struct ComputeRequestChannel {
    name: String,
    sender: Option<Sender<Request>>,
    handle: Option<JoinHandle<()>>,
    last_dispatched: JobId,
}

impl ComputeRequestChannel {
    pub fn spawn(name: &str) -> anyhow::Result<Self> {
        let (sender, receiver) = crossbeam::channel::unbounded::<Request>();

        let handle = std::thread::Builder::new()
            .name(format!("{}-worker", name))
            .spawn(move || {
                // Receive until the channel closes
                for request in receiver.iter() {
                    let result = catch_unwind(AssertUnwindSafe(|| aggregate(&request.job)))
                        .unwrap_or_else(|_| {
                            Err(LiveMapError::compute("aggregation worker panicked"))
                        })
                        .map_err(|e| match e {
                            LiveMapError::Compute(msg) => msg,
                            other => other.to_string(),
                        });
                    // The caller may have walked away from this job
                    let _ = request.reply.send(Response {
                        id: request.id,
                        result,
                    });
                }
            })?;

        Ok(Self {
            name: name.to_string(),
            sender: Some(sender),
            handle: Some(handle),
            last_dispatched: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the most recently dispatched job, `0` before the first one
    pub fn latest(&self) -> JobId {
        self.last_dispatched
    }

    pub fn dispatch(&mut self, job: Job) -> Result<PendingJob, LiveMapError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| LiveMapError::compute("worker channel is closed"))?;

        let id = self.last_dispatched + 1;
        let (reply, receiver) = crossbeam::channel::bounded(1);
        sender
            .send(Request { id, job, reply })
            .map_err(|_| LiveMapError::compute(format!("{} worker is gone", self.name)))?;
        self.last_dispatched = id;
        log::debug!("{}: dispatched job {}", self.name, id);

        Ok(PendingJob {
            id,
            reply: receiver,
        })
    }

    /// Blocks until `pending` comes back. A job resolves once; asking again
    /// reports the worker as gone.
    pub fn resolve(&self, pending: &PendingJob) -> Result<Resolution, LiveMapError> {
        match pending.reply.recv() {
            Ok(response) => self.accept(pending.id, response),
            Err(_) => Err(LiveMapError::compute(format!(
                "{} worker terminated before job {} finished",
                self.name, pending.id
            ))),
        }
    }

    /// Non-blocking poll; `None` while the job is still running.
    pub fn try_resolve(&self, pending: &PendingJob) -> Option<Result<Resolution, LiveMapError>> {
        match pending.reply.try_recv() {
            Ok(response) => Some(self.accept(pending.id, response)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LiveMapError::compute(format!(
                "{} worker terminated before job {} finished",
                self.name, pending.id
            )))),
        }
    }

    fn accept(&self, expected: JobId, response: Response) -> Result<Resolution, LiveMapError> {
        if response.id != expected {
            return Err(LiveMapError::compute(format!(
                "response for job {} arrived on job {}",
                response.id, expected
            )));
        }
        if response.id < self.last_dispatched {
            log::debug!(
                "{}: dropping job {}, superseded by {}",
                self.name,
                response.id,
                self.last_dispatched
            );
            return Ok(Resolution::Stale);
        }

        response
            .result
            .map(Resolution::Fresh)
            .map_err(LiveMapError::Compute)
    }
}

impl Drop for ComputeRequestChannel {
    fn drop(&mut self) {
        // Close the channel, otherwise the worker never leaves its loop
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Global "working" indicator shown around a compute request.
pub trait BusyIndicator {
    fn show(&self);
    fn hide(&self);
}

/// Indicator that only logs
pub struct LogBusy;

impl BusyIndicator for LogBusy {
    fn show(&self) {
        log::info!("Computing live map...");
    }

    fn hide(&self) {
        log::debug!("Live map computation finished");
    }
}

/// Shows the indicator on creation and hides it on drop, whichever way the
/// request ends.
pub struct BusyGuard<'a> {
    indicator: &'a dyn BusyIndicator,
}

impl<'a> BusyGuard<'a> {
    pub fn new(indicator: &'a dyn BusyIndicator) -> Self {
        indicator.show();
        Self { indicator }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.indicator.hide();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::worker::Mode;
    use std::cell::Cell;

    fn job(threshold: f64) -> Job {
        Job::new(Mode::Contact, 2, &[vec![Some([0.0, 0.0, 0.0]); 2]], threshold).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let mut channel = ComputeRequestChannel::spawn("test").unwrap();
        let pending = channel.dispatch(job(1.0)).unwrap();
        assert_eq!(pending.id(), 1);
        assert_eq!(
            channel.resolve(&pending).unwrap(),
            Resolution::Fresh(vec![1.0; 4])
        );
    }

    #[test]
    fn test_stale_job_is_dropped() {
        let mut channel = ComputeRequestChannel::spawn("test").unwrap();
        let first = channel.dispatch(job(1.0)).unwrap();
        let second = channel.dispatch(job(1.0)).unwrap();
        assert_eq!(channel.latest(), 2);

        assert_eq!(channel.resolve(&first).unwrap(), Resolution::Stale);
        assert!(matches!(
            channel.resolve(&second).unwrap(),
            Resolution::Fresh(_)
        ));
    }

    #[test]
    fn test_failure_surfaces() {
        let mut channel = ComputeRequestChannel::spawn("test").unwrap();
        let pending = channel.dispatch(job(-3.0)).unwrap();
        match channel.resolve(&pending) {
            Err(LiveMapError::Compute(msg)) => assert!(msg.contains("threshold")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_try_resolve_polls() {
        let mut channel = ComputeRequestChannel::spawn("test").unwrap();
        let pending = channel.dispatch(job(1.0)).unwrap();
        let resolution = loop {
            if let Some(r) = channel.try_resolve(&pending) {
                break r;
            }
            std::thread::yield_now();
        };
        assert!(matches!(resolution, Ok(Resolution::Fresh(_))));
    }

    struct Counter {
        shown: Cell<usize>,
        hidden: Cell<usize>,
    }

    impl BusyIndicator for Counter {
        fn show(&self) {
            self.shown.set(self.shown.get() + 1);
        }
        fn hide(&self) {
            self.hidden.set(self.hidden.get() + 1);
        }
    }

    #[test]
    fn test_busy_guard_releases_on_error() {
        let counter = Counter {
            shown: Cell::new(0),
            hidden: Cell::new(0),
        };
        let run = || -> Result<(), LiveMapError> {
            let _busy = BusyGuard::new(&counter);
            Err(LiveMapError::compute("boom"))
        };
        assert!(run().is_err());
        assert_eq!(counter.shown.get(), 1);
        assert_eq!(counter.hidden.get(), 1);
    }
}
