// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background offload for the encode/write and read/decode phases.

use crossbeam_channel::{Receiver, TryRecvError};
use keepsake_core::{Result, SavegameError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cancellation flag observed by a background job.
#[derive(Debug, Clone, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a completion check.
pub(crate) enum TaskPoll<T> {
    Pending,
    Done(Result<T>),
}

/// A job running on its own thread, checked at a fixed wall-clock interval.
pub(crate) struct BackgroundTask<T> {
    receiver: Receiver<Result<T>>,
    cancel: CancelToken,
    poll_interval: Duration,
    next_poll: Instant,
}

impl<T: Send + 'static> BackgroundTask<T> {
    /// Starts `job` on a named thread.
    pub(crate) fn spawn<F>(label: &str, poll_interval: Duration, job: F) -> Result<Self>
    where
        F: FnOnce(&CancelToken) -> Result<T> + Send + 'static,
    {
        let (tx, receiver) = crossbeam_channel::bounded(1);
        let cancel = CancelToken::default();
        let token = cancel.clone();

        thread::Builder::new()
            .name(format!("keepsake-{label}"))
            .spawn(move || {
                let outcome = job(&token);
                if tx.send(outcome).is_err() {
                    log::debug!("Background savegame task finished after its owner went away.");
                }
            })?;

        Ok(Self {
            receiver,
            cancel,
            poll_interval,
            next_poll: Instant::now() + poll_interval,
        })
    }

    /// Checks for completion, at most once per poll interval.
    pub(crate) fn poll(&mut self, now: Instant) -> TaskPoll<T> {
        if now < self.next_poll {
            return TaskPoll::Pending;
        }
        self.next_poll = now + self.poll_interval;

        match self.receiver.try_recv() {
            Ok(outcome) => TaskPoll::Done(outcome),
            Err(TryRecvError::Empty) => TaskPoll::Pending,
            Err(TryRecvError::Disconnected) => TaskPoll::Done(Err(SavegameError::Task(
                "worker thread stopped without a result".into(),
            ))),
        }
    }

    /// Asks the job to stop at its next checkpoint and stops waiting for it.
    pub(crate) fn abandon(self) {
        self.cancel.cancel();
    }
}
