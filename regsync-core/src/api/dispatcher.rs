// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Task Dispatcher
//!
//! One FIFO queue and one worker thread per [`Subsystem`]. A worker handles
//! its tasks one at a time, in delivery order, so a reconciler never runs
//! concurrently with itself while different subsystems proceed in parallel.
//!
//! Follow-up work is routed to the owning subsystem's queue. Delayed
//! follow-ups (retries) wait inside that subsystem's worker until they are
//! due, so shutting down the workers also drops every pending retry.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{self as channel, select, Receiver, Sender};

use super::engine::SyncEngine;
use super::error::{RegSyncError, RegSyncResult};
use super::tasks::{FollowUp, Subsystem, SyncTask, TaskSink};

enum Message {
    Run {
        task: SyncTask,
        attempt: u32,
    },
    RunAt {
        task: SyncTask,
        attempt: u32,
        due: Instant,
    },
    Stop,
}

/// Cloneable handle that routes tasks to their subsystem's queue.
#[derive(Clone)]
pub struct TaskQueue {
    channel: Sender<Message>,
    named_user: Sender<Message>,
    tag_groups: Sender<Message>,
    stopped: Arc<AtomicBool>,
}

impl TaskQueue {
    fn sender(&self, subsystem: Subsystem) -> &Sender<Message> {
        match subsystem {
            Subsystem::Channel => &self.channel,
            Subsystem::NamedUser => &self.named_user,
            Subsystem::TagGroups => &self.tag_groups,
        }
    }

    fn send(&self, subsystem: Subsystem, message: Message) -> RegSyncResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(RegSyncError::ShutDown);
        }
        self.sender(subsystem)
            .send(message)
            .map_err(|_| RegSyncError::ShutDown)
    }

    fn schedule(&self, follow_up: FollowUp) {
        let FollowUp {
            task,
            attempt,
            delay,
        } = follow_up;

        let subsystem = task.subsystem();
        let message = if delay.is_zero() {
            Message::Run { task, attempt }
        } else {
            Message::RunAt {
                task,
                attempt,
                due: Instant::now() + delay,
            }
        };
        if let Err(e) = self.send(subsystem, message) {
            tracing::debug!(error = %e, "dropping follow-up task");
        }
    }
}

impl TaskSink for TaskQueue {
    fn submit(&self, task: SyncTask) -> RegSyncResult<()> {
        let subsystem = task.subsystem();
        tracing::debug!(task = task.kind(), %subsystem, "task submitted");
        self.send(subsystem, Message::Run { task, attempt: 0 })
    }
}

/// Owns the per-subsystem workers.
pub struct Dispatcher {
    queue: TaskQueue,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Starts one worker per subsystem.
    pub fn start(engine: Arc<SyncEngine>) -> RegSyncResult<Self> {
        let (channel_tx, channel_rx) = channel::unbounded();
        let (named_user_tx, named_user_rx) = channel::unbounded();
        let (tag_groups_tx, tag_groups_rx) = channel::unbounded();

        let queue = TaskQueue {
            channel: channel_tx,
            named_user: named_user_tx,
            tag_groups: tag_groups_tx,
            stopped: Arc::new(AtomicBool::new(false)),
        };

        let mut dispatcher = Dispatcher {
            queue,
            workers: Vec::with_capacity(Subsystem::ALL.len()),
        };

        for (subsystem, rx) in [
            (Subsystem::Channel, channel_rx),
            (Subsystem::NamedUser, named_user_rx),
            (Subsystem::TagGroups, tag_groups_rx),
        ] {
            let engine = engine.clone();
            let queue = dispatcher.queue.clone();
            let handle = thread::Builder::new()
                .name(format!("regsync-{}", subsystem))
                .spawn(move || run_worker(subsystem, rx, engine, queue))
                .map_err(|e| RegSyncError::Worker(e.to_string()))?;
            dispatcher.workers.push(handle);
        }

        Ok(dispatcher)
    }

    /// Handle for submitting tasks.
    pub fn queue(&self) -> TaskQueue {
        self.queue.clone()
    }

    /// Enqueues `task`.
    pub fn submit(&self, task: SyncTask) -> RegSyncResult<()> {
        self.queue.submit(task)
    }

    /// Stops accepting work, lets each worker finish what is already queued,
    /// and joins the workers. Retries that are not yet due are dropped.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queue.stopped.store(true, Ordering::SeqCst);

        for subsystem in Subsystem::ALL {
            let _ = self.queue.sender(subsystem).send(Message::Stop);
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("sync worker panicked");
            }
        }
        tracing::debug!("dispatcher shut down");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A follow-up waiting for its due time. Ordered by due time, then by
/// arrival.
struct Delayed {
    due: Instant,
    seq: u64,
    task: SyncTask,
    attempt: u32,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

fn run_worker(
    subsystem: Subsystem,
    rx: Receiver<Message>,
    engine: Arc<SyncEngine>,
    queue: TaskQueue,
) {
    tracing::debug!(%subsystem, "sync worker started");

    let run = |task: SyncTask, attempt: u32| {
        for follow_up in engine.handle(task, attempt) {
            queue.schedule(follow_up);
        }
    };

    let mut delayed: BinaryHeap<Reverse<Delayed>> = BinaryHeap::new();
    let mut seq = 0u64;

    loop {
        let timer = match delayed.peek() {
            Some(Reverse(next)) => channel::at(next.due),
            None => channel::never(),
        };

        let running = select! {
            recv(rx) -> message => match message {
                Ok(Message::Run { task, attempt }) => {
                    run(task, attempt);
                    true
                }
                Ok(Message::RunAt { task, attempt, due }) => {
                    seq += 1;
                    delayed.push(Reverse(Delayed { due, seq, task, attempt }));
                    true
                }
                Ok(Message::Stop) | Err(_) => false,
            },
            recv(timer) -> _ => {
                if let Some(Reverse(next)) = delayed.pop() {
                    run(next.task, next.attempt);
                }
                true
            }
        };
        if !running {
            break;
        }
    }

    if !delayed.is_empty() {
        tracing::debug!(%subsystem, dropped = delayed.len(), "dropping pending retries");
    }
    tracing::debug!(%subsystem, "sync worker stopped");
}
