// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Page lifecycle signals and the debounced driver that turns them into
//! injection attempts.
//!
//! Load and DOM-ready signals trigger an evaluation at once. Mutation
//! signals are coalesced on the trailing edge: every new mutation restarts
//! the quiet period, and a single evaluation runs once the page has been
//! quiet for the whole window.

use std::{future::Future, time::Duration};

use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tracing::{debug, trace};

/// Notification delivered by the page host.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum PageSignal
{
    /// Initial page load finished.
    Loaded,
    /// The document finished parsing.
    DomReady,
    /// Nodes were added or removed somewhere in the body subtree.
    Mutated,
}

/// Trailing-edge debouncer over a stream of [`PageSignal`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct MutationDebouncer
{
    window: Duration,
}

impl MutationDebouncer
{
    /// Creates a debouncer with the given quiet period.
    pub fn new(window: Duration,) -> Self
    {
        Self {
            window,
        }
    }

    /// The quiet period applied to mutation signals.
    pub fn window(&self,) -> Duration
    {
        self.window
    }

    /// Consumes `signals`, awaiting `evaluate` for each triggered attempt.
    ///
    /// Returns the number of evaluations once the channel closes. A
    /// mutation still waiting for its quiet period is flushed before
    /// returning.
    pub async fn run<F, Fut,>(&self, mut signals: mpsc::Receiver<PageSignal,>, mut evaluate: F,) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = (),>,
    {
        let mut pending: Option<Instant,> = None;
        let mut evaluations = 0;

        loop {
            let signal = match pending {
                Some(deadline,) => {
                    tokio::select! {
                        signal = signals.recv() => signal,
                        () = sleep_until(deadline) => {
                            pending = None;
                            debug!("page quiet for {}ms, evaluating", self.window.as_millis());
                            evaluate().await;
                            evaluations += 1;
                            continue;
                        }
                    }
                }
                None => signals.recv().await,
            };

            match signal {
                Some(PageSignal::Mutated,) => {
                    trace!("mutation observed, restarting quiet period");
                    pending = Some(Instant::now() + self.window,);
                }
                Some(signal,) => {
                    debug!("{:?} signal, evaluating", signal);
                    evaluate().await;
                    evaluations += 1;
                }
                None => {
                    if pending.take().is_some() {
                        evaluate().await;
                        evaluations += 1;
                    }
                    debug!("signal channel closed after {} evaluations", evaluations);
                    return evaluations;
                }
            }
        }
    }
}
