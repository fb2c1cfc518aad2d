//! Trailing-edge autosave debouncer.
//!
//! Every [`Debouncer::push`] folds the value into the pending one and
//! re-arms the timer; the save runs once the value has been left alone for
//! the full delay. [`Debouncer::spawn`] keeps only the last value of a
//! burst, [`Debouncer::spawn_merging`] combines the whole burst.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

enum Command<T> {
    Push(T),
    Flush(oneshot::Sender<()>),
}

/// Handle to a background debounce loop.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debounce loop. `save` is called with the last value after
    /// `delay` of inactivity; failures are logged and dropped.
    pub fn spawn<F, Fut>(delay: Duration, save: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ClientError>> + Send,
    {
        Self::spawn_merging(delay, |pending: &mut T, value| *pending = value, save)
    }

    /// Like [`Debouncer::spawn`], but a push while a value is pending is
    /// folded into it with `merge` instead of replacing it.
    pub fn spawn_merging<M, F, Fut>(delay: Duration, mut merge: M, mut save: F) -> Self
    where
        M: FnMut(&mut T, T) + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ClientError>> + Send,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command<T>>();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        if pending.take().is_some() {
                            tracing::debug!("Autosave cancelled with a pending change");
                        }
                        break;
                    }
                    command = rx.recv() => match command {
                        Some(Command::Push(value)) => {
                            match pending.as_mut() {
                                Some(current) => merge(current, value),
                                None => pending = Some(value),
                            }
                            sleep.as_mut().reset(Instant::now() + delay);
                        }
                        Some(Command::Flush(done)) => {
                            if let Some(value) = pending.take() {
                                run_save(&mut save, value).await;
                            }
                            let _ = done.send(());
                        }
                        None => {
                            if let Some(value) = pending.take() {
                                run_save(&mut save, value).await;
                            }
                            break;
                        }
                    },
                    _ = &mut sleep, if pending.is_some() => {
                        if let Some(value) = pending.take() {
                            run_save(&mut save, value).await;
                        }
                    }
                }
            }
        });

        Self { tx, cancel, handle }
    }

    /// Fold `value` into the pending one and restart the delay.
    pub fn push(&self, value: T) {
        if self.tx.send(Command::Push(value)).is_err() {
            tracing::debug!("Autosave loop has stopped; change dropped");
        }
    }

    /// Save the pending value now, if there is one.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Stop the loop and discard any pending value.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the loop after saving any pending value.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Autosave loop panicked");
        }
    }
}

async fn run_save<T, F, Fut>(save: &mut F, value: T)
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), ClientError>>,
{
    if let Err(e) = save(value).await {
        tracing::warn!(error = %e, "Autosave failed");
    }
}
