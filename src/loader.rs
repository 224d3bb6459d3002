//! Background model loading.
//!
//! The loader closure runs on a worker thread and hands its result back
//! through a channel. Dropping the loader drops the receiver, so a load
//! that completes after teardown has nowhere to deliver and is discarded.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, error};

use crate::error::{GestureError, Result};

type LoadFn<T> = Box<dyn FnOnce() -> Result<T> + Send + 'static>;

/// Result of polling a loader.
#[derive(Debug)]
pub enum LoadStatus<T> {
    Pending,
    Loaded(T),
    Failed(GestureError),
}

enum State<T> {
    NotStarted(LoadFn<T>),
    Ready(T),
    Loading(Receiver<Result<T>>),
    Done,
}

pub struct ModelLoader<T> {
    state: State<T>,
}

impl<T: Send + 'static> ModelLoader<T> {
    /// Loader that runs `load` on a worker thread once started.
    pub fn new<F>(load: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self {
            state: State::NotStarted(Box::new(load)),
        }
    }

    /// Loader whose value is already available.
    pub fn ready(value: T) -> Self {
        Self {
            state: State::Ready(value),
        }
    }

    pub fn start(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Done);
        self.state = match state {
            State::NotStarted(load) => {
                let (tx, rx) = mpsc::channel();
                let spawned = thread::Builder::new().name("model-load".to_string()).spawn(move || {
                    let result = load();
                    if tx.send(result).is_err() {
                        debug!("model load finished after teardown; discarding");
                    }
                });
                match spawned {
                    Ok(_) => State::Loading(rx),
                    Err(e) => {
                        error!("failed to spawn model loader: {}", e);
                        let (tx, rx) = mpsc::channel();
                        let _ = tx.send(Err(GestureError::model(format!("failed to spawn loader: {e}"))));
                        State::Loading(rx)
                    }
                }
            }
            other => other,
        };
    }

    /// Non-blocking check. `Loaded`/`Failed` are returned once.
    pub fn poll(&mut self) -> LoadStatus<T> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Ready(value) => LoadStatus::Loaded(value),
            State::Loading(rx) => match rx.try_recv() {
                Ok(Ok(value)) => LoadStatus::Loaded(value),
                Ok(Err(e)) => LoadStatus::Failed(e),
                Err(TryRecvError::Empty) => {
                    self.state = State::Loading(rx);
                    LoadStatus::Pending
                }
                Err(TryRecvError::Disconnected) => {
                    LoadStatus::Failed(GestureError::model("model loader exited without a result"))
                }
            },
            State::NotStarted(load) => {
                self.state = State::NotStarted(load);
                LoadStatus::Pending
            }
            State::Done => LoadStatus::Pending,
        }
    }
}
