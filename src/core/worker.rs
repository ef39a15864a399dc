// src/core/worker.rs
use crate::config::EngineConfig;
use crate::core::dictionary::RawDictionary;
use crate::core::index::{BuildProgress, IndexBuilder, SuffixIndex};
use crate::error::{Result, RhymeError};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Messages posted by a background build.
#[derive(Debug)]
pub enum BuildMessage {
    Progress(BuildProgress),
    Finished(Arc<SuffixIndex>),
}

/// Handle on an index build running on its own thread.
pub struct BuildHandle {
    receiver: Receiver<BuildMessage>,
    thread: Option<JoinHandle<()>>,
}

/// Starts building `source` on a dedicated thread. The thread yields between
/// batches and reports each one; the index only appears in the final message.
pub fn spawn_index_build(source: RawDictionary, config: EngineConfig) -> BuildHandle {
    let (sender, receiver) = channel();
    let thread = thread::spawn(move || {
        let mut builder = IndexBuilder::new(source, &config);
        while !builder.is_finished() {
            let progress = builder.step();
            if sender.send(BuildMessage::Progress(progress)).is_err() {
                // Nobody is listening any more.
                return;
            }
            thread::yield_now();
        }
        let _ = sender.send(BuildMessage::Finished(Arc::new(builder.finish())));
    });
    BuildHandle { receiver, thread: Some(thread) }
}

impl BuildHandle {
    /// Next message if one is waiting. `Ok(None)` while the build is busy.
    pub fn poll(&self) -> Result<Option<BuildMessage>> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RhymeError::WorkerDisconnected),
        }
    }

    /// Blocks until the index is ready, forwarding progress to `on_progress`.
    pub fn wait(mut self, mut on_progress: impl FnMut(BuildProgress)) -> Result<Arc<SuffixIndex>> {
        let outcome = loop {
            match self.receiver.recv() {
                Ok(BuildMessage::Progress(progress)) => on_progress(progress),
                Ok(BuildMessage::Finished(index)) => break Ok(index),
                Err(_) => break Err(RhymeError::WorkerDisconnected),
            }
        };
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        outcome
    }
}
