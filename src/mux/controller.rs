use std::io;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::utils::Backoff;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, error, info};

use crate::config::SessionConfig;
use crate::error::StartError;
use crate::mux::dispatcher::{MuxDispatcher, SessionStats};

/// Roughly a second of interleaved capture at the default rates, plus
/// control traffic.
const COMMAND_QUEUE_CAPACITY: usize = 256;

const THREAD_NAME: &str = "livemux-dispatch";

enum Command {
    Start(Box<SessionConfig>, Sender<Result<(), StartError>>),
    Stop(Sender<()>),
    PushVideo(Bytes, i64),
    PushAudio(Bytes, i64),
    Stats(Sender<SessionStats>),
    Shutdown,
}

/// Thread confinement for a [`MuxDispatcher`].
///
/// The dispatcher requires exactly one logical owner; the controller makes
/// that owner a dedicated, named thread and turns every cross-thread call
/// into a message on a bounded channel. Capture pushes use `try_send` and
/// drop on a full queue — capture is never blocked by a slow consumer.
/// `start` and `stop` round-trip through one-shot reply channels, so their
/// results are the dispatcher's own.
///
/// Dropping the controller shuts the thread down; any running session is
/// stopped on the way out.
pub struct SessionController {
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SessionController {
    /// Moves `dispatcher` onto its own thread and returns the handle the
    /// rest of the application talks to.
    pub fn spawn(dispatcher: MuxDispatcher) -> io::Result<Self> {
        let (commands, receiver) = bounded(COMMAND_QUEUE_CAPACITY);
        let worker = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(dispatcher, receiver))?;
        Ok(Self {
            commands,
            worker: Some(worker),
        })
    }

    /// Starts an encode session with `config`.
    pub fn start(&self, config: SessionConfig) -> Result<(), StartError> {
        let (reply, response) = bounded(1);
        if self
            .commands
            .send(Command::Start(Box::new(config), reply))
            .is_err()
        {
            return Err(StartError::ControllerStopped);
        }
        response
            .recv()
            .unwrap_or(Err(StartError::ControllerStopped))
    }

    /// Stops the running session, waiting for the final drain and engine
    /// release to finish. Best-effort; a no-op when idle.
    pub fn stop(&self) {
        let (reply, response) = bounded(1);
        if self.commands.send(Command::Stop(reply)).is_ok() {
            let _ = response.recv();
        }
    }

    /// Fire-and-forget raw video input; dropped when the command queue is
    /// full.
    pub fn push_raw_video(&self, data: Bytes, device_ts: i64) {
        match self.commands.try_send(Command::PushVideo(data, device_ts)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("command queue full, video frame dropped"),
            Err(TrySendError::Disconnected(_)) => debug!("dispatcher gone, video frame dropped"),
        }
    }

    /// Fire-and-forget raw audio input; dropped when the command queue is
    /// full.
    pub fn push_raw_audio(&self, data: Bytes, device_ts: i64) {
        match self.commands.try_send(Command::PushAudio(data, device_ts)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("command queue full, audio frame dropped"),
            Err(TrySendError::Disconnected(_)) => debug!("dispatcher gone, audio frame dropped"),
        }
    }

    /// Current session counters; zeros when idle or when the thread is
    /// gone.
    pub fn stats(&self) -> SessionStats {
        let (reply, response) = bounded(1);
        if self.commands.send(Command::Stats(reply)).is_err() {
            return SessionStats::default();
        }
        response.recv().unwrap_or_default()
    }

    /// Stops any running session and joins the dispatcher thread.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("dispatcher thread panicked");
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown_inner();
        }
    }
}

fn run(mut dispatcher: MuxDispatcher, commands: Receiver<Command>) {
    info!("dispatcher thread up");
    let backoff = Backoff::new();
    loop {
        let command = if dispatcher.is_running() {
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            // Nothing to drive; park until the next command.
            backoff.reset();
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        match command {
            Some(Command::Start(config, reply)) => {
                let _ = reply.send(dispatcher.start(&config));
                backoff.reset();
            }
            Some(Command::Stop(reply)) => {
                dispatcher.stop();
                let _ = reply.send(());
            }
            Some(Command::PushVideo(data, device_ts)) => {
                dispatcher.push_raw_video(data, device_ts);
            }
            Some(Command::PushAudio(data, device_ts)) => {
                dispatcher.push_raw_audio(data, device_ts);
            }
            Some(Command::Stats(reply)) => {
                let _ = reply.send(dispatcher.stats());
            }
            Some(Command::Shutdown) => break,
            None => {
                if dispatcher.drive() > 0 {
                    backoff.reset();
                } else {
                    backoff.snooze();
                }
            }
        }
    }
    dispatcher.stop();
    info!("dispatcher thread down");
}
