//! Audio backend that hands each verse URL to an external player process
//! (ffplay, mpv, ...). The process exiting cleanly counts as the natural end
//! of the verse; any other exit is a playback failure.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::playback::{AudioBackend, AudioHandle, BackendError, EventSender, PlaybackEvent, Ticket};

/// How often the watcher checks whether the player has exited.
const EXIT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: Vec<String>,
}

impl ProcessBackend {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

/// The child is shared with its exit watcher. `stop` kills it directly, so
/// the process is gone before the next player can be spawned. Dropping the
/// handle stops it too.
pub struct ProcessHandle {
    child: Arc<Mutex<Child>>,
    stopped: Arc<AtomicBool>,
}

impl AudioHandle for ProcessHandle {
    fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.child.lock().start_kill() {
            // already exited and reaped
            debug!(error = %e, "player not killed");
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl AudioBackend for ProcessBackend {
    type Handle = ProcessHandle;

    fn start(
        &mut self,
        url: &str,
        ticket: Ticket,
        events: EventSender,
    ) -> Result<ProcessHandle, BackendError> {
        let (program, args) = self.command.split_first().ok_or(BackendError::NoPlayer)?;
        let child = Command::new(program)
            .args(args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn { program: program.clone(), source })?;
        debug!(%program, %url, ticket, "player spawned");

        let child = Arc::new(Mutex::new(child));
        let stopped = Arc::new(AtomicBool::new(false));
        tokio::spawn(watch_exit(child.clone(), stopped.clone(), ticket, events));

        Ok(ProcessHandle { child, stopped })
    }
}

/// Reaps the player and reports how it ended, unless it was stopped.
async fn watch_exit(
    child: Arc<Mutex<Child>>,
    stopped: Arc<AtomicBool>,
    ticket: Ticket,
    events: EventSender,
) {
    let mut tick = tokio::time::interval(EXIT_POLL);
    let status = loop {
        tick.tick().await;
        let polled = child.lock().try_wait();
        match polled {
            Ok(None) => continue,
            Ok(Some(status)) => break Ok(status),
            Err(e) => break Err(e),
        }
    };

    if stopped.load(Ordering::SeqCst) {
        debug!(ticket, "player killed");
        return;
    }
    let event = match status {
        Ok(s) if s.success() => PlaybackEvent::Finished(ticket),
        Ok(s) => PlaybackEvent::Failed { ticket, reason: format!("player exited with {s}") },
        Err(e) => PlaybackEvent::Failed { ticket, reason: e.to_string() },
    };
    // receiver is gone once the session is closed
    let _ = events.send(event);
}
