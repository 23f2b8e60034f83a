use crate::media::{CaptureDevice, MediaConstraints, MediaStream};
use duet_core::PermissionError;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum LocalMediaState {
    Unrequested,
    Pending,
    Granted(MediaStream),
    Denied(PermissionError),
}

impl LocalMediaState {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        match self {
            Self::Granted(stream) => Some(stream),
            _ => None,
        }
    }
}

/// Owns the local capture stream for the whole participant lifetime.
///
/// The stream survives Room churn: it is acquired once and only released on
/// full teardown. Concurrent `acquire` calls share a single permission prompt.
pub struct LocalMediaSource {
    device: Arc<dyn CaptureDevice>,
    constraints: MediaConstraints,
    state: watch::Sender<LocalMediaState>,
}

impl LocalMediaSource {
    pub fn new(device: Arc<dyn CaptureDevice>, constraints: MediaConstraints) -> Self {
        let (state, _) = watch::channel(LocalMediaState::Unrequested);
        Self {
            device,
            constraints,
            state,
        }
    }

    pub fn state(&self) -> LocalMediaState {
        self.state.borrow().clone()
    }

    pub fn stream(&self) -> Option<MediaStream> {
        self.state.borrow().stream().cloned()
    }

    /// Observe every state transition.
    pub fn subscribe(&self) -> watch::Receiver<LocalMediaState> {
        self.state.subscribe()
    }

    /// Returns the granted stream, prompting at most once for any number of
    /// concurrent callers. A previous denial is re-prompted.
    pub async fn acquire(&self) -> Result<MediaStream, PermissionError> {
        let mut rx = self.state.subscribe();

        loop {
            let mut owner = false;
            let mut granted = None;
            self.state.send_if_modified(|state| match state {
                LocalMediaState::Unrequested | LocalMediaState::Denied(_) => {
                    *state = LocalMediaState::Pending;
                    owner = true;
                    true
                }
                LocalMediaState::Granted(stream) => {
                    granted = Some(stream.clone());
                    false
                }
                LocalMediaState::Pending => false,
            });

            if let Some(stream) = granted {
                return Ok(stream);
            }
            if owner {
                return self.request().await;
            }

            debug!("Capture request already in flight, waiting for it");
            let settled = match rx
                .wait_for(|s| !matches!(s, LocalMediaState::Pending))
                .await
            {
                Ok(state) => state.clone(),
                Err(_) => return Err(PermissionError::DeviceUnavailable),
            };

            match settled {
                LocalMediaState::Granted(stream) => return Ok(stream),
                LocalMediaState::Denied(e) => return Err(e),
                // The in-flight request was abandoned; try to become the owner.
                LocalMediaState::Unrequested | LocalMediaState::Pending => continue,
            }
        }
    }

    async fn request(&self) -> Result<MediaStream, PermissionError> {
        let mut guard = PendingGuard {
            state: &self.state,
            armed: true,
        };

        info!("Requesting local capture stream");
        let result = self.device.request_stream(&self.constraints).await;
        guard.armed = false;

        match result {
            Ok(stream) => {
                let mut installed = false;
                self.state.send_if_modified(|state| {
                    if matches!(state, LocalMediaState::Pending) {
                        *state = LocalMediaState::Granted(stream.clone());
                        installed = true;
                        true
                    } else {
                        false
                    }
                });

                if !installed {
                    debug!("Capture stream released while the prompt was open");
                    self.device.stop(&stream);
                    return Err(PermissionError::DeviceUnavailable);
                }

                info!(
                    "Local capture granted ({} tracks, stream {})",
                    stream.tracks().len(),
                    stream.id()
                );
                Ok(stream)
            }
            Err(e) => {
                warn!("Local capture refused: {}", e);
                self.state.send_replace(LocalMediaState::Denied(e.clone()));
                Err(e)
            }
        }
    }

    /// Stops every track and forgets the stream. Only for full teardown.
    pub fn release(&self) {
        let previous = self.state.send_replace(LocalMediaState::Unrequested);
        if let LocalMediaState::Granted(stream) = previous {
            info!("Releasing local capture stream {}", stream.id());
            self.device.stop(&stream);
        }
    }
}

struct PendingGuard<'a> {
    state: &'a watch::Sender<LocalMediaState>,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.state.send_if_modified(|state| {
            if matches!(state, LocalMediaState::Pending) {
                *state = LocalMediaState::Unrequested;
                true
            } else {
                false
            }
        });
    }
}
