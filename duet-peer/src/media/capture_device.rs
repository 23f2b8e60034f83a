use crate::media::{MediaConstraints, MediaStream, MediaTrack, TrackKind};
use async_trait::async_trait;
use duet_core::PermissionError;

/// Access to the platform capture API (`requestStream(constraints)`).
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn request_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, PermissionError>;

    fn stop(&self, stream: &MediaStream) {
        stream.stop();
    }
}

/// Device for headless participants: grants a stream of track descriptors
/// matching the constraints without touching real hardware.
#[derive(Debug, Default, Clone)]
pub struct SyntheticCaptureDevice;

#[async_trait]
impl CaptureDevice for SyntheticCaptureDevice {
    async fn request_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, PermissionError> {
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(MediaTrack::new(TrackKind::Audio, "synthetic microphone"));
        }
        if constraints.video {
            tracks.push(MediaTrack::new(TrackKind::Video, "synthetic camera"));
        }
        if tracks.is_empty() {
            return Err(PermissionError::DeviceUnavailable);
        }
        Ok(MediaStream::new(tracks))
    }
}
