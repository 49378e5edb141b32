use crate::error::LinkError;
use crate::head_pose::derive_pose;
use crate::payload;
use crate::transport::Transport;
use crate::types::{Frame, Landmarks, PoseAngles};
use anyhow::Result;

/// Produces frames in capture order. An `Err` means the stream has ended.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame>;
}

/// Turns a frame into the landmarks of at most one face
pub trait LandmarkExtractor {
    fn name(&self) -> String;
    fn detect(&mut self, frame: &Frame) -> Result<Option<Landmarks>>;
}

/// What one pass through the loop did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    EndOfStream,
    NoFace,
    Sent(PoseAngles),
    SendFailed(PoseAngles),
}

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub faces: u64,
    pub sent: u64,
    pub send_failures: u64,
}

/// Capture -> landmarks -> pose -> datagram, one frame at a time.
///
/// Owns the camera and the socket; both are released when the pipeline is
/// dropped, which `run` guarantees on every return path.
pub struct Pipeline<S, E, T> {
    source: S,
    extractor: E,
    transport: T,
    max_send_failures: u32,
    consecutive_failures: u32,
    summary: RunSummary,
}

impl<S, E, T> Pipeline<S, E, T>
where
    S: FrameSource,
    E: LandmarkExtractor,
    T: Transport,
{
    /// `max_send_failures` of 0 never gives up on the transport.
    pub fn new(source: S, extractor: E, transport: T, max_send_failures: u32) -> Self {
        Self {
            source,
            extractor,
            transport,
            max_send_failures,
            consecutive_failures: 0,
            summary: RunSummary::default(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Run one iteration of the loop.
    pub fn step(&mut self) -> Result<Step> {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::info!("Frame source ended: {:#}", e);
                return Ok(Step::EndOfStream);
            }
        };
        self.summary.frames += 1;

        let Some(face) = self.extractor.detect(&frame)? else {
            log::trace!("No face in frame {}", self.summary.frames);
            return Ok(Step::NoFace);
        };
        self.summary.faces += 1;

        let pose = derive_pose(&face)?;
        println!("{} {}", pose.yaw, pose.pitch);

        let datagram = payload::encode(&face, pose)?;
        match self.transport.send(&datagram) {
            Ok(()) => {
                self.consecutive_failures = 0;
                self.summary.sent += 1;
                Ok(Step::Sent(pose))
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.summary.send_failures += 1;
                if self.max_send_failures > 0 && self.consecutive_failures >= self.max_send_failures {
                    return Err(LinkError::TransportDown {
                        failures: self.consecutive_failures,
                        source: e,
                    }
                    .into());
                }
                // UDP send errors are not fatal on their own - log and keep streaming
                log::warn!(
                    "Failed to send datagram ({} in a row): {}",
                    self.consecutive_failures,
                    e
                );
                Ok(Step::SendFailed(pose))
            }
        }
    }

    /// Loop until the frame source ends. Consumes the pipeline so the camera
    /// and socket are closed before this returns, on success or error.
    pub fn run(mut self) -> Result<RunSummary> {
        log::info!("Streaming with {}", self.extractor.name());
        loop {
            if self.step()? == Step::EndOfStream {
                break;
            }
        }
        Ok(self.summary)
    }
}
