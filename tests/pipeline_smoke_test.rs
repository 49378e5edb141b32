use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;
use std::io;
use std::net::UdpSocket;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use headcast::error::LinkError;
use headcast::payload::{self, PAYLOAD_BYTES, PAYLOAD_FLOATS, SELECTED_INDICES};
use headcast::pipeline::{FrameSource, LandmarkExtractor, Pipeline, RunSummary, Step};
use headcast::transport::{Transport, UdpTransport};
use headcast::types::{Frame, Landmarks, Point3D};

// =========================================================================
// Test doubles
// =========================================================================

/// Hands out `frames` blank frames, then reports the device gone.
struct ScriptedCamera {
    remaining: usize,
    dropped: Rc<Cell<bool>>,
}

impl ScriptedCamera {
    fn new(frames: usize) -> (Self, Rc<Cell<bool>>) {
        let dropped = Rc::new(Cell::new(false));
        (
            Self {
                remaining: frames,
                dropped: dropped.clone(),
            },
            dropped,
        )
    }
}

impl FrameSource for ScriptedCamera {
    fn next_frame(&mut self) -> Result<Frame> {
        if self.remaining == 0 {
            return Err(anyhow!("device disconnected"));
        }
        self.remaining -= 1;
        Ok(Frame::new(4, 4))
    }
}

impl Drop for ScriptedCamera {
    fn drop(&mut self) {
        self.dropped.set(true);
    }
}

/// Returns one scripted result per frame; runs dry as "no face".
struct ScriptedExtractor {
    results: VecDeque<Option<Landmarks>>,
}

impl ScriptedExtractor {
    fn new(results: Vec<Option<Landmarks>>) -> Self {
        Self {
            results: results.into(),
        }
    }
}

impl LandmarkExtractor for ScriptedExtractor {
    fn name(&self) -> String {
        "Scripted".to_string()
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Option<Landmarks>> {
        Ok(self.results.pop_front().flatten())
    }
}

struct BrokenExtractor;

impl LandmarkExtractor for BrokenExtractor {
    fn name(&self) -> String {
        "Broken".to_string()
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Option<Landmarks>> {
        Err(anyhow!("inference failed"))
    }
}

#[derive(Clone, Default)]
struct CapturingTransport {
    sent: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Transport for CapturingTransport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.sent.borrow_mut().push(datagram.to_vec());
        Ok(())
    }
}

struct UnreachableTransport;

impl Transport for UnreachableTransport {
    fn send(&mut self, _datagram: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "host unreachable"))
    }
}

fn face() -> Landmarks {
    let mut points = vec![Point3D::new(0.1, 0.2, 0.3); 478];
    points[1] = Point3D::new(0.5, 0.5, 0.0);
    points[33] = Point3D::new(0.4, 0.5, 0.0);
    points[263] = Point3D::new(0.6, 0.5, 0.0);
    points[152] = Point3D::new(0.5, 0.9, -0.05);
    Landmarks::new(points)
}

fn floats(datagram: &[u8]) -> Vec<f32> {
    datagram
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn no_face_means_no_datagram() {
    let (camera, _) = ScriptedCamera::new(3);
    let transport = CapturingTransport::default();
    let sent = transport.sent.clone();

    let summary = Pipeline::new(camera, ScriptedExtractor::new(vec![]), transport, 10)
        .run()
        .unwrap();

    assert!(sent.borrow().is_empty());
    assert_eq!(
        summary,
        RunSummary {
            frames: 3,
            faces: 0,
            sent: 0,
            send_failures: 0
        }
    );
}

#[test]
fn level_face_streams_quarter_turn_yaw() {
    let (camera, _) = ScriptedCamera::new(1);
    let transport = CapturingTransport::default();
    let sent = transport.sent.clone();

    Pipeline::new(camera, ScriptedExtractor::new(vec![Some(face())]), transport, 10)
        .run()
        .unwrap();

    let sent = sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), PAYLOAD_BYTES);

    let values = floats(&sent[0]);
    assert_eq!(values.len(), PAYLOAD_FLOATS);
    assert!((values[27] - FRAC_PI_2).abs() < 1e-6, "yaw {}", values[27]);
    assert_eq!(values[28], 0.0);
    // Chin is the last selected landmark
    assert_eq!(&values[24..27], &[0.5f32, 0.9, -0.05]);
}

#[test]
fn only_frames_with_faces_are_sent() {
    let (camera, _) = ScriptedCamera::new(4);
    let transport = CapturingTransport::default();
    let sent = transport.sent.clone();
    let extractor = ScriptedExtractor::new(vec![Some(face()), None, Some(face()), None]);

    let mut pipeline = Pipeline::new(camera, extractor, transport, 10);
    assert!(matches!(pipeline.step().unwrap(), Step::Sent(_)));
    assert_eq!(pipeline.step().unwrap(), Step::NoFace);
    assert!(matches!(pipeline.step().unwrap(), Step::Sent(_)));
    assert_eq!(pipeline.step().unwrap(), Step::NoFace);
    assert_eq!(pipeline.step().unwrap(), Step::EndOfStream);

    assert_eq!(sent.borrow().len(), 2);
    assert_eq!(pipeline.summary().faces, 2);
}

#[test]
fn empty_camera_ends_immediately() {
    let (camera, _) = ScriptedCamera::new(0);
    let mut pipeline = Pipeline::new(camera, BrokenExtractor, CapturingTransport::default(), 10);
    assert_eq!(pipeline.step().unwrap(), Step::EndOfStream);
    assert_eq!(pipeline.summary().frames, 0);
}

#[test]
fn send_failures_below_limit_keep_streaming() {
    let (camera, _) = ScriptedCamera::new(3);
    let extractor = ScriptedExtractor::new(vec![Some(face()), Some(face()), Some(face())]);

    let summary = Pipeline::new(camera, extractor, UnreachableTransport, 5)
        .run()
        .unwrap();

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.send_failures, 3);
    assert_eq!(summary.sent, 0);
}

#[test]
fn repeated_send_failures_stop_the_loop() {
    let (camera, dropped) = ScriptedCamera::new(5);
    let extractor = ScriptedExtractor::new(vec![Some(face()); 5]);

    let err = Pipeline::new(camera, extractor, UnreachableTransport, 2)
        .run()
        .unwrap_err();

    match err.downcast_ref::<LinkError>() {
        Some(LinkError::TransportDown { failures, .. }) => assert_eq!(*failures, 2),
        other => panic!("expected TransportDown, got {:?}", other),
    }
    // Camera released on the error path too
    assert!(dropped.get());
}

#[test]
fn zero_limit_never_gives_up() {
    let (camera, _) = ScriptedCamera::new(20);
    let extractor = ScriptedExtractor::new(vec![Some(face()); 20]);

    let summary = Pipeline::new(camera, extractor, UnreachableTransport, 0)
        .run()
        .unwrap();
    assert_eq!(summary.send_failures, 20);
}

#[test]
fn extractor_errors_are_fatal() {
    let (camera, dropped) = ScriptedCamera::new(2);
    let err = Pipeline::new(camera, BrokenExtractor, CapturingTransport::default(), 10)
        .run()
        .unwrap_err();

    assert!(err.to_string().contains("inference failed"));
    assert!(dropped.get());
}

#[test]
fn truncated_face_is_fatal() {
    let (camera, _) = ScriptedCamera::new(1);
    let short = Landmarks::new(vec![Point3D::default(); 50]);
    let err = Pipeline::new(
        camera,
        ScriptedExtractor::new(vec![Some(short)]),
        CapturingTransport::default(),
        10,
    )
    .run()
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LinkError>(),
        Some(LinkError::MissingLandmark { index: 263, len: 50 })
    ));
}

#[test]
fn camera_released_after_normal_end() {
    let (camera, dropped) = ScriptedCamera::new(2);
    Pipeline::new(camera, ScriptedExtractor::new(vec![]), CapturingTransport::default(), 10)
        .run()
        .unwrap();
    assert!(dropped.get());
}

#[test]
fn datagrams_cross_a_real_socket() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let port = receiver.local_addr().unwrap().port();

    let (camera, _) = ScriptedCamera::new(1);
    let transport = UdpTransport::connect("127.0.0.1", port).unwrap();
    Pipeline::new(camera, ScriptedExtractor::new(vec![Some(face())]), transport, 10)
        .run()
        .unwrap();

    let mut buf = [0u8; 512];
    let (len, _) = receiver.recv_from(&mut buf).unwrap();
    let sample = payload::decode(&buf[..len]).unwrap();

    assert_eq!(sample.points.len(), SELECTED_INDICES.len());
    assert_eq!(sample.points[2], Point3D::new(0.4, 0.5, 0.0));
    assert!((sample.pose.yaw - FRAC_PI_2).abs() < 1e-6);
    assert_eq!(sample.pose.pitch, 0.0);
}
