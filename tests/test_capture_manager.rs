// Integration test: CaptureManager over the synthetic backend

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dxgicapture::capture::synthetic::{SyntheticDesktop, SyntheticEvent, SyntheticOutput};
use dxgicapture::capture::{CaptureSource, Rect, Rotation};
use dxgicapture::compose::FrameCompositor;
use dxgicapture::image::{ImageResampler, Resampler};
use dxgicapture::pipeline::{FramePath, ManagerState};
use dxgicapture::{CaptureConfig, CaptureError, CaptureManager, CaptureResult, ErrorKind};

const A: [u8; 4] = [10, 20, 30, 255];
const B: [u8; 4] = [40, 50, 60, 255];
const C: [u8; 4] = [70, 80, 90, 255];

fn manager_with(desktop: SyntheticDesktop, source: CaptureSource) -> CaptureManager {
    CaptureManager::new(
        Box::new(desktop),
        CaptureConfig::default().with_source(source),
    )
}

fn pixel(buf: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let at = ((y * width + x) * 4) as usize;
    [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]
}

/// A (primary, 8x4) with B (8x4) to its right.
fn two_monitors() -> SyntheticDesktop {
    SyntheticDesktop::new(vec![
        SyntheticOutput::solid(0, "A", Rect::new(0, 0, 8, 4), Rotation::Identity, true, A),
        SyntheticOutput::solid(1, "B", Rect::new(8, 0, 16, 4), Rotation::Identity, false, B),
    ])
}

#[test]
fn test_output_rect_per_source() {
    let mut manager = manager_with(two_monitors(), CaptureSource::Undefined);
    assert_eq!(manager.get_output_rect().unwrap(), Rect::default());

    manager.set_capture_source(CaptureSource::Primary);
    assert_eq!(manager.get_capture_source(), CaptureSource::Primary);
    assert_eq!(manager.get_output_rect().unwrap(), Rect::new(0, 0, 8, 4));

    manager.set_capture_source(CaptureSource::Secondary);
    assert_eq!(manager.get_output_rect().unwrap(), Rect::new(8, 0, 16, 4));

    manager.set_capture_source(CaptureSource::FullDesktop);
    assert_eq!(manager.get_output_rect().unwrap(), Rect::new(0, 0, 16, 4));

    let names: Vec<String> = manager
        .outputs()
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, ["A", "B"]);
}

#[test]
fn test_placement_with_negative_origin_and_rotation() {
    let desktop = SyntheticDesktop::new(vec![
        SyntheticOutput::patterned(0, "A", Rect::new(0, 0, 4, 3), Rotation::Identity, true, 1),
        SyntheticOutput::patterned(1, "B", Rect::new(-2, -1, 0, 3), Rotation::Rotate90, false, 2)
            .with_row_padding(8),
        SyntheticOutput::patterned(2, "C", Rect::new(4, 1, 7, 3), Rotation::Rotate180, false, 3),
        SyntheticOutput::patterned(3, "D", Rect::new(7, -1, 9, 2), Rotation::Rotate270, false, 4),
    ]);
    let mut manager = manager_with(desktop, CaptureSource::FullDesktop);

    let virtual_rect = manager.get_output_rect().unwrap();
    assert_eq!(virtual_rect, Rect::new(-2, -1, 9, 3));

    let (width, height) = (virtual_rect.width(), virtual_rect.height());
    let mut dest = vec![0u8; (width * height * 4) as usize];
    let info = manager
        .get_frame(&mut dest, Rect::from_size(width, height))
        .unwrap();
    assert_eq!(info.path, FramePath::Direct);
    assert_eq!(info.outputs, 4);

    let footprints = [
        (Rect::new(0, 0, 4, 3), 1u8),
        (Rect::new(-2, -1, 0, 3), 2),
        (Rect::new(4, 1, 7, 3), 3),
        (Rect::new(7, -1, 9, 2), 4),
    ];
    for (rect, tag) in footprints {
        let (ox, oy) = ((rect.left + 2) as u32, (rect.top + 1) as u32);
        for y in 0..rect.height() {
            for x in 0..rect.width() {
                assert_eq!(
                    pixel(&dest, width, ox + x, oy + y),
                    [x as u8, y as u8, tag, 255],
                    "output tag {tag} at upright ({x}, {y})"
                );
            }
        }
    }
    // (4, 0) in buffer space is desktop (2, -1): covered by nothing
    assert_eq!(pixel(&dest, width, 4, 0), [0; 4]);
}

#[test]
fn test_scaled_path_letterboxes() {
    let mut manager = manager_with(two_monitors(), CaptureSource::FullDesktop);
    let frame = manager.capture(8, 8).unwrap();

    assert_eq!(frame.info.path, FramePath::Scaled);
    assert_eq!(
        (frame.info.content_width, frame.info.content_height),
        (8, 2)
    );
    assert_eq!(pixel(&frame.data, 8, 0, 0), A);
    assert_eq!(pixel(&frame.data, 8, 7, 1), B);
    assert!(frame.data[2 * 8 * 4..].iter().all(|&b| b == 0));
}

#[test]
fn test_scale_cache_reuse_and_realloc() {
    let mut manager = manager_with(two_monitors(), CaptureSource::FullDesktop);
    let mut dest = vec![0u8; 8 * 8 * 4];

    manager.get_frame(&mut dest, Rect::from_size(8, 8)).unwrap();
    manager.get_frame(&mut dest, Rect::from_size(8, 8)).unwrap();
    assert_eq!(manager.cache_stats().alloc_count, 1);

    // 8x4 still exceeds a 4x4 destination: new geometry, one reallocation
    manager.set_capture_source(CaptureSource::Primary);
    let mut small = vec![0u8; 4 * 4 * 4];
    manager.get_frame(&mut small, Rect::from_size(4, 4)).unwrap();
    manager.get_frame(&mut small, Rect::from_size(4, 4)).unwrap();
    assert_eq!(manager.cache_stats().alloc_count, 2);

    // Fits: direct path, cache untouched
    let info = manager.get_frame(&mut dest, Rect::from_size(8, 8)).unwrap();
    assert_eq!(info.path, FramePath::Direct);
    assert_eq!(manager.cache_stats().alloc_count, 2);
}

#[test]
fn test_direct_path_matches_scratch_plus_identity_resample() {
    let outputs = || {
        vec![
            SyntheticOutput::patterned(0, "A", Rect::new(0, 0, 5, 3), Rotation::Rotate90, true, 1),
            SyntheticOutput::patterned(1, "B", Rect::new(5, 1, 8, 4), Rotation::Identity, false, 2)
                .with_row_padding(4),
        ]
    };
    let virtual_rect = Rect::new(0, 0, 8, 4);
    let (w, h) = (virtual_rect.width(), virtual_rect.height());
    let compositor = FrameCompositor::new(Duration::from_millis(20));

    let mut direct_outputs = outputs();
    let mut direct = vec![0u8; (w * h * 4) as usize];
    {
        let mut handles: Vec<&mut dyn dxgicapture::capture::OutputHandle> = direct_outputs
            .iter_mut()
            .map(|o| o as &mut dyn dxgicapture::capture::OutputHandle)
            .collect();
        compositor
            .compose(&mut handles, virtual_rect, &mut direct, w)
            .unwrap();
    }

    let mut scratch_outputs = outputs();
    let mut scratch = vec![0u8; (w * h * 4) as usize];
    {
        let mut handles: Vec<&mut dyn dxgicapture::capture::OutputHandle> = scratch_outputs
            .iter_mut()
            .map(|o| o as &mut dyn dxgicapture::capture::OutputHandle)
            .collect();
        compositor
            .compose(&mut handles, virtual_rect, &mut scratch, w)
            .unwrap();
    }
    let mut resampled = vec![0u8; (w * h * 4) as usize];
    let written = ImageResampler::default()
        .resample(&scratch, w, h, &mut resampled, w, h)
        .unwrap();

    assert_eq!(written, (w, h));
    assert_eq!(direct, resampled);

    // The manager takes the direct path for an exact fit and agrees too
    let mut manager = manager_with(SyntheticDesktop::new(outputs()), CaptureSource::FullDesktop);
    let frame = manager.capture(w, h).unwrap();
    assert_eq!(frame.info.path, FramePath::Direct);
    assert_eq!(frame.data, direct);
}

#[test]
fn test_partial_failure_keeps_earlier_outputs() {
    let first = SyntheticOutput::solid(0, "A", Rect::new(0, 0, 2, 2), Rotation::Identity, true, A);
    let second = SyntheticOutput::solid(1, "B", Rect::new(2, 0, 4, 2), Rotation::Identity, false, B)
        .with_script([SyntheticEvent::Fail("access lost".into())]);
    let third = SyntheticOutput::solid(2, "C", Rect::new(4, 0, 6, 2), Rotation::Identity, false, C);
    let probes = [first.probe(), second.probe(), third.probe()];

    let mut manager = manager_with(
        SyntheticDesktop::new(vec![first, second, third]),
        CaptureSource::FullDesktop,
    );
    let mut dest = vec![0u8; 6 * 2 * 4];
    let err = manager
        .get_frame(&mut dest, Rect::from_size(6, 2))
        .unwrap_err();

    assert_eq!(err.output(), Some(1));
    assert_eq!(err.kind(), ErrorKind::AcquisitionFailure);
    assert!(err.to_string().contains("B"));
    for y in 0..2 {
        assert_eq!(pixel(&dest, 6, 0, y), A);
        assert_eq!(pixel(&dest, 6, 1, y), A);
        for x in 2..6 {
            assert_eq!(pixel(&dest, 6, x, y), [0; 4]);
        }
    }
    for probe in &probes {
        assert_eq!(probe.acquires(), probe.releases());
    }
}

#[test]
fn test_selection_policies_capture_only_selected() {
    let mut manager = manager_with(two_monitors(), CaptureSource::Secondary);
    let frame = manager.capture(8, 4).unwrap();
    assert_eq!(frame.info.virtual_rect, Rect::new(8, 0, 16, 4));
    assert!(frame.data.chunks_exact(4).all(|px| px == B));

    manager.set_capture_source(CaptureSource::Primary);
    let frame = manager.capture(8, 4).unwrap();
    assert!(frame.data.chunks_exact(4).all(|px| px == A));
}

#[test]
fn test_undefined_source_is_a_no_op() {
    let mut manager = manager_with(two_monitors(), CaptureSource::Undefined);
    let mut dest = vec![0x55u8; 4 * 4 * 4];
    let info = manager.get_frame(&mut dest, Rect::from_size(4, 4)).unwrap();
    assert_eq!(info.path, FramePath::Skipped);
    assert!(dest.iter().all(|&b| b == 0x55));
}

#[test]
fn test_lazy_init_runs_once() {
    let desktop = two_monitors();
    let enumerations = desktop.enumerations();
    let mut manager = manager_with(desktop, CaptureSource::Primary);
    assert_eq!(manager.state(), ManagerState::Uninitialized);

    let mut dest = vec![0u8; 8 * 4 * 4];
    manager.get_frame(&mut dest, Rect::from_size(8, 4)).unwrap();
    manager.get_frame(&mut dest, Rect::from_size(8, 4)).unwrap();
    manager.get_output_rect().unwrap();
    manager.init().unwrap();

    assert_eq!(manager.state(), ManagerState::Initialized);
    assert_eq!(enumerations.load(Ordering::SeqCst), 1);

    manager.reinitialize().unwrap();
    assert_eq!(enumerations.load(Ordering::SeqCst), 2);
}

#[test]
fn test_initialization_failure_surfaces_and_retries() {
    let desktop = SyntheticDesktop::failing("no adapters");
    let enumerations = desktop.enumerations();
    let mut manager = manager_with(desktop, CaptureSource::FullDesktop);
    let mut dest = vec![0u8; 16];

    let err = manager
        .get_frame(&mut dest, Rect::from_size(2, 2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Initialization);
    assert_eq!(manager.state(), ManagerState::Uninitialized);

    assert!(manager.get_output_rect().is_err());
    assert_eq!(enumerations.load(Ordering::SeqCst), 2);
}

#[test]
fn test_shutdown_is_terminal() {
    let mut manager = manager_with(two_monitors(), CaptureSource::Primary);
    manager.capture(8, 4).unwrap();
    manager.shutdown();

    assert_eq!(manager.state(), ManagerState::Shutdown);
    assert!(matches!(manager.capture(8, 4), Err(CaptureError::ShutDown)));
    assert!(matches!(manager.outputs(), Err(CaptureError::ShutDown)));
}

#[test]
fn test_timeout_without_and_with_frame_reuse() {
    let desktop = SyntheticDesktop::new(vec![
        SyntheticOutput::solid(0, "A", Rect::new(0, 0, 2, 2), Rotation::Identity, true, A)
            .with_script([SyntheticEvent::Frame, SyntheticEvent::Timeout]),
    ]);

    let strict = CaptureConfig::default()
        .with_source(CaptureSource::Primary)
        .with_reuse_last_frame(false);
    let mut manager = CaptureManager::new(Box::new(desktop.clone()), strict);
    manager.capture(2, 2).unwrap();
    let err = manager.capture(2, 2).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.output(), Some(0));
    // next call gets a frame again
    manager.capture(2, 2).unwrap();

    // the config flag alone turns the timeout into a re-shown frame
    let lenient = CaptureConfig::default()
        .with_source(CaptureSource::Primary)
        .with_reuse_last_frame(true);
    let mut manager = CaptureManager::new(Box::new(desktop), lenient);
    manager.capture(2, 2).unwrap();
    let frame = manager.capture(2, 2).unwrap();
    assert!(frame.data.chunks_exact(4).all(|px| px == A));
}

#[test]
fn test_oversized_capture_is_invalid_destination() {
    let mut manager = manager_with(two_monitors(), CaptureSource::Primary);
    let err = manager.capture(u32::MAX, 1).unwrap_err();
    assert!(matches!(err, CaptureError::InvalidDestination(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

struct RecordingResampler {
    calls: Arc<Mutex<Vec<(u32, u32, u32, u32)>>>,
}

impl Resampler for RecordingResampler {
    fn resample(
        &self,
        _src: &[u8],
        src_width: u32,
        src_height: u32,
        _dest: &mut [u8],
        dest_width: u32,
        dest_height: u32,
    ) -> CaptureResult<(u32, u32)> {
        self.calls
            .lock()
            .unwrap()
            .push((src_width, src_height, dest_width, dest_height));
        Ok((1, 1))
    }
}

#[test]
fn test_custom_resampler_receives_full_composite() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut manager = manager_with(two_monitors(), CaptureSource::FullDesktop).with_resampler(
        Box::new(RecordingResampler {
            calls: Arc::clone(&calls),
        }),
    );

    let frame = manager.capture(4, 4).unwrap();
    assert_eq!((frame.info.content_width, frame.info.content_height), (1, 1));
    assert_eq!(*calls.lock().unwrap(), [(16, 4, 4, 4)]);
}
