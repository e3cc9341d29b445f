// 适配器与输出枚举

use anyhow::Context;
use tracing::{info, warn};
use windows::core::Interface;
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_MODE_ROTATION, DXGI_MODE_ROTATION_ROTATE180, DXGI_MODE_ROTATION_ROTATE270,
    DXGI_MODE_ROTATION_ROTATE90,
};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory1, IDXGIAdapter, IDXGIFactory1, IDXGIOutput, IDXGIOutput1,
    DXGI_ERROR_NOT_FOUND, DXGI_OUTPUT_DESC,
};
use windows::Win32::Graphics::Gdi::{GetMonitorInfoW, HMONITOR, MONITORINFO, MONITORINFOF_PRIMARY};
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};

use super::d3d11::{create_device_for_adapter, AdapterDevice};
use super::duplication::DuplicatedOutput;
use crate::capture::{OutputDescriptor, OutputEnumerator, OutputHandle, Rect, Rotation};
use crate::error::{CaptureError, CaptureResult};

/// 启用 DPI 感知
///
/// Desktop coordinates must be physical pixels to line up with duplication
/// surfaces. Fails silently when the process already chose a DPI mode.
pub fn enable_dpi_awareness() {
    unsafe {
        let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
    }
}

/// Walks every adapter and duplicates each output attached to the desktop.
#[derive(Debug, Clone, Default)]
pub struct DxgiEnumerator;

impl OutputEnumerator for DxgiEnumerator {
    fn enumerate(&mut self, reuse_last_frame: bool) -> CaptureResult<Vec<Box<dyn OutputHandle>>> {
        enable_dpi_awareness();

        let factory: IDXGIFactory1 = unsafe { CreateDXGIFactory1() }
            .context("CreateDXGIFactory1 failed")
            .map_err(CaptureError::Initialization)?;

        let mut outputs: Vec<Box<dyn OutputHandle>> = Vec::new();
        let mut adapter_idx = 0u32;
        loop {
            let adapter1 = match unsafe { factory.EnumAdapters1(adapter_idx) } {
                Ok(a) => a,
                Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                Err(e) => {
                    return Err(CaptureError::Initialization(
                        anyhow::Error::from(e).context(format!("EnumAdapters1({adapter_idx}) failed")),
                    ));
                }
            };
            let adapter: IDXGIAdapter = adapter1
                .cast()
                .context("failed to cast IDXGIAdapter1 to IDXGIAdapter")
                .map_err(CaptureError::Initialization)?;

            // 每个有输出的适配器只创建一个设备
            let mut adapter_device: Option<AdapterDevice> = None;
            let mut output_idx = 0u32;
            loop {
                let output = match unsafe { adapter.EnumOutputs(output_idx) } {
                    Ok(o) => o,
                    Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                    Err(e) => {
                        return Err(CaptureError::Initialization(anyhow::Error::from(e).context(
                            format!("EnumOutputs({output_idx}) on adapter {adapter_idx} failed"),
                        )));
                    }
                };
                output_idx += 1;

                let desc = unsafe { output.GetDesc() }
                    .context("IDXGIOutput::GetDesc failed")
                    .map_err(CaptureError::Initialization)?;
                if !desc.AttachedToDesktop.as_bool() {
                    continue;
                }

                let device = match &adapter_device {
                    Some(device) => device.clone(),
                    None => {
                        let created = create_device_for_adapter(&adapter)
                            .with_context(|| format!("adapter {adapter_idx}"))
                            .map_err(CaptureError::Initialization)?;
                        adapter_device = Some(created.clone());
                        created
                    }
                };

                let descriptor = describe(outputs.len(), &desc);
                match duplicate(&output, &device) {
                    Ok(duplication) => {
                        info!(
                            "Output #{} {}: {:?} {:?}{}",
                            descriptor.index,
                            descriptor.name,
                            descriptor.rect,
                            descriptor.rotation,
                            if descriptor.is_primary { " (primary)" } else { "" }
                        );
                        outputs.push(Box::new(DuplicatedOutput::new(
                            descriptor,
                            duplication,
                            device,
                            reuse_last_frame,
                        )));
                    }
                    Err(e) => warn!("Skipping output {}: {:#}", descriptor.name, e),
                }
            }

            adapter_idx += 1;
        }

        Ok(outputs)
    }
}

fn duplicate(
    output: &IDXGIOutput,
    device: &AdapterDevice,
) -> anyhow::Result<windows::Win32::Graphics::Dxgi::IDXGIOutputDuplication> {
    let output1: IDXGIOutput1 = output.cast().context("failed to query IDXGIOutput1")?;
    unsafe { output1.DuplicateOutput(&device.device) }.context("DuplicateOutput failed")
}

fn describe(index: usize, desc: &DXGI_OUTPUT_DESC) -> OutputDescriptor {
    let name = String::from_utf16_lossy(&desc.DeviceName);
    OutputDescriptor::new(
        index,
        name.trim_end_matches('\0'),
        to_rect(&desc.DesktopCoordinates),
        to_rotation(desc.Rotation),
        is_primary(desc.Monitor),
    )
}

fn to_rect(rc: &RECT) -> Rect {
    Rect::new(rc.left, rc.top, rc.right, rc.bottom)
}

fn to_rotation(rotation: DXGI_MODE_ROTATION) -> Rotation {
    match rotation {
        DXGI_MODE_ROTATION_ROTATE90 => Rotation::Rotate90,
        DXGI_MODE_ROTATION_ROTATE180 => Rotation::Rotate180,
        DXGI_MODE_ROTATION_ROTATE270 => Rotation::Rotate270,
        // IDENTITY and UNSPECIFIED
        _ => Rotation::Identity,
    }
}

fn is_primary(monitor: HMONITOR) -> bool {
    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    let found = unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool();
    found && info.dwFlags & MONITORINFOF_PRIMARY != 0
}
