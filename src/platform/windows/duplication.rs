// 单个输出的桌面复制会话
//
// AcquireNextFrame → CopyResource into a reusable staging texture → ReleaseFrame,
// then Map the staging copy for the CPU. The duplication frame is handed back
// as soon as the copy is queued; `release` only unmaps. On a wait timeout the
// staging texture still holds the previous frame and can be mapped again.

use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::{debug, trace};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Texture2D, D3D11_CPU_ACCESS_READ, D3D11_MAPPED_SUBRESOURCE, D3D11_MAP_READ,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_SAMPLE_DESC};
use windows::Win32::Graphics::Dxgi::{
    IDXGIOutputDuplication, IDXGIResource, DXGI_ERROR_ACCESS_LOST, DXGI_ERROR_WAIT_TIMEOUT,
    DXGI_OUTDUPL_FRAME_INFO,
};

use super::d3d11::AdapterDevice;
use crate::capture::{OutputDescriptor, OutputHandle, PixelSurface};
use crate::error::{AcquirePhase, CaptureError, CaptureResult};

/// CPU-readable copy target, recreated only when the desktop size changes
struct StagingTexture {
    texture: ID3D11Texture2D,
    width: u32,
    height: u32,
}

/// One output duplicated through `IDXGIOutputDuplication`.
pub struct DuplicatedOutput {
    descriptor: OutputDescriptor,
    duplication: IDXGIOutputDuplication,
    device: AdapterDevice,
    staging: Option<StagingTexture>,
    reuse_last_frame: bool,
    /// Staging texture holds a complete frame
    has_frame: bool,
    /// Staging texture is mapped; `release` owes an Unmap
    mapped: bool,
}

impl DuplicatedOutput {
    pub(super) fn new(
        descriptor: OutputDescriptor,
        duplication: IDXGIOutputDuplication,
        device: AdapterDevice,
        reuse_last_frame: bool,
    ) -> Self {
        Self {
            descriptor,
            duplication,
            device,
            staging: None,
            reuse_last_frame,
            has_frame: false,
            mapped: false,
        }
    }

    fn failure(&self, phase: AcquirePhase, source: anyhow::Error) -> CaptureError {
        CaptureError::Acquisition {
            output: self.descriptor.index,
            name: self.descriptor.name.clone(),
            phase,
            source,
        }
    }

    /// 确保 Staging Texture 存在且尺寸匹配
    fn ensure_staging(&mut self, width: u32, height: u32) -> anyhow::Result<ID3D11Texture2D> {
        if let Some(staging) = &self.staging {
            if staging.width == width && staging.height == height {
                return Ok(staging.texture.clone());
            }
        }

        let desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_B8G8R8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
        };

        let mut texture = None;
        unsafe {
            self.device
                .device
                .CreateTexture2D(&desc, None, Some(&mut texture))
                .context("Failed to create staging texture")?;
        }
        let texture = texture.context("CreateTexture2D returned no texture")?;

        debug!(
            "Staging texture {}x{} for output #{}",
            width, height, self.descriptor.index
        );
        self.staging = Some(StagingTexture {
            texture: texture.clone(),
            width,
            height,
        });
        self.has_frame = false;
        Ok(texture)
    }

    /// Copy the acquired desktop image into the staging texture.
    fn copy_to_staging(&mut self, resource: Option<IDXGIResource>) -> anyhow::Result<()> {
        let resource = resource.context("AcquireNextFrame returned no desktop resource")?;
        let texture: ID3D11Texture2D = resource
            .cast()
            .context("failed to cast IDXGIResource to ID3D11Texture2D")?;

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };
        if desc.Format != DXGI_FORMAT_B8G8R8A8_UNORM {
            return Err(anyhow!(
                "unsupported desktop format {:?}, expected B8G8R8A8_UNORM",
                desc.Format
            ));
        }

        let staging = self.ensure_staging(desc.Width, desc.Height)?;
        unsafe { self.device.context.CopyResource(&staging, &texture) };
        self.has_frame = true;
        Ok(())
    }

    fn map(&mut self) -> CaptureResult<Option<PixelSurface<'_>>> {
        let Some(staging) = &self.staging else {
            return Ok(None);
        };
        let (texture, width, height) = (staging.texture.clone(), staging.width, staging.height);

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.device
                .context
                .Map(&texture, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
        }
        .map_err(|e| self.failure(AcquirePhase::Map, anyhow::Error::from(e)))?;
        self.mapped = true;

        let pitch = mapped.RowPitch as usize;
        let len = pitch * height as usize;
        // SAFETY: the mapping stays valid until `release` unmaps it, and the
        // surface borrows `self` mutably until then.
        let data = unsafe { std::slice::from_raw_parts(mapped.pData as *const u8, len) };
        Ok(Some(PixelSurface::new(data, width, height, pitch)))
    }
}

impl OutputHandle for DuplicatedOutput {
    fn descriptor(&self) -> &OutputDescriptor {
        &self.descriptor
    }

    fn acquire(&mut self, timeout: Duration) -> CaptureResult<Option<PixelSurface<'_>>> {
        // u32::MAX is INFINITE to AcquireNextFrame
        let timeout_ms = timeout.as_millis().min(u32::MAX as u128 - 1) as u32;
        let mut info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;

        match unsafe {
            self.duplication
                .AcquireNextFrame(timeout_ms, &mut info, &mut resource)
        } {
            Ok(()) => {
                let copied = self.copy_to_staging(resource);
                // 拷贝已排队，立即归还复制帧
                let released = unsafe { self.duplication.ReleaseFrame() };
                copied.map_err(|e| self.failure(AcquirePhase::Copy, e))?;
                released.map_err(|e| self.failure(AcquirePhase::Release, e.into()))?;
            }
            Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                if !(self.reuse_last_frame && self.has_frame) {
                    return Ok(None);
                }
                trace!("Output #{} unchanged, reusing last frame", self.descriptor.index);
            }
            Err(e) if e.code() == DXGI_ERROR_ACCESS_LOST => {
                self.has_frame = false;
                return Err(self.failure(
                    AcquirePhase::Acquire,
                    anyhow::Error::from(e).context("desktop duplication access lost"),
                ));
            }
            Err(e) => {
                return Err(self.failure(
                    AcquirePhase::Acquire,
                    anyhow::Error::from(e).context("AcquireNextFrame failed"),
                ));
            }
        }

        self.map()
    }

    fn release(&mut self) -> CaptureResult<()> {
        if !self.mapped {
            return Err(self.failure(
                AcquirePhase::Release,
                anyhow!("release without a mapped frame"),
            ));
        }
        if let Some(staging) = &self.staging {
            unsafe { self.device.context.Unmap(&staging.texture, 0) };
        }
        self.mapped = false;
        Ok(())
    }
}

impl Drop for DuplicatedOutput {
    fn drop(&mut self) {
        if self.mapped {
            if let Some(staging) = &self.staging {
                unsafe { self.device.context.Unmap(&staging.texture, 0) };
            }
        }
    }
}
