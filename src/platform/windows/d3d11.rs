// D3D11 设备创建

use anyhow::{Context, Result};
use tracing::debug;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::Graphics::Direct3D::{D3D_DRIVER_TYPE_UNKNOWN, D3D_FEATURE_LEVEL_11_0};
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, D3D11_CREATE_DEVICE_BGRA_SUPPORT,
    D3D11_SDK_VERSION,
};
use windows::Win32::Graphics::Dxgi::IDXGIAdapter;

/// Device and immediate context shared by every output of one adapter
#[derive(Clone)]
pub struct AdapterDevice {
    pub device: ID3D11Device,
    pub context: ID3D11DeviceContext,
}

/// 在指定适配器上创建 D3D11 设备
pub fn create_device_for_adapter(adapter: &IDXGIAdapter) -> Result<AdapterDevice> {
    let mut device = None;
    let mut context = None;

    unsafe {
        // 指定适配器时驱动类型必须是 UNKNOWN
        D3D11CreateDevice(
            adapter,
            D3D_DRIVER_TYPE_UNKNOWN,
            HMODULE::default(),
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            Some(&[D3D_FEATURE_LEVEL_11_0]),
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )
    }
    .context("D3D11CreateDevice failed")?;

    let device = device.context("D3D11CreateDevice did not return a device")?;
    let context = context.context("D3D11CreateDevice did not return a device context")?;

    if let Ok(desc) = unsafe { adapter.GetDesc() } {
        let name = String::from_utf16_lossy(&desc.Description);
        debug!(
            "D3D11 device created on {} ({} MB VRAM)",
            name.trim_end_matches('\0'),
            desc.DedicatedVideoMemory / 1024 / 1024
        );
    }

    Ok(AdapterDevice { device, context })
}
