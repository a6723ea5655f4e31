use std::{ffi::c_void, sync::Arc};

use ash::{extensions::khr, vk};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};

use crate::{
    error::{ContextError, Result},
    instance::Instance,
};

/// A presentable surface backed by a native window.
///
/// Holds the instance alive so the surface is always destroyed first.
pub struct Surface {
    pub handle: vk::SurfaceKHR,
    pub functions: khr::Surface,
    pub instance: Arc<Instance>,
}

impl Surface {
    pub fn new(
        window: &(impl HasWindowHandle + HasDisplayHandle),
        instance: &Arc<Instance>,
    ) -> Result<Self> {
        let window_handle = window
            .window_handle()
            .map_err(|err| ContextError::UnsupportedPlatform(err.to_string()))?
            .as_raw();
        let display_handle = window
            .display_handle()
            .map_err(|err| ContextError::UnsupportedPlatform(err.to_string()))?
            .as_raw();

        let entry = &instance.entry;
        let raw_instance = &instance.handle;
        let handle = match (display_handle, window_handle) {
            (RawDisplayHandle::Windows(_), RawWindowHandle::Win32(window_handle)) => {
                let hinstance = window_handle
                    .hinstance
                    .map_or(std::ptr::null(), |hinstance| hinstance.get() as *const c_void);
                let hwnd = window_handle.hwnd.get() as *const c_void;
                unsafe {
                    khr::Win32Surface::new(entry, raw_instance).create_win32_surface(
                        &vk::Win32SurfaceCreateInfoKHR::builder()
                            .hinstance(hinstance)
                            .hwnd(hwnd),
                        None,
                    )
                }
            }
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(window_handle)) => {
                let dpy = display
                    .display
                    .map_or(std::ptr::null_mut(), |display| display.as_ptr());
                unsafe {
                    khr::XlibSurface::new(entry, raw_instance).create_xlib_surface(
                        &vk::XlibSurfaceCreateInfoKHR::builder()
                            .dpy(dpy.cast())
                            .window(window_handle.window),
                        None,
                    )
                }
            }
            (RawDisplayHandle::Xcb(display), RawWindowHandle::Xcb(window_handle)) => {
                let connection = display
                    .connection
                    .map_or(std::ptr::null_mut(), |connection| connection.as_ptr());
                unsafe {
                    khr::XcbSurface::new(entry, raw_instance).create_xcb_surface(
                        &vk::XcbSurfaceCreateInfoKHR::builder()
                            .connection(connection)
                            .window(window_handle.window.get()),
                        None,
                    )
                }
            }
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(window_handle)) => unsafe {
                khr::WaylandSurface::new(entry, raw_instance).create_wayland_surface(
                    &vk::WaylandSurfaceCreateInfoKHR::builder()
                        .display(display.display.as_ptr())
                        .surface(window_handle.surface.as_ptr()),
                    None,
                )
            },
            (display, window) => {
                return Err(ContextError::UnsupportedPlatform(format!(
                    "{display:?} / {window:?}"
                )))
            }
        }
        .map_err(ContextError::SurfaceCreationFailed)?;

        let functions = khr::Surface::new(entry, raw_instance);
        log::info!("created window surface");
        Ok(Self {
            handle,
            functions,
            instance: instance.clone(),
        })
    }

    pub fn physical_device_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<bool> {
        Ok(unsafe {
            self.functions.get_physical_device_surface_support(
                physical_device,
                queue_family_index,
                self.handle,
            )?
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.functions.destroy_surface(self.handle, None) };
    }
}
