use std::sync::mpsc::Receiver;
use std::sync::Arc;

use winit::window::Window;

use crate::backend::{Backend, BackendCaps, BackendError, BackendFactory, EventPump, FrameStart, WindowSpec};
use crate::device::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
use crate::input::InputEvent;
use crate::paint::Color;
use crate::render::{DrawPass, MeshRenderer, Readback};

use super::platform::{self, WindowRequest};

/// Builds [`WinitBackend`]s. Created on the application thread, consumed on
/// the render thread.
#[derive(Debug, Clone, Default)]
pub struct WinitBackendFactory {
    init: GpuInit,
}

impl WinitBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gpu_init(mut self, init: GpuInit) -> Self {
        self.init = init;
        self
    }
}

/// Pumps the main-thread event loop where the platform requires it.
struct MainThreadPump;

impl EventPump for MainThreadPump {
    fn pump(&mut self, _out: &mut Vec<InputEvent>) {
        // Window events reach the backend through its own channel.
        platform::pump();
    }
}

impl BackendFactory for WinitBackendFactory {
    fn caps(&self) -> BackendCaps {
        BackendCaps {
            pump_from_caller: cfg!(target_os = "macos"),
        }
    }

    fn display_size(&self) -> Option<(u32, u32)> {
        match platform::monitor_size() {
            Ok(size) => size,
            Err(e) => {
                log::warn!("winit: {e}");
                None
            }
        }
    }

    fn take_event_pump(&mut self) -> Option<Box<dyn EventPump>> {
        if self.caps().pump_from_caller {
            // The loop belongs to whichever thread starts it; claim it for the caller.
            if let Err(e) = platform::ensure_host() {
                log::error!("winit: {e}");
            }
            Some(Box::new(MainThreadPump))
        } else {
            None
        }
    }

    fn create(self: Box<Self>, spec: &WindowSpec) -> Result<Box<dyn Backend>, BackendError> {
        let hosted = platform::create_window(WindowRequest {
            title: spec.title.clone(),
            x: spec.x,
            y: spec.y,
            width: spec.width,
            height: spec.height,
        })?;

        let init = self.init.clone().with_readback(spec.readback);
        let gpu = match pollster::block_on(Gpu::new(hosted.window.clone(), &init)) {
            Ok(gpu) => gpu,
            Err(e) => {
                platform::close_window(hosted.window.id());
                return Err(BackendError::GraphicsContext(format!("{e:#}")));
            }
        };

        let renderer = MeshRenderer::new(gpu.device(), gpu.surface_format());
        let readback = gpu.readback_supported();

        Ok(Box::new(WinitBackend {
            window: hosted.window,
            events: hosted.events,
            gpu: Some(gpu),
            renderer,
            frame: None,
            readback: readback.then(Readback::new),
            front: Vec::new(),
            diagnostics: Vec::new(),
        }))
    }
}

/// winit window presented through wgpu.
pub struct WinitBackend {
    window: Arc<Window>,
    events: Receiver<InputEvent>,
    // Option so Drop can release the surface before the window closes.
    gpu: Option<Gpu>,
    renderer: MeshRenderer,
    frame: Option<GpuFrame>,
    readback: Option<Readback>,
    front: Vec<u8>,
    diagnostics: Vec<String>,
}

fn released() -> BackendError {
    BackendError::GraphicsContext("gpu context released".into())
}

impl Backend for WinitBackend {
    fn size(&self) -> (u32, u32) {
        let s = self.window.inner_size();
        (s.width, s.height)
    }

    fn poll_events(&mut self, out: &mut Vec<InputEvent>) {
        out.extend(self.events.try_iter());
    }

    fn begin_frame(&mut self, clear: Color) -> Result<FrameStart, BackendError> {
        let size = self.window.inner_size();
        let gpu = self.gpu.as_mut().ok_or_else(released)?;

        if gpu.size() != size {
            gpu.resize(size);
        }
        if size.width == 0 || size.height == 0 {
            return Ok(FrameStart::Skipped);
        }

        match gpu.begin_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                self.renderer.begin(clear);
                Ok(FrameStart::Ready)
            }
            Err(err) => {
                let msg = format!("surface: {err}");
                match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        self.diagnostics.push(msg);
                        Ok(FrameStart::Skipped)
                    }
                    SurfaceErrorAction::Fatal => Err(BackendError::Surface(msg)),
                }
            }
        }
    }

    fn pass(&mut self) -> &mut dyn DrawPass {
        &mut self.renderer
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        let Some(mut frame) = self.frame.take() else {
            return Ok(());
        };
        let gpu = self.gpu.as_ref().ok_or_else(released)?;

        self.renderer.flush(gpu, &mut frame);

        if let Some(readback) = self.readback.as_mut() {
            readback.record(gpu.device(), &mut frame.encoder, &frame.surface_texture.texture);
        }

        gpu.submit(frame);

        if let Some(readback) = self.readback.as_mut() {
            if let Err(e) = readback.resolve(gpu.device(), &mut self.front) {
                self.diagnostics.push(format!("readback: {e:#}"));
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self, out: &mut Vec<u8>) -> bool {
        if self.front.is_empty() {
            return false;
        }
        out.clear();
        out.extend_from_slice(&self.front);
        true
    }

    fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl Drop for WinitBackend {
    fn drop(&mut self) {
        self.frame = None;
        self.gpu = None;
        platform::close_window(self.window.id());
    }
}
