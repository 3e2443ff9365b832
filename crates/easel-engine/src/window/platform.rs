//! Process-wide winit event loop host.
//!
//! winit allows one event loop per process, so every canvas window is created
//! through this host. On Linux and Windows the loop runs on a dedicated
//! platform thread; on macOS it must live on the main thread and is driven by
//! [`pump`], which `Canvas::sleep`/`wait` call as a side effect.
//!
//! The host is created on first use and stays alive for the rest of the
//! process, since a loop that has exited cannot be recreated.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::backend::BackendError;
use crate::input::platform::winit::WinitTranslator;
use crate::input::InputEvent;

/// How long a caller waits for the platform thread to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Parameters for a new window.
#[derive(Debug, Clone)]
pub(crate) struct WindowRequest {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A window created by the host plus the receiving end of its input stream.
pub(crate) struct HostedWindow {
    pub window: Arc<Window>,
    pub events: Receiver<InputEvent>,
}

type CreateReply = Result<(Arc<Window>, Receiver<InputEvent>)>;

pub(crate) enum Request {
    CreateWindow(WindowRequest, Sender<CreateReply>),
    CloseWindow(WindowId),
    QueryMonitor(Sender<Option<(u32, u32)>>),
}

static HOST: Mutex<Option<EventLoopProxy<Request>>> = Mutex::new(None);

struct WindowSlot {
    window: Arc<Window>,
    events: Sender<InputEvent>,
    translator: WinitTranslator,
}

#[derive(Default)]
struct Host {
    windows: HashMap<WindowId, WindowSlot>,
}

impl Host {
    fn create_window(&mut self, el: &ActiveEventLoop, req: WindowRequest) -> CreateReply {
        let attrs = Window::default_attributes()
            .with_title(req.title)
            .with_inner_size(PhysicalSize::new(req.width, req.height))
            .with_position(PhysicalPosition::new(req.x, req.y))
            .with_resizable(false);

        let window = el
            .create_window(attrs)
            .map_err(|e| anyhow!("failed to create window: {e}"))?;
        let window = Arc::new(window);
        let (tx, rx) = mpsc::channel();

        self.windows.insert(
            window.id(),
            WindowSlot {
                window: window.clone(),
                events: tx,
                translator: WinitTranslator::new(),
            },
        );

        log::debug!("platform: created window {:?}", window.id());
        Ok((window, rx))
    }
}

impl ApplicationHandler<Request> for Host {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn user_event(&mut self, event_loop: &ActiveEventLoop, request: Request) {
        match request {
            Request::CreateWindow(req, reply) => {
                let _ = reply.send(self.create_window(event_loop, req));
            }
            Request::CloseWindow(id) => {
                if self.windows.remove(&id).is_some() {
                    log::debug!("platform: closed window {id:?}");
                }
            }
            Request::QueryMonitor(reply) => {
                let size = event_loop
                    .primary_monitor()
                    .or_else(|| event_loop.available_monitors().next())
                    .map(|m| {
                        let s = m.size();
                        (s.width, s.height)
                    });
                let _ = reply.send(size);
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(slot) = self.windows.get_mut(&window_id) else {
            return;
        };

        if let WindowEvent::RedrawRequested = event {
            // Frames are driven by the render thread, not by redraw requests.
            return;
        }

        if let Some(ev) = slot.translator.translate(&event) {
            if slot.events.send(ev).is_err() {
                // Render thread is gone; drop the window.
                let id = slot.window.id();
                self.windows.remove(&id);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
    }
}

fn build_event_loop() -> Result<EventLoop<Request>> {
    #[allow(unused_mut)]
    let mut builder = EventLoop::<Request>::with_user_event();

    #[cfg(any(
        target_os = "linux",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd"
    ))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        builder.with_any_thread(true);
    }

    builder
        .build()
        .map_err(|e| anyhow!("failed to build event loop: {e}"))
}

// ── dedicated platform thread ─────────────────────────────────────────────

#[cfg(not(target_os = "macos"))]
fn proxy() -> Result<EventLoopProxy<Request>> {
    let mut host = HOST.lock();
    if let Some(proxy) = host.as_ref() {
        return Ok(proxy.clone());
    }

    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("easel-platform".into())
        .spawn(move || {
            let event_loop = match build_event_loop() {
                Ok(el) => el,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };
            let _ = tx.send(Ok(event_loop.create_proxy()));

            let mut app = Host::default();
            if let Err(e) = event_loop.run_app(&mut app) {
                log::error!("platform: event loop terminated: {e}");
            }
        })
        .context("failed to spawn platform thread")?;

    let proxy = rx
        .recv_timeout(REPLY_TIMEOUT)
        .context("platform thread did not start")??;

    *host = Some(proxy.clone());
    Ok(proxy)
}

#[cfg(not(target_os = "macos"))]
fn call<T>(make: impl FnOnce(Sender<T>) -> Request) -> Result<T> {
    let (tx, rx) = mpsc::channel();
    proxy()?
        .send_event(make(tx))
        .map_err(|_| anyhow!("platform event loop has exited"))?;
    rx.recv_timeout(REPLY_TIMEOUT)
        .context("platform thread did not reply")
}

/// Events are handled on the platform thread; nothing to do here.
#[cfg(not(target_os = "macos"))]
pub(crate) fn pump() {}

// ── main-thread loop (macOS) ──────────────────────────────────────────────

#[cfg(target_os = "macos")]
thread_local! {
    static LOCAL: std::cell::RefCell<Option<(EventLoop<Request>, Host)>> = const { std::cell::RefCell::new(None) };
}

#[cfg(target_os = "macos")]
fn proxy() -> Result<EventLoopProxy<Request>> {
    let mut host = HOST.lock();
    if let Some(proxy) = host.as_ref() {
        return Ok(proxy.clone());
    }

    // The first call must come from the main thread, which then owns the loop.
    let event_loop = build_event_loop()?;
    let proxy = event_loop.create_proxy();
    LOCAL.with(|l| *l.borrow_mut() = Some((event_loop, Host::default())));

    *host = Some(proxy.clone());
    Ok(proxy)
}

/// Drives the main-thread loop without blocking. No-op on other threads.
#[cfg(target_os = "macos")]
pub(crate) fn pump() {
    use winit::platform::pump_events::EventLoopExtPumpEvents;

    LOCAL.with(|l| {
        if let Ok(mut guard) = l.try_borrow_mut() {
            if let Some((event_loop, host)) = guard.as_mut() {
                let _ = event_loop.pump_app_events(Some(Duration::ZERO), host);
            }
        }
    });
}

#[cfg(target_os = "macos")]
fn call<T>(make: impl FnOnce(Sender<T>) -> Request) -> Result<T> {
    let (tx, rx) = mpsc::channel();
    proxy()?
        .send_event(make(tx))
        .map_err(|_| anyhow!("platform event loop has exited"))?;

    let owns_loop = LOCAL.with(|l| l.borrow().is_some());
    if !owns_loop {
        // The main thread answers once it next pumps.
        return rx
            .recv_timeout(REPLY_TIMEOUT)
            .context("main thread did not pump platform events");
    }

    let deadline = std::time::Instant::now() + REPLY_TIMEOUT;
    loop {
        pump();
        match rx.try_recv() {
            Ok(v) => return Ok(v),
            Err(mpsc::TryRecvError::Disconnected) => anyhow::bail!("platform reply dropped"),
            Err(mpsc::TryRecvError::Empty) if std::time::Instant::now() >= deadline => {
                anyhow::bail!("platform event loop did not reply");
            }
            Err(mpsc::TryRecvError::Empty) => std::thread::sleep(Duration::from_millis(1)),
        }
    }
}

// ── public entry points ───────────────────────────────────────────────────

/// Starts the host if needed. On macOS this must happen on the main thread.
pub(crate) fn ensure_host() -> Result<(), BackendError> {
    proxy()
        .map(drop)
        .map_err(|e| BackendError::WindowCreation(format!("{e:#}")))
}

pub(crate) fn create_window(req: WindowRequest) -> Result<HostedWindow, BackendError> {
    let (window, events) = call(|reply| Request::CreateWindow(req, reply))
        .and_then(|created| created)
        .map_err(|e| BackendError::WindowCreation(format!("{e:#}")))?;
    Ok(HostedWindow { window, events })
}

pub(crate) fn close_window(id: WindowId) {
    if let Some(proxy) = HOST.lock().as_ref() {
        let _ = proxy.send_event(Request::CloseWindow(id));
    }
}

pub(crate) fn monitor_size() -> Result<Option<(u32, u32)>, BackendError> {
    call(Request::QueryMonitor).map_err(|e| BackendError::MonitorInfo(format!("{e:#}")))
}
