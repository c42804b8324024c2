//! Presentation surfaces.
//!
//! The loop controller owns exactly one [`Presenter`]. `poll` reports what happened since
//! the last frame was shown: nothing, a key press, a quit request, a closed window, or an
//! interrupt.

mod headless;
#[cfg(feature = "backend-opencv")]
mod highgui;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::frame::{Frame, Region};

pub use headless::HeadlessPresenter;
#[cfg(feature = "backend-opencv")]
pub use highgui::HighguiPresenter;

/// Escape key code.
pub const KEY_ESCAPE: i32 = 27;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenterEvent {
    Continue,
    Key(char),
    QuitRequested,
    SurfaceClosed,
    Interrupted,
}

/// Map a raw key code (negative when no key was pressed) to an event.
pub fn classify_key(code: i32) -> PresenterEvent {
    if code < 0 {
        return PresenterEvent::Continue;
    }
    let code = code & 0xFF;
    if code == KEY_ESCAPE || code == b'q' as i32 {
        return PresenterEvent::QuitRequested;
    }
    PresenterEvent::Key(char::from(code as u8))
}

pub trait Presenter {
    /// Display a frame on the main surface.
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// Display a secondary view (e.g. a threshold mask) under `name`.
    fn show_extra(&mut self, _name: &str, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    /// Wait up to `timeout` for input. A zero timeout blocks until a key arrives.
    fn poll(&mut self, timeout: Duration) -> Result<PresenterEvent>;

    /// Let the user pick a region on `frame`. `None` when the selection was cancelled.
    fn select_region(&mut self, frame: &Frame) -> Result<Option<Region>>;

    /// Close the surface. Called once by the loop controller.
    fn release(&mut self);
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        (**self).show(frame)
    }

    fn show_extra(&mut self, name: &str, frame: &Frame) -> Result<()> {
        (**self).show_extra(name, frame)
    }

    fn poll(&mut self, timeout: Duration) -> Result<PresenterEvent> {
        (**self).poll(timeout)
    }

    fn select_region(&mut self, frame: &Frame) -> Result<Option<Region>> {
        (**self).select_region(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Install a Ctrl-C handler that raises the returned flag.
///
/// Only one handler can be installed per process.
pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;
    Ok(flag)
}

/// Window settings shared by presenters.
#[derive(Clone, Debug)]
pub struct SurfaceOptions {
    pub title: String,
    pub fullscreen: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            title: "visionkit".to_string(),
            fullscreen: false,
        }
    }
}

/// Open the presenter for this build: a window when OpenCV is available and `headless`
/// is false, otherwise the headless presenter writing to `output_dir`.
pub fn open_presenter(
    options: &SurfaceOptions,
    headless: bool,
    output_dir: Option<std::path::PathBuf>,
    interrupt: Arc<AtomicBool>,
) -> Result<Box<dyn Presenter>> {
    if !headless {
        #[cfg(feature = "backend-opencv")]
        return Ok(Box::new(HighguiPresenter::open(options, interrupt)?));
        #[cfg(not(feature = "backend-opencv"))]
        log::warn!("no window backend in this build (enable backend-opencv); running headless");
    }
    let mut presenter = HeadlessPresenter::new(&options.title).with_interrupt(interrupt);
    if let Some(dir) = output_dir {
        presenter = presenter.with_output_dir(dir)?;
    }
    Ok(Box::new(presenter))
}
