//! OpenCV highgui window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use opencv::highgui;

use super::{classify_key, Presenter, PresenterEvent, SurfaceOptions};
use crate::cv::{frame_to_bgr_mat, rect_to_region};
use crate::frame::{Frame, Region};

const BLOCKING_SLICE_MS: i32 = 100;

pub struct HighguiPresenter {
    title: String,
    extra_windows: Vec<String>,
    interrupt: Arc<AtomicBool>,
    open: bool,
}

impl HighguiPresenter {
    pub fn open(options: &SurfaceOptions, interrupt: Arc<AtomicBool>) -> Result<Self> {
        let title = options.title.clone();
        if options.fullscreen {
            highgui::named_window(&title, highgui::WND_PROP_FULLSCREEN)
                .with_context(|| format!("failed to open window '{title}'"))?;
            highgui::set_window_property(
                &title,
                highgui::WND_PROP_FULLSCREEN,
                highgui::WINDOW_FULLSCREEN as f64,
            )
            .context("failed to switch window to fullscreen")?;
        } else {
            highgui::named_window(&title, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("failed to open window '{title}'"))?;
        }
        log::info!("HighguiPresenter: opened '{}'", title);
        Ok(Self {
            title,
            extra_windows: Vec::new(),
            interrupt,
            open: true,
        })
    }

    fn visible(&self) -> bool {
        highgui::get_window_property(&self.title, highgui::WND_PROP_VISIBLE)
            .map(|v| v >= 1.0)
            .unwrap_or(false)
    }
}

impl Presenter for HighguiPresenter {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let mat = frame_to_bgr_mat(frame)?;
        highgui::imshow(&self.title, &mat).context("imshow failed")
    }

    fn show_extra(&mut self, name: &str, frame: &Frame) -> Result<()> {
        if !self.extra_windows.iter().any(|w| w == name) {
            highgui::named_window(name, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("failed to open window '{name}'"))?;
            self.extra_windows.push(name.to_string());
        }
        let mat = frame_to_bgr_mat(frame)?;
        highgui::imshow(name, &mat).context("imshow failed")
    }

    fn poll(&mut self, timeout: Duration) -> Result<PresenterEvent> {
        // A zero timeout waits for a key in slices so Ctrl-C and window close still land.
        let blocking = timeout.is_zero();
        let delay = if blocking {
            BLOCKING_SLICE_MS
        } else {
            timeout.as_millis().clamp(1, i32::MAX as u128) as i32
        };
        loop {
            let key = highgui::wait_key(delay).context("wait_key failed")?;
            if self.interrupt.load(Ordering::SeqCst) {
                return Ok(PresenterEvent::Interrupted);
            }
            let event = classify_key(key);
            if event != PresenterEvent::Continue {
                return Ok(event);
            }
            if !self.visible() {
                return Ok(PresenterEvent::SurfaceClosed);
            }
            if !blocking {
                return Ok(PresenterEvent::Continue);
            }
        }
    }

    fn select_region(&mut self, frame: &Frame) -> Result<Option<Region>> {
        let mat = frame_to_bgr_mat(frame)?;
        let rect = highgui::select_roi_def(&self.title, &mat).context("select_roi failed")?;
        let region = rect_to_region(rect);
        Ok(if region.is_empty() { None } else { Some(region) })
    }

    fn release(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        for name in self.extra_windows.drain(..) {
            if let Err(err) = highgui::destroy_window(&name) {
                log::warn!("HighguiPresenter: failed to close '{}': {}", name, err);
            }
        }
        if let Err(err) = highgui::destroy_window(&self.title) {
            log::warn!("HighguiPresenter: failed to close '{}': {}", self.title, err);
        }
        log::info!("HighguiPresenter: closed '{}'", self.title);
    }
}
