use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use super::{classify_key, Presenter, PresenterEvent};
use crate::frame::{Frame, Region};

/// Presenter without a window.
///
/// Optionally writes every shown frame as a PNG. Key presses and region selections can
/// be scripted, which is how headless runs drive the multi-tracker. A zero poll timeout
/// cannot wait for a key here and reports `QuitRequested`.
pub struct HeadlessPresenter {
    title: String,
    output_dir: Option<PathBuf>,
    interrupt: Option<Arc<AtomicBool>>,
    keys: VecDeque<(u64, char)>,
    selections: VecDeque<Region>,
    shown: u64,
    released: bool,
}

impl HeadlessPresenter {
    pub fn new(title: &str) -> Self {
        Self {
            title: sanitize(title),
            output_dir: None,
            interrupt: None,
            keys: VecDeque::new(),
            selections: VecDeque::new(),
            shown: 0,
            released: false,
        }
    }

    /// Write shown frames into `dir`, creating it if needed.
    pub fn with_output_dir(mut self, dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        self.output_dir = Some(dir);
        Ok(self)
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Report `key` when polled after the `after_frames`-th frame was shown.
    pub fn with_key(mut self, after_frames: u64, key: char) -> Self {
        self.keys.push_back((after_frames, key));
        self
    }

    /// Queue a region returned by the next `select_region` call.
    pub fn with_selection(mut self, region: Region) -> Self {
        self.selections.push_back(region);
        self
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }

    fn write(&self, name: Option<&str>, frame: &Frame) -> Result<()> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        let file = match name {
            Some(name) => format!("{}-{}-{:06}.png", self.title, sanitize(name), frame.index()),
            None => format!("{}-{:06}.png", self.title, frame.index()),
        };
        let path = dir.join(file);
        frame
            .pixels()
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

impl Presenter for HeadlessPresenter {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.write(None, frame)?;
        self.shown += 1;
        Ok(())
    }

    fn show_extra(&mut self, name: &str, frame: &Frame) -> Result<()> {
        self.write(Some(name), frame)
    }

    fn poll(&mut self, timeout: Duration) -> Result<PresenterEvent> {
        if let Some(flag) = &self.interrupt {
            if flag.load(Ordering::SeqCst) {
                return Ok(PresenterEvent::Interrupted);
            }
        }
        if let Some(&(after, key)) = self.keys.front() {
            if self.shown >= after {
                self.keys.pop_front();
                return Ok(classify_key(key as i32));
            }
        }
        if timeout.is_zero() {
            return Ok(PresenterEvent::QuitRequested);
        }
        std::thread::sleep(timeout);
        Ok(PresenterEvent::Continue)
    }

    fn select_region(&mut self, _frame: &Frame) -> Result<Option<Region>> {
        Ok(self.selections.pop_front())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            log::info!(
                "HeadlessPresenter: {} closed after {} frames",
                self.title,
                self.shown
            );
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const TICK: Duration = Duration::from_millis(1);

    #[test]
    fn writes_frames_to_output_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut presenter = HeadlessPresenter::new("Face Detection").with_output_dir(dir.path().join("out"))?;
        presenter.show(&Frame::new(7, RgbImage::new(4, 4)))?;
        presenter.show_extra("threshold", &Frame::new(7, RgbImage::new(4, 4)))?;
        assert!(dir.path().join("out/face_detection-000007.png").is_file());
        assert!(dir.path().join("out/face_detection-threshold-000007.png").is_file());
        assert_eq!(presenter.frames_shown(), 1);
        Ok(())
    }

    #[test]
    fn scripted_keys_fire_after_their_frame() -> Result<()> {
        let mut presenter = HeadlessPresenter::new("t").with_key(2, 's').with_key(2, 'q');
        let frame = Frame::new(0, RgbImage::new(2, 2));
        presenter.show(&frame)?;
        assert_eq!(presenter.poll(TICK)?, PresenterEvent::Continue);
        presenter.show(&frame)?;
        assert_eq!(presenter.poll(TICK)?, PresenterEvent::Key('s'));
        assert_eq!(presenter.poll(TICK)?, PresenterEvent::QuitRequested);
        Ok(())
    }

    #[test]
    fn interrupt_flag_wins() -> Result<()> {
        let flag = Arc::new(AtomicBool::new(true));
        let mut presenter = HeadlessPresenter::new("t").with_interrupt(flag).with_key(0, 's');
        assert_eq!(presenter.poll(TICK)?, PresenterEvent::Interrupted);
        Ok(())
    }

    #[test]
    fn selections_are_consumed_in_order() -> Result<()> {
        let frame = Frame::new(0, RgbImage::new(2, 2));
        let mut presenter = HeadlessPresenter::new("t").with_selection(Region::new(1, 2, 3, 4));
        assert_eq!(presenter.select_region(&frame)?, Some(Region::new(1, 2, 3, 4)));
        assert_eq!(presenter.select_region(&frame)?, None);
        Ok(())
    }
}
