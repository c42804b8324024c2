//! Loop controller.
//!
//! Drives Source → Processor → Presenter until the stream ends, the user quits, the
//! surface is closed, or Ctrl-C is pressed. The controller owns the source and the
//! presenter for the whole run and releases both exactly once on every exit path,
//! including errors and panics raised by the processor.

use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::present::{Presenter, PresenterEvent};

/// Per-frame delays accepted by `--speed`, in milliseconds.
pub const SPEED_CHOICES: &[u64] = &[1, 5, 10, 15, 25, 50, 100, 150, 200, 250, 300];

/// Poll timeout used when no speed is configured.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// Check a `--speed` value against [`SPEED_CHOICES`].
pub fn validate_speed(ms: u64) -> Result<Duration> {
    if !SPEED_CHOICES.contains(&ms) {
        bail!("speed must be one of {:?} (ms), got {}", SPEED_CHOICES, ms);
    }
    Ok(Duration::from_millis(ms))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    EndOfStream,
    QuitRequested,
    SurfaceClosed,
    Interrupted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub status: ExitStatus,
    /// Frames read from the source and handed to the processor.
    pub frames: u64,
}

/// What the processor hands back for display: the annotated frame plus optional
/// secondary views shown next to it.
#[derive(Clone, Debug)]
pub struct Views {
    pub main: Frame,
    pub extras: Vec<(String, Frame)>,
}

impl Views {
    pub fn new(main: Frame) -> Self {
        Self {
            main,
            extras: Vec::new(),
        }
    }

    pub fn with_extra(mut self, name: impl Into<String>, frame: Frame) -> Self {
        self.extras.push((name.into(), frame));
        self
    }
}

impl From<Frame> for Views {
    fn from(main: Frame) -> Self {
        Self::new(main)
    }
}

/// Called with every non-quit key press, the last raw frame and the presenter.
pub type KeyHook<'a> = Box<dyn FnMut(char, &Frame, &mut dyn Presenter) -> Result<()> + 'a>;

pub struct LoopController<'a, S: FrameSource, P: Presenter> {
    source: S,
    presenter: P,
    poll_timeout: Duration,
    hold_last_frame: bool,
    on_key: Option<KeyHook<'a>>,
}

impl<'a, S: FrameSource, P: Presenter> LoopController<'a, S, P> {
    /// `source` must not be connected yet; the controller connects it.
    pub fn new(source: S, presenter: P) -> Self {
        Self {
            source,
            presenter,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            hold_last_frame: false,
            on_key: None,
        }
    }

    /// Time spent waiting for input after each frame.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Keep the last frame on screen at end of stream until a key is pressed.
    pub fn hold_last_frame(mut self, hold: bool) -> Self {
        self.hold_last_frame = hold;
        self
    }

    pub fn on_key(mut self, hook: impl FnMut(char, &Frame, &mut dyn Presenter) -> Result<()> + 'a) -> Self {
        self.on_key = Some(Box::new(hook));
        self
    }

    pub fn run<F, V>(self, mut process: F) -> Result<RunSummary>
    where
        F: FnMut(&Frame) -> Result<V>,
        V: Into<Views>,
    {
        self.run_with_prelude(|_| Ok(()), |_, frame| process(frame))
    }

    /// Run `prelude` on the connected source before the first iteration and hand its
    /// result to every `process` call. Frames read by the prelude are not shown.
    pub fn run_with_prelude<T, Pre, F, V>(self, prelude: Pre, mut process: F) -> Result<RunSummary>
    where
        Pre: FnOnce(&mut S) -> Result<T>,
        F: FnMut(&mut T, &Frame) -> Result<V>,
        V: Into<Views>,
    {
        let LoopController {
            source,
            presenter,
            poll_timeout,
            hold_last_frame,
            mut on_key,
        } = self;
        let mut guard = ReleaseGuard {
            source,
            presenter,
            released: false,
        };

        let name = guard.source.describe();
        guard
            .source
            .connect()
            .with_context(|| format!("failed to open source {name}"))?;
        let mut state = prelude(&mut guard.source)?;
        log::info!("loop started on {}", name);

        let mut frames = 0u64;
        let status = loop {
            let frame = match guard.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break ExitStatus::EndOfStream,
                Err(err) => {
                    log::error!("{}: read failed after {} frames: {:#}", name, frames, err);
                    return Err(err.context(format!("frame acquisition failed on {name}")));
                }
            };
            frames += 1;

            let views: Views = process(&mut state, &frame)?.into();
            guard.presenter.show(&views.main)?;
            for (extra, view) in &views.extras {
                guard.presenter.show_extra(extra, view)?;
            }

            match guard.presenter.poll(poll_timeout)? {
                PresenterEvent::Continue => {}
                PresenterEvent::Key(key) => {
                    if let Some(hook) = on_key.as_mut() {
                        hook(key, &frame, &mut guard.presenter)?;
                    }
                }
                PresenterEvent::QuitRequested => break ExitStatus::QuitRequested,
                PresenterEvent::SurfaceClosed => break ExitStatus::SurfaceClosed,
                PresenterEvent::Interrupted => break ExitStatus::Interrupted,
            }
        };

        let status = if status == ExitStatus::EndOfStream && hold_last_frame && frames > 0 {
            hold(&mut guard.presenter)?
        } else {
            status
        };

        let stats = guard.source.stats();
        log::info!(
            "loop finished ({:?}) after {} frames, {} captured from {}",
            status,
            frames,
            stats.frames_captured,
            stats.source
        );
        guard.release();
        Ok(RunSummary { status, frames })
    }
}

/// Block until any key. Closing the surface or Ctrl-C still end the wait.
fn hold<P: Presenter>(presenter: &mut P) -> Result<ExitStatus> {
    loop {
        match presenter.poll(Duration::ZERO)? {
            PresenterEvent::Continue => continue,
            PresenterEvent::Key(_) | PresenterEvent::QuitRequested => {
                return Ok(ExitStatus::EndOfStream)
            }
            PresenterEvent::SurfaceClosed => return Ok(ExitStatus::SurfaceClosed),
            PresenterEvent::Interrupted => return Ok(ExitStatus::Interrupted),
        }
    }
}

struct ReleaseGuard<S: FrameSource, P: Presenter> {
    source: S,
    presenter: P,
    released: bool,
}

impl<S: FrameSource, P: Presenter> ReleaseGuard<S, P> {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.release();
        self.presenter.release();
    }
}

impl<S: FrameSource, P: Presenter> Drop for ReleaseGuard<S, P> {
    fn drop(&mut self) {
        self.release();
    }
}
