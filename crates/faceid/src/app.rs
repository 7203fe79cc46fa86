use crate::engine::Engine;
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use faceid_core::{VerificationResult, VerificationStatus};
use faceid_hw::{Frame, FrameSource};
use ratatui::backend::Backend;
use ratatui::Terminal;
use std::time::{Duration, Instant};

/// Interactive live view: a display tick plus a verify action, on one thread.
pub struct App<S: FrameSource> {
    engine: Engine<S>,
    tick: Duration,
    latest: Option<Frame>,
    status: VerificationStatus,
    last_result: Option<VerificationResult>,
    /// Last capture error shown under the live view, cleared on the next good frame.
    capture_error: Option<String>,
    should_quit: bool,
}

impl<S: FrameSource> App<S> {
    pub fn new(engine: Engine<S>, tick: Duration) -> Self {
        Self {
            engine,
            tick,
            latest: None,
            status: VerificationStatus::default(),
            last_result: None,
            capture_error: None,
            should_quit: false,
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut last_tick: Option<Instant> = None;

        while !self.should_quit {
            if last_tick.map_or(true, |t| t.elapsed() >= self.tick) {
                self.on_tick();
                last_tick = Some(Instant::now());
            }

            terminal.draw(|frame| ui::render(frame, self))?;

            let timeout = last_tick.map_or(Duration::ZERO, |t| self.tick.saturating_sub(t.elapsed()));
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }

        Ok(())
    }

    /// Refresh the live view. Display only, no verification.
    pub fn on_tick(&mut self) {
        match self.engine.capture() {
            Ok(frame) => {
                self.latest = Some(frame);
                self.capture_error = None;
            }
            Err(e) => {
                if self.capture_error.is_none() {
                    tracing::warn!(error = %e, "live view capture failed");
                }
                self.capture_error = Some(e.to_string());
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('v') | KeyCode::Enter | KeyCode::Char(' ') => self.verify(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            _ => {}
        }
    }

    /// Run one verification and update the label. Blocks the loop until done.
    pub fn verify(&mut self) {
        match self.engine.verify() {
            Ok(result) => {
                self.status = VerificationStatus::from(&result);
                self.last_result = Some(result);
            }
            Err(e) => {
                tracing::error!(error = %e, "verification failed");
                self.status = VerificationStatus::Failed(e.to_string());
                self.last_result = None;
            }
        }
    }

    pub fn latest_frame(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    pub fn status(&self) -> &VerificationStatus {
        &self.status
    }

    pub fn last_result(&self) -> Option<&VerificationResult> {
        self.last_result.as_ref()
    }

    pub fn capture_error(&self) -> Option<&str> {
        self.capture_error.as_deref()
    }

    #[cfg(test)]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn into_engine(self) -> Engine<S> {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{engine, gallery, FakeCamera};
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_initial_label_is_uninitiated() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(
            engine(FakeCamera::new(1), dir.path(), dir.path().to_path_buf()),
            Duration::from_millis(30),
        );
        assert_eq!(app.status().to_string(), "Verification Uninitiated");
        assert!(app.latest_frame().is_none());
    }

    #[test]
    fn test_tick_updates_frame_without_verifying() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path(), 80, 1, 0);
        let camera = FakeCamera::new(80);
        let reads = camera.reads.clone();
        let mut app = App::new(engine(camera, dir.path(), gallery), Duration::from_millis(30));

        app.on_tick();
        app.on_tick();
        assert_eq!(reads.get(), 2);
        assert!(app.latest_frame().is_some());
        assert_eq!(*app.status(), VerificationStatus::Uninitiated);
        assert!(!dir.path().join("input_image").exists());
    }

    #[test]
    fn test_verify_key_sets_verified_label() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path(), 120, 10, 0);
        let mut app = App::new(
            engine(FakeCamera::new(120), dir.path(), gallery),
            Duration::from_millis(30),
        );

        app.handle_key(press(KeyCode::Char('v')));
        assert_eq!(*app.status(), VerificationStatus::Verified);
        assert_eq!(app.last_result().unwrap().detections, 10);
    }

    #[test]
    fn test_verify_unverified_label() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = gallery(dir.path(), 120, 4, 6);
        let mut app = App::new(
            engine(FakeCamera::new(120), dir.path(), gallery),
            Duration::from_millis(30),
        );

        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.status().to_string(), "Unverified");
    }

    #[test]
    fn test_verify_failure_is_shown_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_gallery");
        let mut app = App::new(
            engine(FakeCamera::new(120), dir.path(), missing),
            Duration::from_millis(30),
        );

        app.verify();
        assert!(matches!(app.status(), VerificationStatus::Failed(_)));
        assert!(app.last_result().is_none());
        assert!(!app.should_quit());
    }

    #[test]
    fn test_quit_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(
            engine(FakeCamera::new(1), dir.path(), dir.path().to_path_buf()),
            Duration::from_millis(30),
        );
        app.handle_key(press(KeyCode::Char('x')));
        assert!(!app.should_quit());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }

    #[test]
    fn test_key_release_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(
            engine(FakeCamera::new(1), dir.path(), dir.path().to_path_buf()),
            Duration::from_millis(30),
        );
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        app.handle_key(release);
        assert!(!app.should_quit());
    }
}
