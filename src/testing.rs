//! In-memory collaborators shared by the unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::delay::DelayNs;

use crate::display::Panel;
use crate::error::{FetchError, PanelError};
use crate::fetch::StatusApi;
use crate::render::Framebuffer;
use crate::status::StatusSnapshot;

/// Delay that only adds up how long it was asked to wait
#[derive(Clone, Default)]
pub struct FakeDelay(Rc<RefCell<u64>>);

impl FakeDelay {
    pub fn total(&self) -> Duration {
        Duration::from_nanos(*self.0.borrow())
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.0.borrow_mut() += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        *self.0.borrow_mut() += u64::from(ms) * 1_000_000;
    }
}

/// Remembers every frame sent to the LEDs
#[derive(Clone, Default)]
pub struct RecordingPixels(Rc<RefCell<Vec<Vec<Rgb888>>>>);

impl RecordingPixels {
    pub fn frames(&self) -> Vec<Vec<Rgb888>> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<Vec<Rgb888>> {
        self.0.borrow().last().cloned()
    }
}

impl crate::indicator::PixelWriter for RecordingPixels {
    fn write(&mut self, colors: &[Rgb888]) -> Result<()> {
        self.0.borrow_mut().push(colors.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct PanelLog {
    pub refreshes: u32,
    pub frames: Vec<Vec<u8>>,
    /// Results handed out before falling back to success
    pub script: VecDeque<Result<(), PanelError>>,
    pub asleep: bool,
}

#[derive(Clone, Default)]
pub struct FakePanel(pub Rc<RefCell<PanelLog>>);

impl FakePanel {
    pub fn refreshes(&self) -> u32 {
        self.0.borrow().refreshes
    }

    pub fn refuse_next(&self, err: PanelError) {
        self.0.borrow_mut().script.push_back(Err(err));
    }

    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.0.borrow().frames.last().cloned()
    }

    pub fn is_asleep(&self) -> bool {
        self.0.borrow().asleep
    }
}

impl Panel for FakePanel {
    fn refresh(&mut self, frame: &Framebuffer) -> Result<(), PanelError> {
        let mut log = self.0.borrow_mut();
        if let Some(result) = log.script.pop_front() {
            result?;
        }
        log.refreshes += 1;
        log.asleep = false;
        log.frames.push(frame.as_slice().to_vec());
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), PanelError> {
        self.0.borrow_mut().asleep = true;
        Ok(())
    }
}

/// Status API answering from a script, then with the fallback snapshot
#[derive(Clone, Default)]
pub struct ScriptedApi {
    script: Rc<RefCell<VecDeque<Result<StatusSnapshot, FetchError>>>>,
    fallback: Rc<RefCell<StatusSnapshot>>,
    calls: Rc<RefCell<u32>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: Result<StatusSnapshot, FetchError>) {
        self.script.borrow_mut().push_back(result);
    }

    pub fn set(&self, snapshot: StatusSnapshot) {
        *self.fallback.borrow_mut() = snapshot;
    }

    pub fn calls(&self) -> u32 {
        *self.calls.borrow()
    }
}

impl StatusApi for ScriptedApi {
    fn fetch(&mut self) -> Result<StatusSnapshot, FetchError> {
        *self.calls.borrow_mut() += 1;
        match self.script.borrow_mut().pop_front() {
            Some(result) => result,
            None => Ok(*self.fallback.borrow()),
        }
    }
}
