// Recording output double for scheduler and session tests

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::audio::{AudioBuffer, AudioOutput, OutputError, OutputHandle};

#[derive(Debug, Default)]
pub struct MockLog {
    pub acquires: usize,
    pub releases: usize,
    pub live: usize,
    pub max_live: usize,
    /// (offset_secs, rate) per start
    pub starts: Vec<(f64, f64)>,
    pub gains: Vec<f32>,
    pub rates: Vec<f64>,
    pub fail_acquire: bool,
}

pub struct MockOutput {
    log: Rc<RefCell<MockLog>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(MockLog::default())),
        }
    }

    pub fn log(&self) -> Rc<RefCell<MockLog>> {
        self.log.clone()
    }
}

impl AudioOutput for MockOutput {
    fn acquire(&mut self, _sample_rate: u32, _channels: u16) -> Result<Box<dyn OutputHandle>, OutputError> {
        let mut log = self.log.borrow_mut();
        if log.fail_acquire {
            return Err(OutputError::Unavailable("mock device missing".into()));
        }
        log.acquires += 1;
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        Ok(Box::new(MockHandle {
            log: self.log.clone(),
        }))
    }

    fn release(&mut self, _handle: Box<dyn OutputHandle>) {
        let mut log = self.log.borrow_mut();
        log.releases += 1;
        log.live -= 1;
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockHandle {
    log: Rc<RefCell<MockLog>>,
}

impl OutputHandle for MockHandle {
    fn start(&mut self, _buffer: Arc<AudioBuffer>, offset_secs: f64, rate: f64) -> Result<(), OutputError> {
        self.log.borrow_mut().starts.push((offset_secs, rate));
        Ok(())
    }

    fn stop(&mut self) {}

    fn set_gain(&mut self, gain: f32) {
        self.log.borrow_mut().gains.push(gain);
    }

    fn set_rate(&mut self, rate: f64) {
        self.log.borrow_mut().rates.push(rate);
    }
}
