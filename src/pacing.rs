use std::thread;
use std::time::Duration;

/// Decides how long to wait between consecutive API calls.
pub trait Pacer {
    fn wait_before_next_call(&self);
}

/// Best-effort politeness: sleeps a fixed time, ignores throttling signals.
pub struct FixedDelay(pub Duration);

impl Pacer for FixedDelay {
    fn wait_before_next_call(&self) {
        if !self.0.is_zero() {
            thread::sleep(self.0);
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::Cell;

    use super::Pacer;

    #[derive(Default)]
    pub struct CountingPacer {
        pub waits: Cell<usize>,
    }

    impl Pacer for CountingPacer {
        fn wait_before_next_call(&self) {
            self.waits.set(self.waits.get() + 1);
        }
    }
}
