// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Multibuffering bookkeeping.

The main idea is,

1.  We have one CPU-side copy of some values
2.  We have N GPU-visible copies, one per frame slot
3.  A write to the CPU side has to reach all N GPU copies, because the GPU may still be reading
    any of them.

A [FlushCounter] counts how many frame slots still need the latest write.  It is reset to N on
every write and counts down once per flush of a distinct frame slot.
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlushCounter {
    frames_in_flight: usize,
    remaining: usize,
    last_flushed: Option<usize>,
}

impl FlushCounter {
    /// Starts out needing a flush of every slot, so initial contents reach the GPU.
    pub(crate) fn new(frames_in_flight: usize) -> Self {
        FlushCounter {
            frames_in_flight,
            remaining: frames_in_flight,
            last_flushed: None,
        }
    }

    /// Called on every CPU-side write.
    pub(crate) fn reset(&mut self) {
        self.remaining = self.frames_in_flight;
        self.last_flushed = None;
    }

    /**
    Decides whether `frame` needs a copy.

    Returns false when nothing is pending, or when `frame` was the slot flushed last; otherwise
    counts the flush and returns true.
    */
    pub(crate) fn begin(&mut self, frame: usize) -> bool {
        if self.remaining == 0 || self.last_flushed == Some(frame) {
            return false;
        }
        self.last_flushed = Some(frame);
        self.remaining -= 1;
        true
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    pub(crate) fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::FlushCounter;

    #[test]
    fn counts_down_once_per_distinct_frame() {
        let mut counter = FlushCounter::new(3);
        counter.reset();
        assert!(counter.begin(0));
        //same slot twice in a row is not a new frame
        assert!(!counter.begin(0));
        assert!(counter.begin(1));
        assert!(counter.begin(2));
        assert_eq!(counter.remaining(), 0);
        assert!(!counter.begin(0));
    }

    #[test]
    fn reset_restarts() {
        let mut counter = FlushCounter::new(2);
        assert!(counter.begin(0));
        counter.reset();
        assert!(counter.begin(0));
        assert!(counter.begin(1));
        assert!(!counter.begin(0));
        assert_eq!(counter.frames_in_flight(), 2);
    }
}
