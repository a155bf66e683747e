//! Frame slot counter

/// Round-robin frame slot index, advanced once per presented frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter {
    slot: usize,
    frames_in_flight: usize,
}

impl FrameCounter {
    /// Counter over `frames_in_flight` slots, starting at slot 0
    pub fn new(frames_in_flight: usize) -> Self {
        debug_assert!(frames_in_flight > 0, "frames_in_flight must be non-zero");
        Self {
            slot: 0,
            frames_in_flight: frames_in_flight.max(1),
        }
    }

    /// Current slot
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Number of slots
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Move to the next slot and return it
    pub fn advance(&mut self) -> usize {
        self.slot = (self.slot + 1) % self.frames_in_flight;
        self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_wraps() {
        let mut counter = FrameCounter::new(2);
        let slots: Vec<usize> = (0..5).map(|_| counter.advance()).collect();
        assert_eq!(slots, vec![1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_single_slot_counter_stays_at_zero() {
        let mut counter = FrameCounter::new(1);
        assert_eq!(counter.advance(), 0);
        assert_eq!(counter.slot(), 0);
    }

    #[test]
    fn test_three_slots() {
        let mut counter = FrameCounter::new(3);
        assert_eq!(counter.slot(), 0);
        counter.advance();
        counter.advance();
        assert_eq!(counter.slot(), 2);
        assert_eq!(counter.advance(), 0);
    }
}
