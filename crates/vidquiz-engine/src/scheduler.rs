//! Time-Slot Scheduler
//!
//! Watches the observed playback time and fires each slot exactly once
//! when the time crosses its threshold. Activation is threshold-based
//! (`>=`), never equality, so coarse time-update granularity cannot
//! step over a slot. Every tick evaluates all not-yet-activated slots,
//! so duplicate thresholds each fire in the same tick.

use crate::types::TimeSlot;

/// Fires "activate slot i" at most once per slot per session.
/// Backward seeks never re-arm a fired slot; only [`reset`] does.
///
/// [`reset`]: TimeSlotScheduler::reset
#[derive(Clone, Debug)]
pub struct TimeSlotScheduler {
    triggers: Vec<f64>,
    activated: Vec<bool>,
}

impl TimeSlotScheduler {
    pub fn new(slots: &[TimeSlot]) -> Self {
        Self {
            triggers: slots.iter().map(|slot| slot.trigger_seconds).collect(),
            activated: vec![false; slots.len()],
        }
    }

    /// Feed one observed playback time. Returns the indices of every
    /// slot newly activated by this tick, ordered by trigger time then
    /// slot index.
    pub fn observe(&mut self, seconds: f64) -> Vec<usize> {
        if seconds.is_nan() {
            return Vec::new();
        }

        let mut fired: Vec<usize> = self
            .triggers
            .iter()
            .enumerate()
            .filter(|(index, trigger)| !self.activated[*index] && seconds >= **trigger)
            .map(|(index, _)| index)
            .collect();
        fired.sort_by(|a, b| {
            self.triggers[*a]
                .partial_cmp(&self.triggers[*b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });

        for &index in &fired {
            self.activated[index] = true;
        }
        fired
    }

    pub fn is_activated(&self, index: usize) -> bool {
        self.activated.get(index).copied().unwrap_or(false)
    }

    pub fn activated_count(&self) -> usize {
        self.activated.iter().filter(|&&fired| fired).count()
    }

    /// Clear every activation flag (session restart)
    pub fn reset(&mut self) {
        self.activated.iter_mut().for_each(|fired| *fired = false);
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(triggers: &[f64]) -> Vec<TimeSlot> {
        triggers
            .iter()
            .map(|&trigger| TimeSlot::new(trigger, vec![]))
            .collect()
    }

    #[test]
    fn test_fires_on_threshold_crossing() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[10.0]));
        assert!(scheduler.observe(9.6).is_empty());
        assert_eq!(scheduler.observe(10.0), vec![0]);
    }

    #[test]
    fn test_fires_once_per_slot() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[10.0]));
        assert_eq!(scheduler.observe(10.3), vec![0]);
        assert!(scheduler.observe(11.0).is_empty());
        assert!(scheduler.observe(12.0).is_empty());
    }

    #[test]
    fn test_backward_seek_never_refires() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[10.0]));
        assert_eq!(scheduler.observe(15.0), vec![0]);
        assert!(scheduler.observe(2.0).is_empty());
        assert!(scheduler.observe(11.0).is_empty());
        assert_eq!(scheduler.activated_count(), 1);
    }

    #[test]
    fn test_duplicate_thresholds_fire_in_same_tick() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[5.0, 5.0]));
        assert_eq!(scheduler.observe(5.2), vec![0, 1]);
        assert!(scheduler.observe(5.4).is_empty());
    }

    #[test]
    fn test_coarse_tick_activates_every_crossed_slot() {
        // A seek or a slow tick can jump past several thresholds.
        let mut scheduler = TimeSlotScheduler::new(&slots(&[30.0, 10.0, 20.0]));
        assert_eq!(scheduler.observe(35.0), vec![1, 2, 0]);
    }

    #[test]
    fn test_never_fires_twice_for_arbitrary_sequences() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[5.0, 10.0, 15.0]));
        let mut fired_log = Vec::new();
        for &t in &[1.0, 6.0, 3.0, 12.0, 4.0, 30.0, 2.0, 30.0] {
            fired_log.extend(scheduler.observe(t));
        }
        fired_log.sort_unstable();
        assert_eq!(fired_log, vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_trigger_fires_on_first_tick() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[0.0]));
        assert_eq!(scheduler.observe(0.0), vec![0]);
    }

    #[test]
    fn test_nan_tick_is_ignored() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[5.0]));
        assert!(scheduler.observe(f64::NAN).is_empty());
        assert_eq!(scheduler.observe(5.0), vec![0]);
    }

    #[test]
    fn test_reset_rearms_all_slots() {
        let mut scheduler = TimeSlotScheduler::new(&slots(&[5.0, 10.0]));
        scheduler.observe(20.0);
        assert_eq!(scheduler.activated_count(), 2);
        scheduler.reset();
        assert_eq!(scheduler.activated_count(), 0);
        assert_eq!(scheduler.observe(20.0), vec![0, 1]);
    }
}
