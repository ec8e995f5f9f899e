use crate::error::{AcademyError, Result};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Result of completing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// False when the step had already been completed
    pub newly_completed: bool,
    /// True once every step of the module is completed
    pub module_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAdvance {
    to: usize,
    due: Instant,
}

/// Step state machine shared by every lesson module
///
/// Completing step `i` marks it done and, unless it is the last step,
/// schedules a move to `i + 1` after the auto-advance delay. The pending
/// move lives inside the stepper, so dropping the stepper or navigating
/// away with [`Stepper::go_to`] cancels it.
#[derive(Debug, Clone)]
pub struct Stepper {
    step_count: usize,
    current_step: usize,
    completed_steps: BTreeSet<usize>,
    auto_advance: Duration,
    pending: Option<PendingAdvance>,
}

impl Stepper {
    pub fn new(step_count: usize, auto_advance: Duration) -> Stepper {
        Stepper {
            step_count,
            current_step: 0,
            completed_steps: BTreeSet::new(),
            auto_advance,
            pending: None,
        }
    }

    /// Rebuild from persisted step indices; out-of-range entries are dropped
    pub fn restore<I>(step_count: usize, auto_advance: Duration, completed: I) -> Stepper
    where
        I: IntoIterator<Item = usize>,
    {
        let mut stepper = Stepper::new(step_count, auto_advance);
        stepper.completed_steps = completed.into_iter().filter(|&s| s < step_count).collect();
        stepper.current_step = stepper.first_incomplete().unwrap_or(step_count.saturating_sub(1));
        stepper
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn completed_steps(&self) -> &BTreeSet<usize> {
        &self.completed_steps
    }

    pub fn is_step_completed(&self, step: usize) -> bool {
        self.completed_steps.contains(&step)
    }

    pub fn is_complete(&self) -> bool {
        self.completed_steps.len() == self.step_count
    }

    /// Step the stepper will move to on the next poll, if any
    pub fn pending_advance(&self) -> Option<usize> {
        self.pending.map(|p| p.to)
    }

    pub fn first_incomplete(&self) -> Option<usize> {
        (0..self.step_count).find(|s| !self.completed_steps.contains(s))
    }

    pub fn complete_step(&mut self, step: usize, now: Instant) -> Result<StepOutcome> {
        self.check_step(step)?;

        let newly_completed = self.completed_steps.insert(step);
        if newly_completed && step + 1 < self.step_count {
            self.pending = Some(PendingAdvance {
                to: step + 1,
                due: now + self.auto_advance,
            });
        }

        Ok(StepOutcome {
            newly_completed,
            module_complete: self.is_complete(),
        })
    }

    /// Apply a due auto-advance. Returns the new step when one was applied.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        match self.pending {
            Some(pending) if now >= pending.due => {
                self.pending = None;
                self.current_step = pending.to;
                Some(pending.to)
            }
            _ => None,
        }
    }

    /// Manual navigation; cancels any pending auto-advance
    pub fn go_to(&mut self, step: usize) -> Result<()> {
        self.check_step(step)?;
        self.pending = None;
        self.current_step = step;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_step = 0;
        self.completed_steps.clear();
        self.pending = None;
    }

    fn check_step(&self, step: usize) -> Result<()> {
        if step >= self.step_count {
            return Err(AcademyError::InvalidStep {
                step,
                step_count: self.step_count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn test_complete_schedules_advance_after_delay() {
        let start = Instant::now();
        let mut stepper = Stepper::new(3, DELAY);

        let outcome = stepper.complete_step(0, start).unwrap();
        assert!(outcome.newly_completed);
        assert!(!outcome.module_complete);
        assert_eq!(stepper.pending_advance(), Some(1));

        assert_eq!(stepper.poll(start + Duration::from_millis(499)), None);
        assert_eq!(stepper.current_step(), 0);
        assert_eq!(stepper.poll(start + DELAY), Some(1));
        assert_eq!(stepper.current_step(), 1);
        assert_eq!(stepper.poll(start + DELAY * 4), None);
    }

    #[test]
    fn test_last_step_completes_without_advance() {
        let now = Instant::now();
        let mut stepper = Stepper::new(2, DELAY);
        stepper.complete_step(0, now).unwrap();
        stepper.poll(now + DELAY);

        let outcome = stepper.complete_step(1, now + DELAY).unwrap();
        assert!(outcome.module_complete);
        assert!(stepper.is_complete());
        assert_eq!(stepper.pending_advance(), None);
        assert_eq!(stepper.current_step(), 1);
    }

    #[test]
    fn test_repeat_completion_is_idempotent() {
        let now = Instant::now();
        let mut stepper = Stepper::new(3, DELAY);
        stepper.complete_step(1, now).unwrap();
        stepper.go_to(0).unwrap();

        let again = stepper.complete_step(1, now).unwrap();
        assert!(!again.newly_completed);
        assert_eq!(stepper.completed_steps().len(), 1);
        assert_eq!(stepper.pending_advance(), None);
    }

    #[test]
    fn test_navigation_cancels_pending_advance() {
        let now = Instant::now();
        let mut stepper = Stepper::new(4, DELAY);
        stepper.complete_step(0, now).unwrap();
        stepper.go_to(3).unwrap();
        assert_eq!(stepper.poll(now + DELAY), None);
        assert_eq!(stepper.current_step(), 3);
    }

    #[test]
    fn test_out_of_range_step() {
        let mut stepper = Stepper::new(2, DELAY);
        assert!(matches!(
            stepper.complete_step(2, Instant::now()),
            Err(AcademyError::InvalidStep {
                step: 2,
                step_count: 2
            })
        ));
        assert!(stepper.go_to(5).is_err());
    }

    #[test]
    fn test_restore_resumes_at_first_incomplete() {
        let stepper = Stepper::restore(4, DELAY, vec![0, 1, 9]);
        assert_eq!(stepper.completed_steps().len(), 2);
        assert_eq!(stepper.current_step(), 2);

        let done = Stepper::restore(2, DELAY, vec![0, 1]);
        assert!(done.is_complete());
        assert_eq!(done.current_step(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let now = Instant::now();
        let mut stepper = Stepper::new(2, DELAY);
        stepper.complete_step(0, now).unwrap();
        stepper.reset();
        assert!(stepper.completed_steps().is_empty());
        assert_eq!(stepper.pending_advance(), None);
        assert_eq!(stepper.current_step(), 0);
    }
}
