use crate::config::Config;
use crate::core::progress::{reduce, Achievement, ProgressAction, ProgressState, ToastQueue};
use crate::core::registry::{ModuleDescriptor, ModuleRegistry};
use crate::core::stepper::{StepOutcome, Stepper};
use crate::error::{AcademyError, Result};
use crate::storage::ProgressStore;
use log::info;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What happened when a step was completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub module: String,
    pub step: usize,
    pub outcome: StepOutcome,
    /// Set only the first time the module is finished
    pub achievement: Option<Achievement>,
}

/// Timer work done by [`LearningSession::poll`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub advanced: Vec<(String, usize)>,
    pub expired_toasts: Vec<Achievement>,
}

/// One learner's run through the course
///
/// Owns the registry, the persisted progress, a stepper per opened module
/// and the achievement toasts. Every completion goes through the pure
/// progress reducer and is then written to the store.
pub struct LearningSession {
    registry: ModuleRegistry,
    store: ProgressStore,
    state: ProgressState,
    steppers: HashMap<String, Stepper>,
    toasts: ToastQueue,
    auto_advance: Duration,
}

impl LearningSession {
    pub fn new(registry: ModuleRegistry, store: ProgressStore, config: &Config) -> LearningSession {
        let state = store.load_progress();
        info!(
            "Session loaded: {} of {} modules completed, {} mastery points",
            state.completed_modules.len(),
            registry.len(),
            state.mastery_points
        );
        LearningSession {
            registry,
            store,
            state,
            steppers: HashMap::new(),
            toasts: ToastQueue::new(config.get_toast_lifetime()),
            auto_advance: config.get_auto_advance_delay(),
        }
    }

    /// Built-in curriculum with progress stored under the configured data directory
    pub fn open(config: &Config) -> Result<LearningSession> {
        let store = ProgressStore::open_in(&config.get_data_dir())?;
        Ok(Self::new(ModuleRegistry::curriculum(), store, config))
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn next_module(&self) -> Option<&ModuleDescriptor> {
        self.registry.get_next_module(&self.state.completed_modules)
    }

    pub fn unlocked_modules(&self) -> Vec<&ModuleDescriptor> {
        self.registry
            .get_unlocked_modules(&self.state.completed_modules)
    }

    fn check_unlocked(&self, id: &str) -> Result<&ModuleDescriptor> {
        let module = self
            .registry
            .get(id)
            .ok_or_else(|| AcademyError::UnknownModule(id.to_string()))?;
        if !module.is_unlocked_by(&self.state.completed_modules) {
            return Err(AcademyError::ModuleLocked {
                module: id.to_string(),
                missing: self
                    .registry
                    .missing_prerequisites(id, &self.state.completed_modules),
            });
        }
        Ok(module)
    }

    /// Enter a module, restoring its stepper from saved progress
    pub fn open_module(&mut self, id: &str) -> Result<&Stepper> {
        let step_count = self.check_unlocked(id)?.step_count;
        let auto_advance = self.auto_advance;
        let saved = self.state.steps_for(id);
        Ok(self
            .steppers
            .entry(id.to_string())
            .or_insert_with(|| Stepper::restore(step_count, auto_advance, saved)))
    }

    pub fn stepper(&self, id: &str) -> Option<&Stepper> {
        self.steppers.get(id)
    }

    /// Leave a module; its pending auto-advance is dropped with the stepper
    pub fn close_module(&mut self, id: &str) {
        self.steppers.remove(id);
    }

    pub fn complete_step(&mut self, id: &str, step: usize, now: Instant) -> Result<StepReport> {
        self.open_module(id)?;
        let module = self.check_unlocked(id)?.clone();
        let stepper = self
            .steppers
            .get_mut(id)
            .ok_or_else(|| AcademyError::UnknownModule(id.to_string()))?;
        let outcome = stepper.complete_step(step, now)?;

        if outcome.newly_completed {
            self.state = reduce(
                &self.state,
                &ProgressAction::CompleteStep {
                    module: id.to_string(),
                    step,
                },
            );
            self.store
                .save_module_steps(id, &self.state.steps_for(id));
        }

        let mut achievement = None;
        if outcome.module_complete && !self.state.is_module_complete(id) {
            achievement = Some(self.finish_module(&module, now));
        }

        Ok(StepReport {
            module: id.to_string(),
            step,
            outcome,
            achievement,
        })
    }

    /// Complete every remaining step of a module at once
    pub fn complete_module(&mut self, id: &str, now: Instant) -> Result<Option<Achievement>> {
        let remaining: Vec<usize> = {
            let stepper = self.open_module(id)?;
            (0..stepper.step_count())
                .filter(|s| !stepper.is_step_completed(*s))
                .collect()
        };

        let mut achievement = None;
        for step in remaining {
            let report = self.complete_step(id, step, now)?;
            if report.achievement.is_some() {
                achievement = report.achievement;
            }
        }

        // No step was left to report it: a module without steps, or one whose
        // steps were all saved before the completion was
        let stepper_done = self.steppers.get(id).is_some_and(Stepper::is_complete);
        if achievement.is_none() && stepper_done && !self.state.is_module_complete(id) {
            let module = self.check_unlocked(id)?.clone();
            achievement = Some(self.finish_module(&module, now));
        }
        Ok(achievement)
    }

    /// Record a finished module, award its points and queue the toast
    fn finish_module(&mut self, module: &ModuleDescriptor, now: Instant) -> Achievement {
        self.state = reduce(
            &self.state,
            &ProgressAction::CompleteModule {
                module: module.id.clone(),
                points: module.mastery_points,
            },
        );
        self.store
            .save_completed_modules(&self.state.completed_modules);
        self.store.save_mastery_points(self.state.mastery_points);

        let earned = Achievement::for_module(module);
        self.toasts.push(earned.clone(), now);
        info!(
            "Module {} completed, +{} mastery points",
            module.id, module.mastery_points
        );
        earned
    }

    /// Apply due auto-advances and retire expired toasts
    pub fn poll(&mut self, now: Instant) -> PollReport {
        let mut advanced: Vec<(String, usize)> = self
            .steppers
            .iter_mut()
            .filter_map(|(id, stepper)| stepper.poll(now).map(|step| (id.clone(), step)))
            .collect();
        advanced.sort();

        PollReport {
            advanced,
            expired_toasts: self.toasts.expire(now),
        }
    }

    /// Forget all progress; settings are kept
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset()?;
        self.state = reduce(&self.state, &ProgressAction::Reset);
        self.steppers.clear();
        self.toasts.clear();
        Ok(())
    }
}
