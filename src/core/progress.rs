use crate::core::registry::{CompletionSet, ModuleDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::{Duration, Instant};

/// Everything the learner has achieved so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub completed_modules: CompletionSet,
    pub module_steps: BTreeMap<String, BTreeSet<usize>>,
    pub mastery_points: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressAction {
    CompleteStep { module: String, step: usize },
    CompleteModule { module: String, points: u32 },
    Reset,
}

impl ProgressState {
    pub fn steps_for(&self, module: &str) -> BTreeSet<usize> {
        self.module_steps.get(module).cloned().unwrap_or_default()
    }

    pub fn is_module_complete(&self, module: &str) -> bool {
        self.completed_modules.contains(module)
    }
}

/// Pure transition function for progress; completions only ever grow until `Reset`
pub fn reduce(state: &ProgressState, action: &ProgressAction) -> ProgressState {
    let mut next = state.clone();
    match action {
        ProgressAction::CompleteStep { module, step } => {
            next.module_steps
                .entry(module.clone())
                .or_default()
                .insert(*step);
        }
        ProgressAction::CompleteModule { module, points } => {
            if next.completed_modules.insert(module) {
                next.mastery_points += u64::from(*points);
            }
        }
        ProgressAction::Reset => next = ProgressState::default(),
    }
    next
}

/// Popup content raised when a module is finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub module_id: String,
    pub title: String,
    pub description: String,
    pub mastery_points: u32,
}

impl Achievement {
    pub fn for_module(module: &ModuleDescriptor) -> Achievement {
        Achievement {
            module_id: module.id.clone(),
            title: format!("{} mastered", module.title),
            description: format!(
                "You completed all {} steps of {}",
                module.step_count, module.title
            ),
            mastery_points: module.mastery_points,
        }
    }
}

#[derive(Debug, Clone)]
struct Toast {
    achievement: Achievement,
    expires_at: Instant,
}

/// Achievement popups currently on screen, oldest first
#[derive(Debug, Clone)]
pub struct ToastQueue {
    lifetime: Duration,
    active: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn new(lifetime: Duration) -> ToastQueue {
        ToastQueue {
            lifetime,
            active: VecDeque::new(),
        }
    }

    pub fn push(&mut self, achievement: Achievement, now: Instant) {
        self.active.push_back(Toast {
            achievement,
            expires_at: now + self.lifetime,
        });
    }

    /// Drop toasts whose lifetime has passed and return them
    pub fn expire(&mut self, now: Instant) -> Vec<Achievement> {
        let mut expired = Vec::new();
        // Lifetimes are uniform, so expiry order matches insertion order
        while let Some(front) = self.active.front() {
            if front.expires_at > now {
                break;
            }
            if let Some(toast) = self.active.pop_front() {
                expired.push(toast.achievement);
            }
        }
        expired
    }

    pub fn active(&self) -> Vec<&Achievement> {
        self.active.iter().map(|t| &t.achievement).collect()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
