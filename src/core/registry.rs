use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// One lesson unit of the course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Position in the course; the only tie-breaker between reachable modules
    pub order: u32,
    pub group: String,
    pub prerequisites: BTreeSet<String>,
    pub step_count: usize,
    pub mastery_points: u32,
}

impl ModuleDescriptor {
    pub fn new(id: &str, title: &str, order: u32, group: &str) -> ModuleDescriptor {
        ModuleDescriptor {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            order,
            group: group.to_string(),
            prerequisites: BTreeSet::new(),
            step_count: 1,
            mastery_points: 0,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn requires(mut self, ids: &[&str]) -> Self {
        self.prerequisites
            .extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub fn steps(mut self, step_count: usize) -> Self {
        self.step_count = step_count;
        self
    }

    pub fn points(mut self, mastery_points: u32) -> Self {
        self.mastery_points = mastery_points;
        self
    }

    /// True when every prerequisite is in `completed`
    pub fn is_unlocked_by(&self, completed: &CompletionSet) -> bool {
        self.prerequisites.iter().all(|id| completed.contains(id))
    }

    pub fn status(&self, completed: &CompletionSet) -> ModuleStatus {
        if completed.contains(&self.id) {
            ModuleStatus::Done
        } else if self.is_unlocked_by(completed) {
            ModuleStatus::Open
        } else {
            ModuleStatus::Locked
        }
    }
}

/// Where a module stands for one learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Done,
    Open,
    Locked,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStatus::Done => write!(f, "done"),
            ModuleStatus::Open => write!(f, "open"),
            ModuleStatus::Locked => write!(f, "locked"),
        }
    }
}

/// Module ids the learner has finished
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSet {
    ids: BTreeSet<String>,
}

impl CompletionSet {
    pub fn new() -> CompletionSet {
        CompletionSet::default()
    }

    /// Parse a persisted JSON array of ids. Anything else reads as empty.
    pub fn from_json_lossy(raw: &str) -> CompletionSet {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .collect(),
            Ok(_) => {
                warn!("Completion set is not an array, treating as empty");
                CompletionSet::new()
            }
            Err(e) => {
                warn!("Malformed completion set ({e}), treating as empty");
                CompletionSet::new()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::Value::from(self.ids.iter().cloned().collect::<Vec<_>>()).to_string()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if the id was already present
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        CompletionSet {
            ids: iter.into_iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// Problems found in a hand-built registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryIssue {
    DuplicateId(String),
    UnknownPrerequisite { module: String, prerequisite: String },
    Cycle(String),
}

/// Static, ordered catalogue of course modules
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    /// Sorted by `order`, then id
    modules: Vec<ModuleDescriptor>,
    index: HashMap<String, usize>,
    duplicates: Vec<String>,
}

impl ModuleRegistry {
    pub fn new(descriptors: Vec<ModuleDescriptor>) -> ModuleRegistry {
        let mut modules = descriptors;
        modules.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let mut index = HashMap::new();
        let mut duplicates = Vec::new();
        for (position, module) in modules.iter().enumerate() {
            if index.insert(module.id.clone(), position).is_some() {
                duplicates.push(module.id.clone());
            }
        }

        ModuleRegistry {
            modules,
            index,
            duplicates,
        }
    }

    /// The built-in Bitcoin course
    pub fn curriculum() -> ModuleRegistry {
        ModuleRegistry::new(vec![
            ModuleDescriptor::new("money", "What Is Money?", 1, "foundations")
                .describe("Barter, scarcity and the properties that make good money")
                .steps(4)
                .points(100),
            ModuleDescriptor::new("numbers", "Big Numbers", 2, "foundations")
                .describe("Binary, hex and why 2^256 is unimaginably large")
                .requires(&["money"])
                .steps(4)
                .points(100),
            ModuleDescriptor::new("hashing", "Hash Functions", 3, "cryptography")
                .describe("SHA-256 fingerprints, the avalanche effect and double hashing")
                .requires(&["numbers"])
                .steps(5)
                .points(150),
            ModuleDescriptor::new("keys", "Keys and Addresses", 4, "cryptography")
                .describe("Private keys, public keys and Base58Check addresses")
                .requires(&["hashing"])
                .steps(5)
                .points(150),
            ModuleDescriptor::new("transactions", "Transactions", 5, "protocol")
                .describe("Inputs, outputs, UTXOs and fees")
                .requires(&["keys"])
                .steps(6)
                .points(200),
            ModuleDescriptor::new("scripts", "Bitcoin Script", 6, "protocol")
                .describe("Locking and unlocking scripts on a stack machine")
                .requires(&["transactions"])
                .steps(5)
                .points(200),
            ModuleDescriptor::new("merkle", "Merkle Trees", 7, "protocol")
                .describe("Committing to every transaction with a single root hash")
                .requires(&["transactions", "hashing"])
                .steps(4)
                .points(200),
            ModuleDescriptor::new("mining", "Mining", 8, "consensus")
                .describe("Nonces, difficulty and the search for a winning block")
                .requires(&["merkle"])
                .steps(5)
                .points(250),
            ModuleDescriptor::new("custody", "Self-Custody", 9, "practice")
                .describe("Seed phrases, backups and keeping your own keys")
                .requires(&["keys", "mining"])
                .steps(4)
                .points(200),
            ModuleDescriptor::new("myths", "Myths and Misconceptions", 10, "practice")
                .describe("Separating common Bitcoin claims from reality")
                .requires(&["money"])
                .steps(3)
                .points(100),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.index.get(id).map(|&position| &self.modules[position])
    }

    /// All modules in course order
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn ids(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Group name to member modules, each group in course order
    pub fn groups(&self) -> BTreeMap<String, Vec<&ModuleDescriptor>> {
        let mut groups: BTreeMap<String, Vec<&ModuleDescriptor>> = BTreeMap::new();
        for module in &self.modules {
            groups.entry(module.group.clone()).or_default().push(module);
        }
        groups
    }

    pub fn is_unlocked(&self, id: &str, completed: &CompletionSet) -> bool {
        self.get(id)
            .map(|module| module.is_unlocked_by(completed))
            .unwrap_or(false)
    }

    /// Prerequisites of `id` that are not yet completed, in course order
    pub fn missing_prerequisites(&self, id: &str, completed: &CompletionSet) -> Vec<String> {
        let Some(module) = self.get(id) else {
            return Vec::new();
        };
        let mut missing: Vec<&ModuleDescriptor> = module
            .prerequisites
            .iter()
            .filter(|p| !completed.contains(p))
            .filter_map(|p| self.get(p))
            .collect();
        missing.sort_by_key(|m| m.order);
        let mut ids: Vec<String> = missing.into_iter().map(|m| m.id.clone()).collect();
        // Unknown prerequisites can never be satisfied; report them too.
        ids.extend(
            module
                .prerequisites
                .iter()
                .filter(|p| !completed.contains(p) && self.get(p).is_none())
                .cloned(),
        );
        ids
    }

    /// First reachable, unfinished module by `order`, or `None` when all are done
    pub fn get_next_module(&self, completed: &CompletionSet) -> Option<&ModuleDescriptor> {
        self.modules
            .iter()
            .find(|m| !completed.contains(&m.id) && m.is_unlocked_by(completed))
    }

    /// Every reachable module, completed or not, by `order`
    pub fn get_unlocked_modules(&self, completed: &CompletionSet) -> Vec<&ModuleDescriptor> {
        self.modules
            .iter()
            .filter(|m| m.is_unlocked_by(completed))
            .collect()
    }

    /// Check a custom registry for duplicate ids, dangling prerequisites and cycles
    pub fn validate(&self) -> Vec<RegistryIssue> {
        let mut issues: Vec<RegistryIssue> = self
            .duplicates
            .iter()
            .cloned()
            .map(RegistryIssue::DuplicateId)
            .collect();

        for module in &self.modules {
            for prerequisite in &module.prerequisites {
                if self.get(prerequisite).is_none() {
                    issues.push(RegistryIssue::UnknownPrerequisite {
                        module: module.id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm: anything left unresolved sits on a cycle
        let mut remaining: HashMap<&str, usize> = self
            .modules
            .iter()
            .map(|m| {
                let known = m
                    .prerequisites
                    .iter()
                    .filter(|p| self.get(p).is_some())
                    .count();
                (m.id.as_str(), known)
            })
            .collect();
        let mut ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut resolved = BTreeSet::new();

        while let Some(id) = ready.pop() {
            if !resolved.insert(id) {
                continue;
            }
            for module in &self.modules {
                if module.prerequisites.contains(id) {
                    if let Some(count) = remaining.get_mut(module.id.as_str()) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            ready.push(module.id.as_str());
                        }
                    }
                }
            }
        }

        for module in &self.modules {
            if !resolved.contains(module.id.as_str()) {
                issues.push(RegistryIssue::Cycle(module.id.clone()));
            }
        }
        issues
    }
}
