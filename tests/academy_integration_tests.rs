//! Academy integration tests
//!
//! Walks the full course through a persisted session and checks the
//! properties the lessons rely on: unlock ordering, Merkle proofs and hashing.

use bitcoin_academy::core::{MiningSimulator, ModuleDescriptor};
use bitcoin_academy::{
    hash256, sha256, AcademyError, AdaptationLevel, CompletionSet, Config, LearningSession,
    MerkleTree, ModuleRegistry, ProgressStore,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn open_session(dir: &Path) -> LearningSession {
    LearningSession::open(&Config::with_data_dir(dir)).unwrap()
}

#[test]
fn test_full_course_walkthrough() {
    let temp_dir = tempdir().unwrap();
    let mut session = open_session(temp_dir.path());
    let now = Instant::now();
    let total_points: u64 = session
        .registry()
        .modules()
        .iter()
        .map(|m| u64::from(m.mastery_points))
        .sum();

    assert_eq!(session.next_module().unwrap().id, "money");
    assert!(matches!(
        session.open_module("mining"),
        Err(AcademyError::ModuleLocked { .. })
    ));

    let mut finished = Vec::new();
    while let Some(next) = session.next_module() {
        let id = next.id.clone();
        let achievement = session.complete_module(&id, now).unwrap();
        assert_eq!(achievement.unwrap().module_id, id);
        finished.push(id);
    }

    assert_eq!(
        finished,
        vec![
            "money",
            "numbers",
            "hashing",
            "keys",
            "transactions",
            "scripts",
            "merkle",
            "mining",
            "custody",
            "myths"
        ]
    );
    assert_eq!(session.state().mastery_points, total_points);
    assert_eq!(session.unlocked_modules().len(), session.registry().len());
}

#[test]
fn test_progress_resumes_in_new_session() {
    let temp_dir = tempdir().unwrap();
    let now = Instant::now();

    {
        let mut session = open_session(temp_dir.path());
        session.complete_module("money", now).unwrap();
        session.complete_step("numbers", 0, now).unwrap();
        session.complete_step("numbers", 1, now).unwrap();
    }

    let mut session = open_session(temp_dir.path());
    assert!(session.state().is_module_complete("money"));
    assert_eq!(session.state().mastery_points, 100);
    assert_eq!(session.next_module().unwrap().id, "numbers");

    let stepper = session.open_module("numbers").unwrap();
    assert_eq!(stepper.current_step(), 2);
    assert_eq!(stepper.completed_steps().len(), 2);
}

#[test]
fn test_auto_advance_follows_configured_delay() {
    let temp_dir = tempdir().unwrap();
    let config = Config::with_data_dir(temp_dir.path());
    config.set_auto_advance_ms(100);
    let store = ProgressStore::open_in(temp_dir.path()).unwrap();
    let mut session = LearningSession::new(ModuleRegistry::curriculum(), store, &config);
    let now = Instant::now();

    session.complete_step("money", 0, now).unwrap();
    assert!(session.poll(now + Duration::from_millis(99)).advanced.is_empty());
    let report = session.poll(now + Duration::from_millis(100));
    assert_eq!(report.advanced, vec![("money".to_string(), 1)]);
    assert_eq!(session.stepper("money").unwrap().current_step(), 1);
}

#[test]
fn test_settings_persist_and_survive_reset() {
    let temp_dir = tempdir().unwrap();
    {
        let mut session = open_session(temp_dir.path());
        session.complete_module("money", Instant::now()).unwrap();
        session.store().set_volume(1.7);
        session
            .store()
            .set_adaptation_level(AdaptationLevel::Advanced);
        session.reset().unwrap();
    }

    let session = open_session(temp_dir.path());
    assert!(session.state().completed_modules.is_empty());
    let settings = session.store().load_settings();
    assert_eq!(settings.volume, 1.0);
    assert_eq!(settings.adaptation_level, AdaptationLevel::Advanced);
}

#[test]
fn test_resolver_scenario_from_course_design() {
    let registry = ModuleRegistry::new(vec![
        ModuleDescriptor::new("A", "A", 1, "g"),
        ModuleDescriptor::new("B", "B", 2, "g").requires(&["A"]),
        ModuleDescriptor::new("C", "C", 3, "g").requires(&["B"]),
    ]);

    let empty = CompletionSet::from_json_lossy("null");
    assert_eq!(registry.get_next_module(&empty).unwrap().id, "A");

    let a = CompletionSet::from_json_lossy("[\"A\"]");
    assert_eq!(registry.get_next_module(&a).unwrap().id, "B");
    let unlocked: Vec<&str> = registry
        .get_unlocked_modules(&a)
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(unlocked, vec!["A", "B"]);

    let all = CompletionSet::from_json_lossy("[\"A\",\"B\",\"C\"]");
    assert!(registry.get_next_module(&all).is_none());
}

#[test]
fn test_merkle_proofs_for_block_of_transactions() {
    let transactions: Vec<String> = (0..7)
        .map(|i| format!("alice pays bob {i} sats"))
        .collect();
    let tree = MerkleTree::build(&transactions).unwrap();
    let rebuilt = MerkleTree::build(&transactions).unwrap();
    assert_eq!(tree.root_hash(), rebuilt.root_hash());
    assert_eq!(tree.height(), 4);

    for (i, tx) in transactions.iter().enumerate() {
        let proof = tree.build_proof(i).unwrap();
        assert!(proof.verify(tree.root_hash()));
        assert!(proof.verify_item(tx, tree.root_hash()));
    }

    let mut altered = transactions.clone();
    altered[6] = "alice pays mallory 6 sats".to_string();
    let forged = MerkleTree::build(&altered).unwrap();
    assert_ne!(forged.root_hash(), tree.root_hash());
    assert!(!tree.verify_proof(&forged.build_proof(6).unwrap()));
}

#[test]
fn test_hash256_is_sha256_twice() {
    for text in ["", "hello", "The Times 03/Jan/2009 Chancellor on brink of second bailout"] {
        assert_eq!(hash256(text), sha256(&sha256(text)));
        assert_eq!(hash256(text), hash256(text));
    }
}

#[test]
fn test_mining_simulation_is_repeatable_with_seed() {
    let mut first = MiningSimulator::new(4, 0.1);
    let mut second = MiningSimulator::new(4, 0.1);
    let a = first.run(&mut StdRng::seed_from_u64(2009), 500);
    let b = second.run(&mut StdRng::seed_from_u64(2009), 500);
    assert_eq!(a, b);
    assert!(a.unwrap().hash.starts_with("0000"));
}
