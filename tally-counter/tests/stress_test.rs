//! Random vote sequences checked against a clamped reference model.

use std::sync::Arc;

use proptest::prelude::*;
use rustc_hash::FxHashMap;
use tally_core::config::StorageConfig;
use tally_core::models::{Actor, ActorSet, Key, Vote, VoteMap, VoteToken};
use tally_core::{EventDispatcher, FlushMode, StorageReadyEvent, VotingCounter, VotingStorage};
use tally_counter::{LockBasedVotingCounter, NonBlockingVotingCounter};
use tally_storage::{KvVotingStorage, MemoryKvDb, TableVotingStorage};

#[derive(Debug, Clone)]
enum Op {
    Vote { key: Key, actor: Actor, up: bool },
    Flush,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        9 => (1..=30i32, 1..=10i32, any::<bool>())
            .prop_map(|(key, actor, up)| Op::Vote { key, actor, up }),
        1 => Just(Op::Flush),
    ]
}

/// Expected vote value per (key, actor), clamped to [-1, 1].
#[derive(Default)]
struct Model {
    votes: FxHashMap<(Key, Actor), i32>,
}

impl Model {
    fn step(&mut self, key: Key, actor: Actor, up: bool) -> i32 {
        let vote = self.votes.entry((key, actor)).or_insert(0);
        *vote = (*vote + if up { 1 } else { -1 }).clamp(-1, 1);
        self.count(key)
    }

    fn count(&self, key: Key) -> i32 {
        self.votes
            .iter()
            .filter(|((k, _), _)| *k == key)
            .map(|(_, vote)| *vote)
            .sum()
    }

    fn vote(&self, key: Key, actor: Actor) -> Vote {
        match self.votes.get(&(key, actor)).copied().unwrap_or(0) {
            1 => Vote::Up,
            -1 => Vote::Down,
            _ => Vote::None,
        }
    }

    fn to_vote_map(&self) -> VoteMap {
        let mut map = VoteMap::default();
        for ((key, actor), vote) in &self.votes {
            let token = match vote {
                1 => VoteToken::up(*actor),
                -1 => VoteToken::down(*actor),
                _ => continue,
            };
            map.entry(*key).or_insert_with(ActorSet::new).set(token);
        }
        map
    }
}

fn storages() -> Vec<Arc<dyn VotingStorage>> {
    let config = StorageConfig::default();
    vec![
        Arc::new(TableVotingStorage::open_in_memory(&config).unwrap()),
        Arc::new(KvVotingStorage::new(MemoryKvDb::new("stress"), &config)),
    ]
}

fn run(counter: &dyn VotingCounter, storage: &dyn VotingStorage, ops: &[Op]) {
    let mut model = Model::default();
    for op in ops {
        match op {
            Op::Vote { key, actor, up } => {
                let expected = model.step(*key, *actor, *up);
                let actual = if *up {
                    counter.increment(*key, *actor).unwrap()
                } else {
                    counter.decrement(*key, *actor).unwrap()
                };
                assert_eq!(actual, expected, "count after {op:?}");
            }
            Op::Flush => counter.flush(FlushMode::Flush).unwrap(),
        }
    }

    counter.flush(FlushMode::FullResync).unwrap();
    assert_eq!(storage.load_all().unwrap(), model.to_vote_map());

    let keys: Vec<Key> = (1..=30).collect();
    let counts = counter.estimate_counts(&keys);
    for key in &keys {
        assert_eq!(counts[key], model.count(*key), "count of key {key}");
    }
    for actor in 1..=10 {
        let votes = counter.get_votes(&keys, actor).unwrap();
        for key in &keys {
            assert_eq!(votes[key], model.vote(*key, actor), "vote of {actor} on {key}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn lock_based_matches_model(ops in proptest::collection::vec(op_strategy(), 1..400)) {
        for storage in storages() {
            let mut events = EventDispatcher::new();
            let counter = LockBasedVotingCounter::new(storage.clone(), &mut events);
            events.emit_storage_ready(&StorageReadyEvent);
            run(counter.as_ref(), storage.as_ref(), &ops);
        }
    }

    #[test]
    fn non_blocking_matches_model(ops in proptest::collection::vec(op_strategy(), 1..400)) {
        for storage in storages() {
            let mut events = EventDispatcher::new();
            let counter = NonBlockingVotingCounter::new(storage.clone(), &mut events);
            events.emit_storage_ready(&StorageReadyEvent);
            run(counter.as_ref(), storage.as_ref(), &ops);
        }
    }
}
