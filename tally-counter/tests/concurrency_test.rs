//! Concurrent voters with a background flusher: no lost updates, and the
//! persisted state converges to the final cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rustc_hash::FxHashMap;
use tally_core::config::StorageConfig;
use tally_core::models::{ActorSet, Key, VoteMap, VoteToken};
use tally_core::{EventDispatcher, FlushMode, StorageReadyEvent, VotingCounter, VotingStorage};
use tally_counter::{LockBasedVotingCounter, NonBlockingVotingCounter};
use tally_storage::TableVotingStorage;

const THREADS: i32 = 8;
const KEYS: i32 = 16;
const ROUNDS: usize = 50;

fn file_storage(dir: &tempfile::TempDir) -> Arc<dyn VotingStorage> {
    Arc::new(TableVotingStorage::open(&dir.path().join("votes.db"), &StorageConfig::default()).unwrap())
}

/// Each thread owns one actor. Odd actors end up, even actors end down.
fn hammer(counter: Arc<dyn VotingCounter>, storage: Arc<dyn VotingStorage>) {
    let done = Arc::new(AtomicBool::new(false));
    let flusher = {
        let counter = counter.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                counter.flush(FlushMode::Flush).unwrap();
                thread::yield_now();
            }
        })
    };

    let voters: Vec<_> = (1..=THREADS)
        .map(|actor| {
            let counter = counter.clone();
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    for key in 1..=KEYS {
                        if round % 2 == 0 {
                            counter.increment(key, actor).unwrap();
                        } else {
                            counter.decrement(key, actor).unwrap();
                        }
                    }
                }
                for key in 1..=KEYS {
                    if actor % 2 == 1 {
                        counter.increment(key, actor).unwrap();
                        counter.increment(key, actor).unwrap();
                    } else {
                        counter.decrement(key, actor).unwrap();
                        counter.decrement(key, actor).unwrap();
                    }
                }
            })
        })
        .collect();
    for voter in voters {
        voter.join().unwrap();
    }
    done.store(true, Ordering::Release);
    flusher.join().unwrap();

    counter.flush(FlushMode::Flush).unwrap();

    let mut expected = VoteMap::default();
    for key in 1..=KEYS {
        let set: ActorSet = (1..=THREADS)
            .map(|actor| {
                if actor % 2 == 1 {
                    VoteToken::up(actor)
                } else {
                    VoteToken::down(actor)
                }
            })
            .collect();
        expected.insert(key, set);
    }
    assert_eq!(storage.load_all().unwrap(), expected);

    let keys: Vec<Key> = (1..=KEYS).collect();
    let expected_counts: FxHashMap<Key, i32> = keys.iter().map(|key| (*key, 0)).collect();
    assert_eq!(counter.estimate_counts(&keys), expected_counts);

    counter.flush(FlushMode::FullResync).unwrap();
    assert_eq!(counter.estimate_counts(&keys), expected_counts);
}

#[test]
fn lock_based_concurrent_votes_and_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);
    let mut events = EventDispatcher::new();
    let counter = LockBasedVotingCounter::new(storage.clone(), &mut events);
    events.emit_storage_ready(&StorageReadyEvent);
    hammer(counter, storage);
}

#[test]
fn non_blocking_concurrent_votes_and_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let storage = file_storage(&dir);
    let mut events = EventDispatcher::new();
    let counter = NonBlockingVotingCounter::new(storage.clone(), &mut events);
    events.emit_storage_ready(&StorageReadyEvent);
    hammer(counter, storage);
}

#[test]
fn contended_key_counts_every_actor() {
    let config = StorageConfig::default();
    let storage: Arc<dyn VotingStorage> =
        Arc::new(TableVotingStorage::open_in_memory(&config).unwrap());
    let mut events = EventDispatcher::new();
    let counters: [Arc<dyn VotingCounter>; 2] = [
        LockBasedVotingCounter::new(storage.clone(), &mut events),
        NonBlockingVotingCounter::new(storage.clone(), &mut events),
    ];
    for (offset, counter) in counters.into_iter().enumerate() {
        let key = 7 + offset as Key;
        let handles: Vec<_> = (1..=64)
            .map(|actor| {
                let counter = counter.clone();
                thread::spawn(move || counter.increment(key, actor).unwrap())
            })
            .collect();
        let mut seen: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=64).collect::<Vec<_>>(), "every increment observed a distinct count");
        assert_eq!(counter.estimate_count(key), 64);
    }
}
