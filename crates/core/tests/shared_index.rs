//! Concurrent readers against a single writer through `SharedIndex`.

mod common;

use common::random_records;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use vectorfuse_core::ivfflat::IvfFlatConfig;
use vectorfuse_core::{
    AnnIndex, IndexError, IndexParams, Metric, RecordId, SearchParams, SharedIndex,
};

const DIM: usize = 8;

fn hnsw_shared() -> SharedIndex {
    SharedIndex::new(AnnIndex::build(DIM, Metric::L2, IndexParams::default()).unwrap())
}

#[test]
fn readers_see_consistent_snapshots_during_inserts() {
    let records = random_records(400, DIM, 21);
    let shared = hnsw_shared();
    shared.insert_batch(&records[..50]).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        for reader in 0..4 {
            let shared = shared.clone();
            let done = &done;
            let query = records[reader].embedding.clone();
            s.spawn(move || {
                let mut last_len = 0;
                while !done.load(Ordering::Acquire) {
                    let snapshot = shared.snapshot();
                    let len = snapshot.len();
                    assert!(len >= last_len, "snapshot went backwards: {last_len} -> {len}");
                    last_len = len;
                    let hits = snapshot.search(&query, 5, &SearchParams::default()).unwrap();
                    assert_eq!(hits.len(), 5.min(len));
                    assert_eq!(hits[0].id, RecordId::from(reader as u64));
                }
            });
        }

        for chunk in records[50..].chunks(10) {
            shared.insert_batch(chunk).unwrap();
        }
        for r in &records[300..] {
            shared.upsert(r.id.clone(), &r.embedding).unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(shared.len(), 400);
}

#[test]
fn failed_write_leaves_index_untouched() {
    let records = random_records(20, DIM, 22);
    let shared = hnsw_shared();
    shared.insert_batch(&records[..10]).unwrap();

    // Second half repeats id 0
    let mut batch = records[10..].to_vec();
    batch.push(records[0].clone());
    assert_eq!(
        shared.insert_batch(&batch),
        Err(IndexError::DuplicateId(RecordId::from(0u64)))
    );
    assert_eq!(shared.len(), 10);
    assert!(!shared.snapshot().contains(&RecordId::from(15u64)));
}

#[test]
fn retraining_swaps_while_readers_hold_old_snapshot() {
    let records = random_records(200, DIM, 23);
    let samples: Vec<Vec<f32>> = records.iter().map(|r| r.embedding.clone()).collect();
    let params = IndexParams::IvfFlat(IvfFlatConfig {
        lists: 8,
        ..IvfFlatConfig::default()
    });
    let shared = SharedIndex::new(AnnIndex::build(DIM, Metric::L2, params).unwrap());
    shared.train(&samples).unwrap();
    shared.insert_batch(&records).unwrap();

    let search = SearchParams {
        probes: 8,
        ..SearchParams::default()
    };
    let old = shared.snapshot();
    let before = old.search(&records[3].embedding, 3, &search).unwrap();

    thread::scope(|s| {
        let trainer = shared.clone();
        let samples = &samples;
        s.spawn(move || trainer.train(samples).unwrap());
        // The held snapshot keeps answering with its own lists
        for _ in 0..50 {
            assert_eq!(old.search(&records[3].embedding, 3, &search).unwrap(), before);
        }
    });

    // Retraining empties the lists until records are inserted again
    assert!(shared.is_empty());
    assert_eq!(
        shared.search(&records[3].embedding, 3, &search),
        Err(IndexError::EmptyIndex)
    );
    shared.insert_batch(&records).unwrap();
    let after = shared.search(&records[3].embedding, 3, &search).unwrap();
    assert_eq!(after, before);
}
