//! End-to-end acceptance scenarios.

use vectorfuse_core::ivfflat::{IvfFlatConfig, IvfFlatIndex};
use vectorfuse_core::search::{fuse, FusionWeights, LexicalHit, SearchHit};
use vectorfuse_core::{AnnIndex, IndexError, IndexParams, Metric, RecordId, SearchParams};

#[test]
fn cosine_top2_orders_by_similarity() {
    let mut index = AnnIndex::build(2, Metric::Cosine, IndexParams::default()).unwrap();
    index.insert(RecordId::from(1u64), &[1.0, 0.0]).unwrap();
    index.insert(RecordId::from(2u64), &[0.0, 1.0]).unwrap();
    index.insert(RecordId::from(3u64), &[0.9, 0.1]).unwrap();

    let hits = index.search(&[1.0, 0.0], 2, &SearchParams::default()).unwrap();
    let ids: Vec<RecordId> = hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(ids, vec![RecordId::from(1u64), RecordId::from(3u64)]);
    assert!((hits[0].similarity - 1.0).abs() < 1e-9);
    assert!(hits[0].similarity > hits[1].similarity);
}

#[test]
fn fusion_ranks_shared_id_first() {
    let vector_hits: Vec<SearchHit> = [5u64, 2, 9]
        .iter()
        .enumerate()
        .map(|(i, &id)| SearchHit {
            id: RecordId::from(id),
            similarity: 0.9 - i as f64 * 0.1,
        })
        .collect();
    let lexical_hits: Vec<LexicalHit> = [2u64, 7]
        .iter()
        .enumerate()
        .map(|(i, &id)| LexicalHit {
            id: RecordId::from(id),
            score: 3.0 - i as f64,
        })
        .collect();

    let fused = fuse(&vector_hits, &lexical_hits, FusionWeights::default(), 50.0, 3).unwrap();
    assert_eq!(fused.len(), 3);
    assert_eq!(fused[0].id, RecordId::from(2u64));
    assert!(fused[0].hybrid_score > fused[1].hybrid_score);
    assert_eq!(fused[0].vector_rank, Some(2));
    assert_eq!(fused[0].lexical_rank, Some(1));
}

#[test]
fn ivf_train_with_too_few_samples() {
    let config = IvfFlatConfig {
        lists: 10,
        ..IvfFlatConfig::default()
    };
    let mut index = IvfFlatIndex::build(4, Metric::L2, config).unwrap();
    let samples: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32; 4]).collect();
    assert_eq!(
        index.train(&samples),
        Err(IndexError::InsufficientTrainingData {
            required: 10,
            provided: 5
        })
    );
}

#[test]
fn hnsw_search_on_empty_index() {
    let index = AnnIndex::build(8, Metric::Cosine, IndexParams::default()).unwrap();
    assert_eq!(
        index.search(&[0.5; 8], 5, &SearchParams::default()),
        Err(IndexError::EmptyIndex)
    );
}

#[test]
fn dimension_mismatch_everywhere() {
    let mut index = AnnIndex::build(3, Metric::L2, IndexParams::default()).unwrap();
    let expected = IndexError::DimensionMismatch {
        expected: 3,
        actual: 2,
    };
    assert_eq!(index.insert(RecordId::from(1u64), &[1.0, 2.0]), Err(expected.clone()));
    index.insert(RecordId::from(1u64), &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(
        index.search(&[1.0, 2.0], 1, &SearchParams::default()),
        Err(expected)
    );
}

#[test]
fn ivf_dimension_mismatch_everywhere() {
    let params = IndexParams::IvfFlat(IvfFlatConfig {
        lists: 2,
        ..IvfFlatConfig::default()
    });
    let mut index = AnnIndex::build(3, Metric::L2, params).unwrap();
    let expected = IndexError::DimensionMismatch {
        expected: 3,
        actual: 2,
    };
    let bad_samples = vec![vec![0.0f32, 0.0, 0.0], vec![1.0, 1.0]];
    assert_eq!(index.train(&bad_samples), Err(expected.clone()));

    let samples = vec![vec![0.0f32, 0.0, 0.0], vec![5.0, 5.0, 5.0]];
    index.train(&samples).unwrap();
    assert_eq!(index.insert(RecordId::from(1u64), &[1.0, 2.0]), Err(expected.clone()));
    index.insert(RecordId::from(1u64), &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(
        index.search(&[1.0, 2.0], 1, &SearchParams::default()),
        Err(expected)
    );
    assert_eq!(index.len(), 1);
}

#[test]
fn removed_id_is_never_returned_and_can_return() {
    let mut index = AnnIndex::build(2, Metric::L2, IndexParams::default()).unwrap();
    for i in 0..20u64 {
        index.insert(RecordId::from(i), &[i as f32, 0.0]).unwrap();
    }
    let gone = RecordId::from(7u64);
    index.remove(&gone).unwrap();
    let hits = index.search(&[7.0, 0.0], 20, &SearchParams::default()).unwrap();
    assert_eq!(hits.len(), 19);
    assert!(hits.iter().all(|h| h.id != gone));

    index.insert(gone.clone(), &[7.0, 0.0]).unwrap();
    let hits = index.search(&[7.0, 0.0], 1, &SearchParams::default()).unwrap();
    assert_eq!(hits[0].id, gone);
}
