//! Property tests for vector index search ordering.

use docchat_rag::document::{DocumentId, Segment};
use docchat_rag::index::{IndexEntry, VectorIndex, cosine_similarity};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn entries_from(embeddings: Vec<Vec<f32>>) -> Vec<IndexEntry> {
    embeddings
        .into_iter()
        .enumerate()
        .map(|(ordinal, embedding)| IndexEntry {
            segment: Segment {
                document_id: DocumentId::new("doc_1"),
                ordinal,
                start: ordinal * 10,
                text: format!("segment {ordinal}"),
            },
            embedding,
        })
        .collect()
}

/// Search returns at most `k` hits, ordered by descending cosine similarity,
/// and no excluded entry scores higher than the weakest returned hit.
mod prop_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            embeddings in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let count = embeddings.len();
            let index =
                VectorIndex::from_entries("doc_1".into(), entries_from(embeddings)).unwrap();
            let results = index.search_vector(&query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(count));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }

            if let Some(weakest) = results.last() {
                for entry in index.entries() {
                    let returned =
                        results.iter().any(|r| r.segment.ordinal == entry.segment.ordinal);
                    if !returned {
                        prop_assert!(cosine_similarity(&entry.embedding, &query) <= weakest.score);
                    }
                }
            }
        }

        #[test]
        fn equal_scores_keep_segment_order(
            embedding in arb_normalized_embedding(DIM),
            copies in 2usize..10,
            k in 1usize..12,
        ) {
            let index = VectorIndex::from_entries(
                "doc_1".into(),
                entries_from(vec![embedding.clone(); copies]),
            )
            .unwrap();
            let results = index.search_vector(&embedding, k).unwrap();

            let ordinals: Vec<usize> = results.iter().map(|r| r.segment.ordinal).collect();
            let expected: Vec<usize> = (0..k.min(copies)).collect();
            prop_assert_eq!(ordinals, expected);
        }

        #[test]
        fn every_hit_belongs_to_the_searched_document(
            embeddings in proptest::collection::vec(arb_normalized_embedding(DIM), 1..10),
            query in arb_normalized_embedding(DIM),
        ) {
            let index =
                VectorIndex::from_entries("doc_1".into(), entries_from(embeddings)).unwrap();
            for hit in index.search_vector(&query, 10).unwrap() {
                prop_assert_eq!(hit.segment.document_id.as_str(), "doc_1");
            }
        }
    }
}
