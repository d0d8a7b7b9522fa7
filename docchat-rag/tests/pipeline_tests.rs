//! End-to-end tests for indexing and answering with offline providers.

use std::sync::Arc;
use std::time::Duration;

use docchat_rag::mock::{EchoGenerator, FailingEmbedder, FailingGenerator, MockEmbedder};
use docchat_rag::{DocumentId, DocumentQa, IndexRegistry, RagConfig, RagError, Retriever};

const MANUAL: &str = "The warranty covers parts for two years. Shipping takes five business \
days. Returns need the original receipt.";

fn small_config() -> RagConfig {
    RagConfig::builder().chunk_size(50).chunk_overlap(10).top_k(1).build().unwrap()
}

fn pipeline(config: RagConfig, generator: Arc<EchoGenerator>) -> DocumentQa {
    DocumentQa::builder()
        .config(config)
        .embedder(Arc::new(MockEmbedder::new(256)))
        .generator(generator)
        .build()
        .unwrap()
}

#[tokio::test]
async fn answer_is_grounded_in_the_matching_segment() {
    let generator = Arc::new(EchoGenerator::new());
    let qa = pipeline(small_config(), generator.clone());

    let summary = qa.index_document("1".into(), MANUAL).await.unwrap();
    assert_eq!(summary.segments, 3);
    assert_eq!(summary.dimensions, 256);
    assert!(!summary.replaced);

    qa.answer_question(&"1".into(), "How many business days does shipping take?")
        .await
        .unwrap();

    let request = generator.last_request().unwrap();
    assert!(request.prompt.contains("Shipping takes five business days."));
    assert!(!request.prompt.contains("warranty"));
    assert!(
        request
            .prompt
            .ends_with("Question: How many business days does shipping take?\nAnswer:")
    );
    assert_eq!(request.temperature, 0.0);
}

#[tokio::test]
async fn retrieval_is_scoped_to_one_document() {
    let generator = Arc::new(EchoGenerator::new());
    let qa = pipeline(RagConfig::default(), generator.clone());

    qa.index_document("manual".into(), MANUAL).await.unwrap();
    qa.index_document("recipe".into(), "Whisk two eggs with sugar. Bake for twenty minutes.")
        .await
        .unwrap();

    let hits = qa.retriever().retrieve(&"recipe".into(), "shipping warranty", 4).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|s| s.document_id.as_str() == "recipe"));
}

#[tokio::test]
async fn blank_text_is_an_empty_document_and_publishes_nothing() {
    let qa = pipeline(RagConfig::default(), Arc::new(EchoGenerator::new()));

    for text in ["", "  \n\t "] {
        let err = qa.index_document("1".into(), text).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument(ref id) if id.as_str() == "1"));
    }
    assert!(qa.registry().is_empty());
    assert!(!qa.is_indexed(&"1".into()));
}

#[tokio::test]
async fn questions_about_unindexed_documents_fail() {
    let generator = Arc::new(EchoGenerator::new());
    let qa = pipeline(RagConfig::default(), generator.clone());

    let err = qa.answer_question(&"404".into(), "anything?").await.unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound(ref id) if id.as_str() == "404"));
    assert_eq!(generator.call_count(), 0);

    let retriever = Retriever::new(Arc::new(IndexRegistry::new()), Arc::new(MockEmbedder::new(8)));
    let err = retriever.retrieve(&"404".into(), "anything?", 4).await.unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound(_)));
}

#[tokio::test]
async fn embedding_failure_publishes_nothing() {
    let qa = DocumentQa::builder()
        .embedder(Arc::new(FailingEmbedder::new("quota exceeded")))
        .generator(Arc::new(EchoGenerator::new()))
        .build()
        .unwrap();

    let err = qa.index_document("1".into(), MANUAL).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::EmbeddingProvider { ref message, .. } if message == "quota exceeded"
    ));
    assert!(qa.registry().is_empty());
}

#[tokio::test]
async fn failed_reindex_keeps_serving_the_previous_index() {
    let registry = Arc::new(IndexRegistry::new());
    let healthy = DocumentQa::builder()
        .registry(registry.clone())
        .embedder(Arc::new(MockEmbedder::new(64)))
        .generator(Arc::new(EchoGenerator::new()))
        .build()
        .unwrap();
    let broken = DocumentQa::builder()
        .registry(registry.clone())
        .embedder(Arc::new(FailingEmbedder::new("down")))
        .generator(Arc::new(EchoGenerator::new()))
        .build()
        .unwrap();

    healthy.index_document("1".into(), MANUAL).await.unwrap();
    let before = registry.get(&"1".into()).unwrap();

    assert!(broken.index_document("1".into(), "Replacement text.").await.is_err());

    let after = registry.get(&"1".into()).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(healthy.answer_question(&"1".into(), "shipping?").await.is_ok());
}

#[tokio::test]
async fn reindexing_replaces_the_index() {
    let qa = pipeline(small_config(), Arc::new(EchoGenerator::new()));

    qa.index_document("1".into(), MANUAL).await.unwrap();
    let summary = qa.index_document("1".into(), "A single short line.").await.unwrap();
    assert!(summary.replaced);
    assert_eq!(summary.segments, 1);

    let index = qa.registry().get(&"1".into()).unwrap();
    assert_eq!(index.entries()[0].segment.text, "A single short line.");
}

#[tokio::test]
async fn long_documents_are_embedded_in_bounded_batches() {
    let embedder = Arc::new(MockEmbedder::new(64).with_max_batch_size(8));
    let qa = DocumentQa::builder()
        .config(small_config())
        .embedder(embedder.clone())
        .generator(Arc::new(EchoGenerator::new()))
        .build()
        .unwrap();

    let summary = qa.index_document("1".into(), &"Word ".repeat(2000)).await.unwrap();
    assert!(summary.segments > 8);
    assert_eq!(embedder.call_count(), summary.segments.div_ceil(8));
    assert_eq!(qa.registry().get(&"1".into()).unwrap().len(), summary.segments);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_builds_for_one_document_publish_one_complete_index() {
    let qa = Arc::new(pipeline(small_config(), Arc::new(EchoGenerator::new())));
    let first = "Alpha beta gamma delta. ".repeat(20);
    let second = "Omega psi chi phi. ".repeat(30);

    let (a, b) = tokio::join!(
        {
            let qa = qa.clone();
            let text = first.clone();
            tokio::spawn(async move { qa.index_document("1".into(), &text).await })
        },
        {
            let qa = qa.clone();
            let text = second.clone();
            tokio::spawn(async move { qa.index_document("1".into(), &text).await })
        },
    );
    let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());

    let index = qa.registry().get(&"1".into()).unwrap();
    let texts: Vec<&str> = index.entries().iter().map(|e| e.segment.text.as_str()).collect();
    let from_first = texts.iter().all(|t| first.contains(t));
    let from_second = texts.iter().all(|t| second.contains(t));
    assert!(from_first ^ from_second, "index mixes segments from both builds");
    let expected = if from_first { a.segments } else { b.segments };
    assert_eq!(index.len(), expected);
    assert_eq!(qa.registry().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_embedding_times_out_and_publishes_nothing() {
    let config = RagConfig::builder().provider_timeout(Duration::from_secs(1)).build().unwrap();
    let qa = DocumentQa::builder()
        .config(config)
        .embedder(Arc::new(MockEmbedder::new(16).with_delay(Duration::from_secs(30))))
        .generator(Arc::new(EchoGenerator::new()))
        .build()
        .unwrap();

    let err = qa.index_document("1".into(), MANUAL).await.unwrap_err();
    assert!(matches!(err, RagError::ProviderTimeout { operation: "embedding", .. }));
    assert!(qa.registry().is_empty());
}

#[tokio::test]
async fn generation_failure_is_reported() {
    let generator = Arc::new(FailingGenerator::new("model overloaded"));
    let qa = DocumentQa::builder()
        .embedder(Arc::new(MockEmbedder::new(32)))
        .generator(generator.clone())
        .build()
        .unwrap();

    qa.index_document("1".into(), MANUAL).await.unwrap();
    let err = qa.answer_question(&"1".into(), "What is covered?").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationProvider { .. }));
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn removed_documents_can_no_longer_be_asked_about() {
    let qa = pipeline(RagConfig::default(), Arc::new(EchoGenerator::new()));
    let id = DocumentId::from(3u64);

    qa.index_document(id.clone(), MANUAL).await.unwrap();
    assert!(qa.remove_document(&id));
    assert!(!qa.remove_document(&id));
    assert!(matches!(
        qa.answer_question(&id, "warranty?").await,
        Err(RagError::IndexNotFound(_))
    ));
}

#[tokio::test]
async fn builder_requires_both_providers() {
    let missing_generator = DocumentQa::builder().embedder(Arc::new(MockEmbedder::new(8))).build();
    assert!(matches!(missing_generator, Err(RagError::InvalidConfiguration(_))));

    let missing_embedder = DocumentQa::builder().generator(Arc::new(EchoGenerator::new())).build();
    assert!(matches!(missing_embedder, Err(RagError::InvalidConfiguration(_))));
}
