use async_trait::async_trait;
use knowledge_metadata::{flatten, Metadata, Scalar, Value};
use knowledge_store::{
    tag_metadata, Collection, Document, HealthStatus, KnowledgeStore, Sample, StoreError,
};
use knowledge_vector_store::{
    Embedder, MemoryEngine, PointId, StubEmbedder, VectorEngine, VectorStoreError,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;

const DIM: usize = 32;

/// Stub vectors, except for texts containing `poison`.
struct FlakyEmbedder {
    inner: StubEmbedder,
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> knowledge_vector_store::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("poison")) {
            return Err(VectorStoreError::EmbeddingError(
                "model rejected input".to_string(),
            ));
        }
        self.inner.embed_batch(texts).await
    }
}

async fn connected_store() -> (Arc<MemoryEngine>, KnowledgeStore) {
    let engine = Arc::new(MemoryEngine::new());
    let embedder = Arc::new(FlakyEmbedder {
        inner: StubEmbedder::new(DIM),
    });
    let store = KnowledgeStore::new(engine.clone(), embedder);
    store.connect().await.expect("connect");
    (engine, store)
}

fn meta(pairs: &[(&str, Value)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn tenants(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

#[tokio::test]
async fn connect_twice_keeps_four_collections() {
    let (engine, store) = connected_store().await;
    let report = store.connect().await.expect("second connect");
    assert!(report.created.is_empty());
    assert_eq!(report.existing.len(), 4);

    let mut names = engine.list_collections().await.expect("list");
    names.sort();
    assert_eq!(
        names,
        vec![
            "cache_store",
            "documentation_store",
            "samples_store",
            "schema_store"
        ]
    );
}

#[tokio::test]
async fn tagged_document_round_trips_through_query() {
    let (engine, store) = connected_store().await;
    let doc = Document::new(
        "foo bar",
        meta(&[(
            "tags",
            Value::List(vec![Value::text("x"), Value::text("y")]),
        )]),
    );
    let stats = store
        .prepare_data("run1-tenant", &[doc], &[], &[], "run1")
        .await;
    assert_eq!(stats.written_to(Collection::Documentation), 1);
    assert!(stats.is_clean());

    let stored = engine
        .retrieve("documentation_store", &[PointId::Num(0)])
        .await
        .expect("retrieve");
    let payload = &stored[0].payload;
    assert_eq!(payload["tags"], Scalar::from("['x', 'y']"));
    assert_eq!(payload["config_id"], Scalar::from("run1"));
    assert_eq!(payload["datasource"], Scalar::from("run1-tenant"));
    assert_eq!(payload["document"], Scalar::from("foo bar"));

    let hits = store
        .find_similar_documentation(&tenants(&["run1-tenant"]), "foo", 1)
        .await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document, "foo bar");
    assert_eq!(
        hits[0].metadatas["tags"],
        Value::List(vec![Value::text("x"), Value::text("y")])
    );
    assert!(hits[0].score.is_some());
}

#[tokio::test]
async fn clear_collection_removes_run_everywhere() {
    let (engine, store) = connected_store().await;
    let docs = vec![Document::new("orders table", Metadata::new())];
    let samples = vec![Sample::new("top orders", Metadata::new())];
    store
        .prepare_data("sales", &docs, &docs, &samples, "run1")
        .await;
    for collection in Collection::ALL {
        assert_eq!(engine.len(collection.name()), 1, "{collection}");
    }

    store.clear_collection("run1").await.expect("clear");
    for collection in Collection::ALL {
        assert!(engine.is_empty(collection.name()), "{collection}");
    }
    let hits = store
        .find_similar_documentation(&tenants(&["sales"]), "orders", 3)
        .await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn clear_collection_keeps_other_runs() {
    let (engine, store) = connected_store().await;
    store
        .add_to_store(
            Collection::Schema,
            "a",
            &tag_metadata(&Metadata::new(), "sales", "run1"),
            PointId::Num(1),
        )
        .await
        .expect("add run1");
    store
        .add_to_store(
            Collection::Schema,
            "b",
            &tag_metadata(&Metadata::new(), "sales", "run2"),
            PointId::Num(2),
        )
        .await
        .expect("add run2");

    store.clear_collection("run1").await.expect("clear");
    assert_eq!(engine.len("schema_store"), 1);
}

#[tokio::test]
async fn queries_never_cross_tenants() {
    let (_, store) = connected_store().await;
    for (offset, tenant) in [(0_u64, "tenantA"), (10, "tenantB")] {
        for i in 0..3 {
            store
                .add_to_store(
                    Collection::Documentation,
                    &format!("revenue report {i}"),
                    &tag_metadata(&Metadata::new(), tenant, "run1"),
                    PointId::Num(offset + i),
                )
                .await
                .expect("add");
        }
    }

    let hits = store
        .find_similar_documentation(&tenants(&["tenantA"]), "revenue report 1", 10)
        .await;
    assert_eq!(hits.len(), 3);
    for hit in &hits {
        assert_eq!(hit.metadatas["datasource"], Value::text("tenantA"));
    }
    assert!(hits
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

#[tokio::test]
async fn only_first_datasource_is_used() {
    let (_, store) = connected_store().await;
    store
        .add_to_store(
            Collection::Schema,
            "customers",
            &tag_metadata(&Metadata::new(), "a", "run1"),
            PointId::Num(0),
        )
        .await
        .expect("add a");
    store
        .add_to_store(
            Collection::Schema,
            "customers",
            &tag_metadata(&Metadata::new(), "b", "run1"),
            PointId::Num(1),
        )
        .await
        .expect("add b");

    let hits = store
        .find_similar_schema(&tenants(&["a", "b"]), "customers", 5)
        .await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, PointId::Num(0));
}

#[tokio::test]
async fn empty_datasource_list_is_refused() {
    let (_, store) = connected_store().await;
    assert!(store
        .find_similar_documentation(&[], "anything", 3)
        .await
        .is_empty());
    let err = store
        .try_find_similar(&[], "anything", Collection::Documentation, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuery(_)));
}

#[tokio::test]
async fn bulk_load_isolates_failing_items() {
    let (engine, store) = connected_store().await;
    let docs: Vec<Document> = ["one", "two", "poison three", "four", "five"]
        .iter()
        .map(|text| Document::new(*text, Metadata::new()))
        .collect();
    let samples: Vec<Sample> = ["s1", "s2", "poison s3", "s4", "s5"]
        .iter()
        .map(|text| Sample::new(*text, Metadata::new()))
        .collect();

    let stats = store
        .prepare_data("sales", &docs, &[], &samples, "run1")
        .await;
    assert_eq!(stats.written_to(Collection::Documentation), 4);
    assert_eq!(stats.written_to(Collection::Samples), 4);
    assert_eq!(stats.written_to(Collection::Cache), 4);
    assert_eq!(stats.failures.len(), 3);
    assert!(stats.failures.iter().all(|f| f.index == 2));

    let ids: Vec<PointId> = (0..5).map(PointId::Num).collect();
    for collection in ["documentation_store", "samples_store", "cache_store"] {
        let found: Vec<PointId> = engine
            .retrieve(collection, &ids)
            .await
            .expect("retrieve")
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(
            found,
            vec![
                PointId::Num(0),
                PointId::Num(1),
                PointId::Num(3),
                PointId::Num(4)
            ],
            "{collection}"
        );
    }
}

#[tokio::test]
async fn samples_land_in_samples_and_cache_with_flat_payload() {
    let (engine, store) = connected_store().await;
    let sample = Sample::new(
        "orders per region",
        meta(&[
            ("sql", Value::text("SELECT region, count(*) FROM orders")),
            (
                "source",
                Value::Map(meta(&[(
                    "tables",
                    Value::List(vec![Value::text("orders")]),
                )])),
            ),
        ]),
    );
    store
        .prepare_data("sales", &[], &[], &[sample], "run1")
        .await;

    for collection in ["samples_store", "cache_store"] {
        let got = engine
            .retrieve(collection, &[PointId::Num(0)])
            .await
            .expect("retrieve");
        assert_eq!(got[0].payload["source.tables"], Scalar::from("['orders']"));
        assert_eq!(got[0].payload["datasource"], Scalar::from("sales"));
    }
}

#[tokio::test]
async fn update_cache_stores_metadata_as_given() {
    let (engine, store) = connected_store().await;
    let metadata = meta(&[
        ("sql", Value::text("SELECT count(*) FROM signups")),
        (
            "source",
            Value::Map(meta(&[(
                "tables",
                Value::List(vec![Value::text("signups")]),
            )])),
        ),
    ]);
    let id = store
        .update_cache("weekly signups", &metadata)
        .await
        .expect("cache id");

    let got = engine.retrieve("cache_store", &[id]).await.expect("retrieve");
    assert_eq!(got.len(), 1);
    let mut expected = flatten(&metadata);
    expected.insert("document".into(), Scalar::from("weekly signups"));
    assert_eq!(got[0].payload, expected);
    assert!(!got[0].payload.contains_key("datasource"));
    assert!(!got[0].payload.contains_key("config_id"));
}

#[tokio::test]
async fn find_similar_cache_reads_samples_store() {
    let (_, store) = connected_store().await;
    let cached = store
        .update_cache(
            "weekly signups",
            &tag_metadata(&Metadata::new(), "growth", "run1"),
        )
        .await;
    assert!(cached.is_some());
    assert!(store
        .find_similar_cache(&tenants(&["growth"]), "weekly signups", 3)
        .await
        .is_empty());

    store
        .prepare_data(
            "growth",
            &[],
            &[],
            &[Sample::new("weekly signups", Metadata::new())],
            "run1",
        )
        .await;
    let hits = store
        .find_similar_cache(&tenants(&["growth"]), "weekly signups", 3)
        .await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, PointId::Num(0));
}

#[tokio::test]
async fn reinforcement_is_monotonic() {
    let (_, store) = connected_store().await;
    let id = store
        .update_store(
            Some(PointId::Num(7)),
            &tag_metadata(&meta(&[("weights", Value::from(2_i64))]), "sales", "run1"),
            "top customers",
        )
        .await
        .expect("update_store");

    for expected in 3..=5_i64 {
        let results = store.find_samples_by_id(&id).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadatas["weights"], Value::from(expected));
    }

    let mut current = store
        .lookup_by_id(&id, Collection::Samples)
        .await
        .pop()
        .expect("stored sample");
    assert_eq!(current.metadatas["weights"], Value::from(5_i64));
    assert_eq!(current.metadatas["datasource"], Value::text("sales"));

    let next = store
        .update_weights(&mut current, 10)
        .await
        .expect("update weights");
    assert_eq!(next, Scalar::Int(15));
    let stored = store.lookup_by_id(&id, Collection::Samples).await;
    assert_eq!(stored[0].metadatas["weights"], Value::from(15_i64));
}

#[tokio::test]
async fn fractional_weight_is_incremented_not_reset() {
    let (_, store) = connected_store().await;
    let id = store
        .update_store(
            Some(PointId::Num(8)),
            &meta(&[("weights", Value::from(2.5))]),
            "revenue by region",
        )
        .await
        .expect("update_store");

    let results = store.find_samples_by_id(&id).await;
    assert_eq!(results[0].metadatas["weights"], Value::from(3.5));

    let stored = store.lookup_by_id(&id, Collection::Samples).await;
    assert_eq!(stored[0].metadatas["weights"], Value::from(3.5));
}

#[tokio::test]
async fn non_numeric_weight_is_rejected_and_left_alone() {
    let (_, store) = connected_store().await;
    let id = store
        .update_store(
            Some(PointId::Num(9)),
            &meta(&[("weights", Value::text("heavy"))]),
            "revenue by region",
        )
        .await
        .expect("update_store");

    let mut current = store
        .lookup_by_id(&id, Collection::Samples)
        .await
        .pop()
        .expect("stored sample");
    let err = store.update_weights(&mut current, 1).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidWeight(_)));
    assert_eq!(current.metadatas["weights"], Value::text("heavy"));

    let results = store.find_samples_by_id(&id).await;
    assert_eq!(results[0].metadatas["weights"], Value::text("heavy"));
    let stored = store.lookup_by_id(&id, Collection::Samples).await;
    assert_eq!(stored[0].metadatas["weights"], Value::text("heavy"));
}

#[tokio::test]
async fn lookup_is_pure_and_find_reinforces() {
    let (_, store) = connected_store().await;
    store
        .prepare_data(
            "sales",
            &[],
            &[],
            &[Sample::new("churned accounts", Metadata::new())],
            "run1",
        )
        .await;
    let id = PointId::Num(0);

    for _ in 0..2 {
        let looked = store.lookup_by_id(&id, Collection::Samples).await;
        assert!(looked[0].metadatas.get("weights").is_none());
        assert_eq!(looked[0].score, None);
    }

    let found = store.find_samples_by_id(&id).await;
    assert_eq!(found[0].metadatas["weights"], Value::from(1_i64));
    let after = store.lookup_by_id(&id, Collection::Samples).await;
    assert_eq!(after[0].metadatas["weights"], Value::from(1_i64));
    assert_eq!(after[0].document, "churned accounts");

    assert!(store
        .find_samples_by_id(&PointId::Num(99))
        .await
        .is_empty());
}

#[tokio::test]
async fn offline_engine_degrades_to_informational_values() {
    let (engine, store) = connected_store().await;
    engine.set_offline(true);

    assert_eq!(
        store.update_cache("q", &Metadata::new()).await,
        None
    );
    match store.health_check().await {
        HealthStatus::Unavailable { reason } => assert!(reason.contains("offline")),
        other => panic!("expected unavailable, got {other:?}"),
    }
    assert!(store
        .find_similar_documentation(&tenants(&["sales"]), "orders", 3)
        .await
        .is_empty());
    let err = store
        .try_find_similar(&tenants(&["sales"]), "orders", Collection::Documentation, 3)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VectorStoreError(VectorStoreError::ConnectionError(_))
    ));
    assert!(store.connect().await.is_err());
    assert!(store.clear_collection("run1").await.is_err());
}

#[tokio::test]
async fn batch_descriptor_loads_documentation() {
    let (engine, store) = connected_store().await;
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(
        file,
        r#"
- description: "orders: one row per order"
  metadata:
    table: orders
    columns: [id, region, total]
- description: "customers: one row per customer"
  metadata:
    table: customers
"#
    )
    .expect("write yaml");

    let stats = store
        .load_from_batch_descriptor(file.path())
        .await
        .expect("load");
    assert_eq!(stats.written_to(Collection::Documentation), 2);
    assert_eq!(engine.len("documentation_store"), 2);

    let got = engine
        .retrieve("documentation_store", &[PointId::Num(0)])
        .await
        .expect("retrieve");
    assert_eq!(
        got[0].payload["columns"],
        Scalar::from("['id', 'region', 'total']")
    );
}

#[tokio::test]
async fn malformed_batch_descriptor_is_an_error() {
    let (_, store) = connected_store().await;
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "- metadata: {{}}").expect("write yaml");
    let err = store
        .load_from_batch_descriptor(file.path())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::BatchDescriptorError(_)));

    let missing = store
        .load_from_batch_descriptor("/nonexistent/batch.yaml")
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::IoError(_)));
}
