//! DST Tests for Namespace Isolation
//!
//! `TigerStyle`: Identical ids in different namespaces never see each other.

use std::sync::Arc;

use vecbridge::constants::NAMESPACE_DEFAULT;
use vecbridge::provider::{MemoryProvider, VectorProvider};
use vecbridge::types::{IndexConfig, Metric, SearchOptions, VectorRecord};

async fn dense_provider() -> Arc<MemoryProvider> {
    let provider = Arc::new(MemoryProvider::default());
    provider.setup().await.unwrap();
    provider
        .create_index(&IndexConfig::dense("dense", 3, Metric::Cosine))
        .await
        .unwrap();
    provider
}

#[tokio::test]
async fn dst_namespace_same_id_different_vectors() {
    let provider = dense_provider().await;

    provider
        .upsert_vectors("dense", &[VectorRecord::dense("doc", vec![1.0, 0.0, 0.0])], Some("ns1"))
        .await
        .unwrap();
    provider
        .upsert_vectors("dense", &[VectorRecord::dense("doc", vec![0.0, 1.0, 0.0])], Some("ns2"))
        .await
        .unwrap();

    let query = [1.0, 0.0, 0.0];
    let in_ns1 = provider
        .search_by_vector("dense", &query, &SearchOptions::new(1).with_namespace("ns1"))
        .await
        .unwrap();
    let in_ns2 = provider
        .search_by_vector("dense", &query, &SearchOptions::new(1).with_namespace("ns2"))
        .await
        .unwrap();

    assert_eq!(in_ns1[0].id, "doc");
    assert!((in_ns1[0].score - 1.0).abs() < 1e-6);
    assert_eq!(in_ns2[0].id, "doc");
    assert!(in_ns2[0].score.abs() < 1e-6);

    let stored = provider.get_record("dense", "doc", Some("ns2")).unwrap();
    assert_eq!(stored.values, Some(vec![0.0, 1.0, 0.0]));
}

#[tokio::test]
async fn dst_namespace_delete_is_scoped() {
    let provider = dense_provider().await;
    for ns in ["ns1", "ns2"] {
        provider
            .upsert_vectors("dense", &[VectorRecord::dense("doc", vec![1.0, 0.0, 0.0])], Some(ns))
            .await
            .unwrap();
    }

    provider
        .delete_vectors("dense", &["doc".to_string()], Some("ns1"))
        .await
        .unwrap();

    assert_eq!(provider.record_count("dense", Some("ns1")), 0);
    assert_eq!(provider.record_count("dense", Some("ns2")), 1);
}

#[tokio::test]
async fn dst_namespace_absent_means_default() {
    let provider = dense_provider().await;

    provider
        .upsert_vectors("dense", &[VectorRecord::dense("doc", vec![1.0, 0.0, 0.0])], None)
        .await
        .unwrap();

    assert_eq!(provider.record_count("dense", Some(NAMESPACE_DEFAULT)), 1);
    let hits = provider
        .search_by_vector(
            "dense",
            &[1.0, 0.0, 0.0],
            &SearchOptions::new(5).with_namespace(NAMESPACE_DEFAULT),
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    let elsewhere = provider
        .search_by_vector(
            "dense",
            &[1.0, 0.0, 0.0],
            &SearchOptions::new(5).with_namespace("tenant"),
        )
        .await
        .unwrap();
    assert!(elsewhere.is_empty());
}

#[tokio::test]
async fn dst_namespace_concurrent_writers() {
    let provider = dense_provider().await;

    let mut handles = Vec::new();
    for tenant in 0..8u32 {
        let provider = Arc::clone(&provider);
        handles.push(tokio::spawn(async move {
            let namespace = format!("tenant-{tenant}");
            let records: Vec<VectorRecord> = (0..25)
                .map(|i| VectorRecord::dense(format!("r{i}"), vec![1.0, i as f32, tenant as f32]))
                .collect();
            provider
                .batch_upsert_vectors("dense", &records, 10, Some(&namespace))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for tenant in 0..8u32 {
        assert_eq!(provider.record_count("dense", Some(&format!("tenant-{tenant}"))), 25);
    }
    assert_eq!(provider.record_count("dense", None), 0);
    // 8 tenants x 3 chunks
    assert_eq!(provider.upsert_calls(), 24);
}
