//! Quick Start
//!
//! Ingests a small catalog through the repository facade on the in-memory
//! provider and runs dense, sparse and hybrid queries.
//!
//! Run with:
//!   cargo run --example quick_start
//!
//! Set `VECTOR_PROVIDER=pgvector` (plus `PGVECTOR_CONNECTION_STRING`) or
//! `VECTOR_PROVIDER=pinecone` (plus `PINECONE_API_KEY`) to run against a real
//! backend; records then need real embeddings of the configured dimension.

use vecbridge::embedding::{EmbeddingProvider, SimEmbeddingProvider};
use vecbridge::repository::{IngestRecord, VectorRepository};
use vecbridge::settings::VectorSettings;
use vecbridge::sparse::SparseEncoding;
use vecbridge::telemetry::{init_logging, LoggingConfig};

const DIMENSION: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LoggingConfig::builder().filter("vecbridge=info,warn").build())?;

    let mut settings = VectorSettings::from_env()?.with_dimension(DIMENSION);
    if std::env::var("VECTOR_PROVIDER").is_err() {
        settings = settings.with_provider("memory");
    }
    println!("=== vecbridge: {} provider ===\n", settings.provider);

    let repo = VectorRepository::from_settings(settings).await?;
    repo.create_indexes().await?;

    // The memory provider embeds queries with seed 0; embed the catalog the same way.
    let embedder = SimEmbeddingProvider::new(0).with_dimensions(DIMENSION);
    let catalog = [
        ("sku-1", "lightweight trail running shoes"),
        ("sku-2", "merino wool hiking socks"),
        ("sku-3", "waterproof leather hiking boots"),
        ("sku-4", "insulated winter running jacket"),
    ];

    let mut records = Vec::with_capacity(catalog.len());
    for (id, title) in catalog {
        records.push(IngestRecord {
            id: id.to_string(),
            values: Some(embedder.embed(title).await?),
            sparse_values: Some(SparseEncoding::from(&embedder.embed_sparse(title).await?)),
            metadata: serde_json::json!({ "title": title }).as_object().cloned(),
        });
    }

    repo.upsert_dense(&records).await?;
    repo.upsert_sparse(&records).await?;
    println!(
        "Stored {} records in '{}' and '{}'\n",
        records.len(),
        repo.dense_index(),
        repo.sparse_index()
    );

    for query in ["hiking boots", "running"] {
        println!("Query: '{query}'");
        let dense = repo.search_dense(query, 3, None).await?;
        let sparse = repo.search_sparse(query, 3, None).await?;
        let hybrid = repo.search_hybrid(query, 3, None).await?;

        for (label, hits) in [("dense", dense), ("sparse", sparse), ("hybrid", hybrid)] {
            let rendered: Vec<String> = hits
                .iter()
                .map(|h| format!("{} ({:.4})", h.id, h.score))
                .collect();
            println!("  {label:>6}: {}", rendered.join(", "));
        }
        println!();
    }

    println!("Healthy: {}", repo.health_check().await);
    Ok(())
}
