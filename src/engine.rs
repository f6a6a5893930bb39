//! Builds a self-contained searcher over an in-memory corpus.
//!
//! The lexical side is a RAM tantivy index, the semantic side is the hash
//! embedder plus an in-memory vector store. Both are built once from the same
//! documents; nothing is persisted.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::HybridConfig;
use crate::corpus::Document;
use crate::search::embedder::{EmbedderInfo, QueryEmbedder};
use crate::search::hash_embedder::HashEmbedder;
use crate::search::lexical::TantivyLexicalClient;
use crate::search::tantivy::TantivyIndex;
use crate::search::vector_index::{InMemoryVectorStore, VectorEntry};
use crate::search::CascadeSearcher;

pub type LocalSearcher = CascadeSearcher<TantivyLexicalClient, HashEmbedder, InMemoryVectorStore>;

pub fn build_local_searcher(documents: &[Document], config: HybridConfig) -> Result<LocalSearcher> {
    config.validate().context("invalid search configuration")?;

    let mut index = TantivyIndex::create_in_ram()?;
    index.add_documents(documents)?;
    index.commit().context("committing lexical index")?;
    let lexical = TantivyLexicalClient::new(&index).context("opening lexical index reader")?;

    let embedder = HashEmbedder::default();
    let mut entries = Vec::with_capacity(documents.len());
    for doc in documents {
        match embedder.embed_sync(&embedding_text(doc)) {
            Ok(embedding) => entries.push(VectorEntry {
                id: doc.id.clone(),
                text: doc.text.clone(),
                metadata: doc.metadata.clone(),
                embedding,
            }),
            Err(e) => warn!(id = %doc.id, error = %e, "document not embedded, lexical only"),
        }
    }
    let store = InMemoryVectorStore::build(embedder.dimension(), entries)?;

    info!(
        documents = documents.len(),
        vectors = store.len(),
        embedder = %EmbedderInfo::from_embedder(&embedder),
        semantic_enabled = config.semantic_enabled,
        "local searcher ready"
    );

    Ok(CascadeSearcher::new(lexical, embedder, store, config))
}

fn embedding_text(doc: &Document) -> String {
    match &doc.title {
        Some(title) => format!("{title}\n{}", doc.text),
        None => doc.text.clone(),
    }
}
