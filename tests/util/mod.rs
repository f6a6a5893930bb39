use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hybrid_retrieval::config::HybridConfig;
use hybrid_retrieval::search::{
    Candidate, CascadeSearcher, EmbeddingError, EmbeddingVector, LexicalError, LexicalSearchClient,
    QueryEmbedder, VectorSearchClient, VectorStoreError,
};

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }

    /// Captured lines at WARN level.
    pub fn warnings(&self) -> Vec<String> {
        self.output()
            .lines()
            .filter(|l| l.contains("WARN"))
            .map(str::to_string)
            .collect()
    }
}

#[allow(dead_code)]
struct TestWriter(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Lexical client returning canned hits, optionally failing or slow.
#[allow(dead_code)]
#[derive(Default)]
pub struct StubLexical {
    pub hits: Vec<Candidate>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubLexical {
    pub fn with_hits(hits: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            ..Self::default()
        })
    }

    pub fn slow(hits: Vec<Candidate>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            hits,
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LexicalSearchClient for StubLexical {
    async fn search(
        &self,
        _query: &str,
        limit: usize,
        _filters: &BTreeMap<String, String>,
    ) -> Result<Vec<Candidate>, LexicalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(LexicalError::Index("index offline".into()));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

/// Embedder returning a fixed vector, optionally failing or slow.
#[allow(dead_code)]
#[derive(Default)]
pub struct StubEmbedder {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubEmbedder {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QueryEmbedder for StubEmbedder {
    fn id(&self) -> &str {
        "stub-embedder"
    }

    fn dimension(&self) -> usize {
        4
    }

    fn is_semantic(&self) -> bool {
        true
    }

    async fn embed(&self, _text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EmbeddingError::Unavailable("provider unreachable".into()));
        }
        Ok(EmbeddingVector::new(vec![0.5; 4]))
    }
}

/// Vector client returning canned hits, optionally failing or slow.
#[allow(dead_code)]
#[derive(Default)]
pub struct StubVector {
    pub hits: Vec<Candidate>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubVector {
    pub fn with_hits(hits: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            ..Self::default()
        })
    }

    pub fn slow(hits: Vec<Candidate>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            hits,
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VectorSearchClient for StubVector {
    async fn search(
        &self,
        _vector: &EmbeddingVector,
        limit: usize,
        _filters: &BTreeMap<String, String>,
    ) -> Result<Vec<Candidate>, VectorStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(VectorStoreError::Unavailable("connection refused".into()));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

#[allow(dead_code)]
pub type StubSearcher = CascadeSearcher<Arc<StubLexical>, Arc<StubEmbedder>, Arc<StubVector>>;

#[allow(dead_code)]
pub fn stub_searcher(
    lexical: &Arc<StubLexical>,
    embedder: &Arc<StubEmbedder>,
    vector: &Arc<StubVector>,
    config: HybridConfig,
) -> StubSearcher {
    CascadeSearcher::new(lexical.clone(), embedder.clone(), vector.clone(), config)
}

#[allow(dead_code)]
pub fn semantic_config(timeout: Duration) -> HybridConfig {
    HybridConfig {
        semantic_enabled: true,
        vector_timeout: timeout,
        ..HybridConfig::default()
    }
}

#[allow(dead_code)]
pub fn fixture_corpus() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/corpus.jsonl")
}
