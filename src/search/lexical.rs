//! Lexical (BM25) search client.
//!
//! This is the baseline of the cascade: every hybrid request runs it, and its
//! failure is the only one that fails the request.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Term, Value};
use tantivy::snippet::SnippetGenerator;
use tantivy::{Index, IndexReader, TantivyDocument};
use tracing::{debug, warn};

use super::error::LexicalError;
use super::tantivy::{Fields, TantivyIndex, meta_term};
use super::types::Candidate;

pub trait LexicalSearchClient: Send + Sync {
    /// Ranked hits for `query`, best first, with raw relevance scores.
    fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<Candidate>, LexicalError>> + Send;
}

impl<T: LexicalSearchClient> LexicalSearchClient for Arc<T> {
    fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<Candidate>, LexicalError>> + Send {
        (**self).search(query, limit, filters)
    }
}

/// BM25 search over a tantivy index, run on the blocking pool.
#[derive(Clone)]
pub struct TantivyLexicalClient {
    index: Index,
    reader: IndexReader,
    fields: Fields,
}

impl std::fmt::Debug for TantivyLexicalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyLexicalClient")
            .field("index", &self.index)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl TantivyLexicalClient {
    pub fn new(index: &TantivyIndex) -> Result<Self, LexicalError> {
        let reader = index.index.reader()?;
        reader.reload()?;
        Ok(Self {
            index: index.index.clone(),
            reader,
            fields: index.fields,
        })
    }

    fn search_blocking(
        &self,
        query: &str,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<Candidate>, LexicalError> {
        let searcher = self.reader.searcher();
        let limit = limit.min(usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX));
        if limit == 0 {
            return Ok(Vec::new());
        }
        let parser = QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.body]);
        let (text_query, parse_errors) = parser.parse_query_lenient(query);
        if !parse_errors.is_empty() {
            debug!(
                errors = parse_errors.len(),
                "query parsed leniently; some clauses ignored"
            );
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query)];
        for (key, value) in filters {
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.meta, &meta_term(key, value)),
                    IndexRecordOption::Basic,
                )),
            ));
        }
        let q: Box<dyn Query> = if clauses.len() == 1 {
            clauses.remove(0).1
        } else {
            Box::new(BooleanQuery::new(clauses))
        };

        let snippet_generator = SnippetGenerator::create(&searcher, &*q, self.fields.body)?;
        let top_docs = searcher.search(&q, &TopDocs::with_limit(limit).order_by_score())?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let id = doc
                .get_first(self.fields.id)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            if id.is_empty() {
                warn!(?addr, "indexed document without id skipped");
                continue;
            }
            let mut snippet = snippet_generator
                .snippet_from_doc(&doc)
                .to_html()
                .replace("<b>", "**")
                .replace("</b>", "**");
            if snippet.is_empty() {
                snippet = doc
                    .get_first(self.fields.title)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
            }
            hits.push(Candidate::lexical(id, snippet, score));
        }
        Ok(hits)
    }
}

impl LexicalSearchClient for TantivyLexicalClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<Candidate>, LexicalError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let client = self.clone();
        let query_owned = query.to_string();
        let filters_owned = filters.clone();

        let hits = tokio::task::spawn_blocking(move || {
            client.search_blocking(&query_owned, limit, &filters_owned)
        })
        .await
        .map_err(|e| LexicalError::Task(e.to_string()))??;

        debug!(
            backend = "tantivy",
            result_count = hits.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "lexical search completed"
        );
        Ok(hits)
    }
}
