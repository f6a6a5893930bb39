use anyhow::{Context, Result};
use tantivy::schema::*;
use tantivy::{Index, IndexReader, IndexWriter, doc};

use crate::corpus::Document;

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Debug, Clone, Copy)]
pub struct Fields {
    pub id: Field,
    pub title: Field,
    pub body: Field,
    /// Raw `key=value` terms, one per metadata pair.
    pub meta: Field,
}

pub struct TantivyIndex {
    pub index: Index,
    writer: IndexWriter,
    pub fields: Fields,
}

impl TantivyIndex {
    /// Index that lives only for the process; used for corpus files.
    pub fn create_in_ram() -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        Self::with_index(index, &schema)
    }

    fn with_index(index: Index, schema: &Schema) -> Result<Self> {
        let writer = index
            .writer(WRITER_HEAP_BYTES)
            .with_context(|| "create index writer")?;
        let fields = fields_from_schema(schema)?;
        Ok(Self {
            index,
            writer,
            fields,
        })
    }

    pub fn add_document(&mut self, document: &Document) -> Result<()> {
        let mut d = doc! {
            self.fields.id => document.id.clone(),
            self.fields.body => document.text.clone(),
        };
        if let Some(title) = &document.title {
            d.add_text(self.fields.title, title);
        }
        for (key, value) in &document.metadata {
            d.add_text(self.fields.meta, meta_term(key, value));
        }
        self.writer.add_document(d)?;
        Ok(())
    }

    pub fn add_documents<'a>(&mut self, documents: impl IntoIterator<Item = &'a Document>) -> Result<()> {
        for document in documents {
            self.add_document(document)?;
        }
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        Ok(())
    }

    pub fn reader(&self) -> Result<IndexReader> {
        Ok(self.index.reader()?)
    }
}

/// Term stored in the `meta` field for one metadata pair.
pub fn meta_term(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field("id", STRING | STORED);
    schema_builder.add_text_field("title", TEXT | STORED);
    schema_builder.add_text_field("body", TEXT | STORED);
    schema_builder.add_text_field("meta", STRING);
    schema_builder.build()
}

pub fn fields_from_schema(schema: &Schema) -> Result<Fields> {
    Ok(Fields {
        id: schema
            .get_field("id")
            .map_err(|_| anyhow::anyhow!("schema missing id"))?,
        title: schema
            .get_field("title")
            .map_err(|_| anyhow::anyhow!("schema missing title"))?,
        body: schema
            .get_field("body")
            .map_err(|_| anyhow::anyhow!("schema missing body"))?,
        meta: schema
            .get_field("meta")
            .map_err(|_| anyhow::anyhow!("schema missing meta"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_documents_in_ram() -> Result<()> {
        let mut index = TantivyIndex::create_in_ram()?;
        let docs = vec![
            Document::new("a", "hybrid retrieval").with_metadata("lang", "rust"),
            Document::new("b", "vector search").with_title("Vectors"),
        ];
        index.add_documents(&docs)?;
        index.commit()?;

        let reader = index.reader()?;
        reader.reload()?;
        assert_eq!(reader.searcher().num_docs(), 2);
        Ok(())
    }

    #[test]
    fn meta_term_format() {
        assert_eq!(meta_term("lang", "rust"), "lang=rust");
    }
}
