//! Full-text search over item responses, backed by RAM-resident tantivy indexes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use shoplist_core::integrations::{SearchError, SearchIndex};
use shoplist_core::service::ItemResponse;

/// Index that document operations write to.
pub const DEFAULT_INDEX: &str = "items";

/// Smallest writer arena tantivy accepts for a single indexing thread.
const WRITER_MEMORY_BYTES: usize = 15_000_000;

/// Terms shorter than this only match exactly.
const FUZZY_MIN_LEN: usize = 3;

fn backend(err: impl std::fmt::Display) -> SearchError {
    SearchError::Backend(err.to_string())
}

#[derive(Clone, Copy)]
struct ItemFields {
    /// Raw id, used to replace and delete documents.
    id: Field,
    /// Serialized `ItemResponse` handed back from lookups.
    payload: Field,
    name: Field,
    notes: Field,
    category_name: Field,
}

impl ItemFields {
    fn build_schema() -> (Schema, Self) {
        let mut builder = Schema::builder();

        let id = builder.add_text_field("id", STRING | STORED);
        let payload = builder.add_text_field("payload", STORED);

        let indexing = TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text = TextOptions::default().set_indexing_options(indexing);

        let name = builder.add_text_field("name", text.clone());
        let notes = builder.add_text_field("notes", text.clone());
        let category_name = builder.add_text_field("category_name", text);

        let fields = Self {
            id,
            payload,
            name,
            notes,
            category_name,
        };
        (builder.build(), fields)
    }

    fn searchable(&self) -> [Field; 3] {
        [self.name, self.notes, self.category_name]
    }

    fn id_term(&self, id: Uuid) -> Term {
        Term::from_field_text(self.id, &id.to_string())
    }
}

/// One named index with its writer and a manually reloaded reader.
struct ItemIndex {
    index: Index,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    fields: ItemFields,
}

impl ItemIndex {
    fn create() -> Result<Self, SearchError> {
        let (schema, fields) = ItemFields::build_schema();
        let index = Index::create_in_ram(schema);
        let writer = index
            .writer_with_num_threads(1, WRITER_MEMORY_BYTES)
            .map_err(backend)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(backend)?;

        Ok(Self {
            index,
            writer: Mutex::new(writer),
            reader,
            fields,
        })
    }

    fn document(&self, item: &ItemResponse) -> Result<TantivyDocument, SearchError> {
        let payload = serde_json::to_string(item).map_err(backend)?;

        let mut doc = TantivyDocument::default();
        doc.add_text(self.fields.id, item.id.to_string());
        doc.add_text(self.fields.payload, payload);
        doc.add_text(self.fields.name, &item.name);
        doc.add_text(self.fields.notes, &item.notes);
        if let Some(category_name) = &item.category_name {
            doc.add_text(self.fields.category_name, category_name);
        }
        Ok(doc)
    }

    /// Commits pending writes and makes them visible to searchers.
    fn publish(&self, writer: &mut IndexWriter) -> Result<(), SearchError> {
        writer.commit().map_err(backend)?;
        self.reader.reload().map_err(backend)
    }

    /// Query terms run through the same analyzer as the text fields.
    fn query_terms(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let mut analyzer = self
            .index
            .tokenizer_for_field(self.fields.name)
            .map_err(backend)?;
        let mut stream = analyzer.token_stream(query);

        let mut terms: Vec<String> = Vec::new();
        while stream.advance() {
            let text = &stream.token().text;
            if !terms.contains(text) {
                terms.push(text.clone());
            }
        }
        Ok(terms)
    }

    fn text_query(&self, terms: &[String]) -> BooleanQuery {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for text in terms {
            for field in self.fields.searchable() {
                let term = Term::from_field_text(field, text);
                clauses.push((
                    Occur::Should,
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
                ));
            }
            if text.chars().count() >= FUZZY_MIN_LEN {
                let term = Term::from_field_text(self.fields.name, text);
                clauses.push((Occur::Should, Box::new(FuzzyTermQuery::new(term, 1, true))));
            }
        }
        BooleanQuery::new(clauses)
    }

    fn decode(&self, doc: &TantivyDocument) -> Result<ItemResponse, SearchError> {
        let payload = doc
            .get_first(self.fields.payload)
            .and_then(|v| v.as_str())
            .ok_or_else(|| SearchError::Backend("Document has no payload".to_string()))?;
        serde_json::from_str(payload).map_err(backend)
    }
}

#[derive(Default)]
pub struct InMemorySearchIndex {
    indexes: RwLock<HashMap<String, Arc<ItemIndex>>>,
}

impl std::fmt::Debug for InMemorySearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySearchIndex").finish_non_exhaustive()
    }
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    async fn existing(&self) -> Option<Arc<ItemIndex>> {
        self.indexes.read().await.get(DEFAULT_INDEX).cloned()
    }

    /// The default index, created on first write.
    async fn writable(&self) -> Result<Arc<ItemIndex>, SearchError> {
        if let Some(index) = self.existing().await {
            return Ok(index);
        }
        let mut indexes = self.indexes.write().await;
        if let Some(index) = indexes.get(DEFAULT_INDEX) {
            return Ok(index.clone());
        }
        let index = Arc::new(ItemIndex::create()?);
        indexes.insert(DEFAULT_INDEX.to_string(), index.clone());
        Ok(index)
    }
}

/// Index names are lowercase ASCII letters, digits, `-` and `_`.
fn check_index_name(name: &str) -> Result<(), SearchError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(SearchError::InvalidIndexName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn create_index_if_not_exists(&self, index_name: &str) -> Result<(), SearchError> {
        check_index_name(index_name)?;
        let mut indexes = self.indexes.write().await;
        if !indexes.contains_key(index_name) {
            indexes.insert(index_name.to_string(), Arc::new(ItemIndex::create()?));
            tracing::info!(index = %index_name, "Search index created");
        }
        Ok(())
    }

    async fn delete_index_if_exists(&self, index_name: &str) -> Result<(), SearchError> {
        check_index_name(index_name)?;
        if self.indexes.write().await.remove(index_name).is_some() {
            tracing::info!(index = %index_name, "Search index deleted");
        }
        Ok(())
    }

    async fn add_or_update(&self, item: &ItemResponse) -> Result<(), SearchError> {
        self.add_or_update_bulk(std::slice::from_ref(item)).await
    }

    async fn add_or_update_bulk(&self, items: &[ItemResponse]) -> Result<(), SearchError> {
        if items.is_empty() {
            return Ok(());
        }
        let index = self.writable().await?;
        let mut writer = index.writer.lock().await;
        for item in items {
            writer.delete_term(index.fields.id_term(item.id));
            writer.add_document(index.document(item)?).map_err(backend)?;
        }
        index.publish(&mut writer)?;

        tracing::trace!(count = items.len(), "Documents indexed");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ItemResponse>, SearchError> {
        let Some(index) = self.existing().await else {
            return Ok(None);
        };

        let searcher = index.reader.searcher();
        let query = TermQuery::new(index.fields.id_term(id), IndexRecordOption::Basic);
        let top = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(backend)?;

        match top.first() {
            Some((_, address)) => {
                let doc: TantivyDocument = searcher.doc(*address).map_err(backend)?;
                index.decode(&doc).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<bool, SearchError> {
        let Some(index) = self.existing().await else {
            return Ok(false);
        };

        let mut writer = index.writer.lock().await;
        let term = index.fields.id_term(id);
        let query = TermQuery::new(term.clone(), IndexRecordOption::Basic);
        let found = index
            .reader
            .searcher()
            .search(&query, &Count)
            .map_err(backend)?;
        if found == 0 {
            return Ok(false);
        }

        writer.delete_term(term);
        index.publish(&mut writer)?;
        Ok(true)
    }

    async fn remove_all(&self) -> Result<u64, SearchError> {
        let Some(index) = self.existing().await else {
            return Ok(0);
        };

        let mut writer = index.writer.lock().await;
        let removed = index.reader.searcher().num_docs();
        if removed > 0 {
            writer.delete_all_documents().map_err(backend)?;
            index.publish(&mut writer)?;
        }
        Ok(removed)
    }

    async fn search(
        &self,
        query: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ItemResponse>, SearchError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let Some(index) = self.existing().await else {
            return Ok(Vec::new());
        };

        let terms = index.query_terms(query)?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let searcher = index.reader.searcher();
        let top = searcher
            .search(
                &index.text_query(&terms),
                &TopDocs::with_limit(limit).and_offset(skip),
            )
            .map_err(backend)?;

        let mut hits = Vec::with_capacity(top.len());
        for (_score, address) in top {
            let doc: TantivyDocument = searcher.doc(address).map_err(backend)?;
            hits.push(index.decode(&doc)?);
        }
        Ok(hits)
    }
}
