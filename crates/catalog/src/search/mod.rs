//! Full-text relevance search using Tantivy.
//!
//! The index lives in memory and covers each store's name and description.
//! It is maintained incrementally: the service upserts a store's document
//! after every create/update, and can rebuild the whole index from the
//! repository. Reads tolerate a stale index (eventual consistency); an
//! empty or whitespace query is an empty result, not an error.

mod indexer;

use std::sync::{Arc, RwLock};

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use tracing::instrument;

use streetside_core::StoreId;

/// A search result: a store projected to what the result list renders.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: StoreId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub score: f32,
}

/// Schema field handles for the search index.
#[derive(Clone, Copy)]
pub(crate) struct SearchFields {
    // Stored fields (returned in results)
    pub id: Field,
    pub slug: Field,
    pub name: Field,
    pub description: Field,
    // Text fields for full-text search (not stored, just indexed)
    pub name_text: Field,
    pub description_text: Field,
}

/// Inner index state. The writer is kept alive for incremental upserts.
pub(crate) struct InnerIndex {
    #[allow(dead_code)]
    pub index: Index,
    pub reader: IndexReader,
    pub writer: IndexWriter,
    pub fields: SearchFields,
}

/// The store search index.
#[derive(Clone)]
pub struct SearchIndex {
    pub(crate) inner: Arc<RwLock<InnerIndex>>,
}

impl SearchIndex {
    /// Tantivy writer memory budget.
    const WRITER_BUDGET_BYTES: usize = 50_000_000;

    /// Create a new empty search index.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer or reader cannot be created.
    pub fn new() -> Result<Self, SearchError> {
        let (schema, fields) = Self::build_schema();
        let index = Index::create_in_ram(schema);

        let writer = index
            .writer(Self::WRITER_BUDGET_BYTES)
            .map_err(|e| SearchError::Index(format!("Failed to create writer: {e}")))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::Index(format!("Failed to create reader: {e}")))?;

        Ok(Self {
            inner: Arc::new(RwLock::new(InnerIndex {
                index,
                reader,
                writer,
                fields,
            })),
        })
    }

    /// Build the schema for the search index.
    fn build_schema() -> (Schema, SearchFields) {
        use tantivy::schema::NumericOptions;

        let mut schema_builder = Schema::builder();

        // Stored fields returned in hits; the id is also indexed so upserts
        // can delete the previous document for a store
        let id = schema_builder.add_u64_field(
            "id",
            NumericOptions::default()
                .set_stored()
                .set_indexed()
                .set_fast(),
        );
        let slug = schema_builder.add_text_field("slug", STORED);
        let name = schema_builder.add_text_field("name", STORED);
        let description = schema_builder.add_text_field("description", STORED);

        // Text indexing options for full-text search
        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default().set_indexing_options(text_indexing);

        // Indexed text fields (for searching)
        let name_text = schema_builder.add_text_field("name_text", text_options.clone());
        let description_text = schema_builder.add_text_field("description_text", text_options);

        let schema = schema_builder.build();
        let fields = SearchFields {
            id,
            slug,
            name,
            description,
            name_text,
            description_text,
        };

        (schema, fields)
    }

    /// Search the index with the given query string.
    ///
    /// Returns at most `limit` hits, relevance-descending with ties broken
    /// by store id. An empty or whitespace query yields no hits.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the query fails.
    #[instrument(skip(self))]
    // Allow: the RwLockReadGuard must be held for the entire search because
    // the searcher and fields borrow from the guard's protected data.
    #[allow(clippy::significant_drop_tightening)]
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let query_str = query_str.trim().to_lowercase();
        if query_str.is_empty() {
            return Ok(Vec::new());
        }

        let guard = self
            .inner
            .read()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))?;

        let searcher = guard.reader.searcher();

        // Build a boolean query combining exact and fuzzy matches over the
        // name and description fields
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for term in query_str.split_whitespace() {
            let name_term = Term::from_field_text(guard.fields.name_text, term);
            subqueries.push((
                Occur::Should,
                Box::new(TermQuery::new(name_term.clone(), IndexRecordOption::Basic)),
            ));

            if term.len() >= 3 {
                let fuzzy_name = FuzzyTermQuery::new(name_term, 1, true);
                subqueries.push((Occur::Should, Box::new(fuzzy_name)));
            }

            let desc_term = Term::from_field_text(guard.fields.description_text, term);
            subqueries.push((
                Occur::Should,
                Box::new(TermQuery::new(desc_term.clone(), IndexRecordOption::Basic)),
            ));

            if term.len() >= 3 {
                let fuzzy_desc = FuzzyTermQuery::new(desc_term, 1, true);
                subqueries.push((Occur::Should, Box::new(fuzzy_desc)));
            }
        }

        let query = BooleanQuery::new(subqueries);

        // Over-collect so equal-score hits can be reordered by store id
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.max(1) * 2))
            .map_err(|e| SearchError::Query(format!("Search failed: {e}")))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc = searcher
                .doc::<tantivy::TantivyDocument>(doc_address)
                .map_err(|e| SearchError::Query(format!("Failed to retrieve doc: {e}")))?;
            hits.push(Self::doc_to_hit(&guard.fields, &doc, score)?);
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);

        Ok(hits)
    }

    /// Convert a Tantivy document to a search hit.
    fn doc_to_hit(
        fields: &SearchFields,
        doc: &tantivy::TantivyDocument,
        score: f32,
    ) -> Result<SearchHit, SearchError> {
        let get_text = |field: Field| -> String {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let raw_id = doc
            .get_first(fields.id)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| SearchError::Query("Document missing id field".to_string()))?;
        let id = i32::try_from(raw_id)
            .map_err(|_| SearchError::Query(format!("Document id out of range: {raw_id}")))?;

        Ok(SearchHit {
            id: StoreId::new(id),
            slug: get_text(fields.slug),
            name: get_text(fields.name),
            description: get_text(fields.description),
            score,
        })
    }

    /// Get the number of documents in the index.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.inner
            .read()
            .ok()
            .map(|guard| guard.reader.searcher().num_docs())
            .unwrap_or(0)
    }
}

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Index error: {0}")]
    Index(String),
    #[error("Query error: {0}")]
    Query(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use streetside_core::UserId;

    use crate::models::{Location, Store};

    use super::*;

    fn store(id: i32, name: &str, description: &str) -> Store {
        Store {
            id: StoreId::new(id),
            name: name.to_owned(),
            slug: crate::slug::slugify(name).unwrap(),
            description: (!description.is_empty()).then(|| description.to_owned()),
            tags: BTreeSet::new(),
            location: Location::new(0.0, 0.0, "somewhere").unwrap(),
            photo: None,
            author: UserId::new(1),
            created_at: Utc::now(),
        }
    }

    fn indexed(stores: &[Store]) -> SearchIndex {
        let index = SearchIndex::new().unwrap();
        index.rebuild(stores).unwrap();
        index
    }

    #[test]
    fn test_empty_query_yields_no_hits() {
        let index = indexed(&[store(1, "Cafe Luna", "espresso bar")]);
        assert!(index.search("", 5).unwrap().is_empty());
        assert!(index.search("   ", 5).unwrap().is_empty());
    }

    #[test]
    fn test_name_match() {
        let index = indexed(&[
            store(1, "Cafe Luna", "espresso bar"),
            store(2, "Taco Town", "tacos and more"),
        ]);

        let hits = index.search("luna", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "cafe-luna");
    }

    #[test]
    fn test_description_match() {
        let index = indexed(&[
            store(1, "Cafe Luna", "espresso bar"),
            store(2, "Taco Town", "tacos and more"),
        ]);

        let hits = index.search("espresso", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Cafe Luna");
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let index = indexed(&[store(1, "Cafe Luna", "")]);
        assert_eq!(index.search("LUNA", 5).unwrap().len(), 1);
    }

    #[test]
    fn test_limit_respected_and_scores_descending() {
        let stores: Vec<Store> = (1..=10)
            .map(|i| store(i, &format!("Coffee Spot {i}"), "coffee"))
            .collect();
        let index = indexed(&stores);

        let hits = index.search("coffee", 5).unwrap();
        assert_eq!(hits.len(), 5);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_equal_scores_tie_broken_by_id() {
        let index = indexed(&[store(3, "Twin Cafe", ""), store(1, "Twin Cafe", "")]);

        let hits = index.search("twin", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, StoreId::new(1));
        assert_eq!(hits[1].id, StoreId::new(3));
    }

    #[test]
    fn test_upsert_replaces_document() {
        let index = indexed(&[store(1, "Cafe Luna", "")]);

        let renamed = store(1, "Moonlight Cafe", "");
        index.upsert_store(&renamed).unwrap();

        assert!(index.search("luna", 5).unwrap().is_empty());
        let hits = index.search("moonlight", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(index.num_docs(), 1);
    }

    #[test]
    fn test_rebuild_clears_previous_documents() {
        let index = indexed(&[store(1, "Cafe Luna", "")]);
        index.rebuild(&[store(2, "Taco Town", "")]).unwrap();

        assert!(index.search("luna", 5).unwrap().is_empty());
        assert_eq!(index.search("taco", 5).unwrap().len(), 1);
    }
}
