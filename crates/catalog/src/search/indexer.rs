//! Search index maintenance.
//!
//! Documents are keyed by store id: an upsert deletes the previous document
//! for the store before adding the fresh one, and a rebuild re-indexes the
//! whole catalog (used at startup and after bulk imports).

use tantivy::{TantivyDocument, Term};
use tracing::{debug, instrument};

use crate::models::Store;

use super::{SearchError, SearchFields, SearchIndex};

impl SearchIndex {
    /// Insert or replace the document for one store.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the commit fails.
    #[instrument(skip_all, fields(store_id = %store.id, slug = %store.slug))]
    pub fn upsert_store(&self, store: &Store) -> Result<(), SearchError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))?;

        let id_term = Term::from_field_u64(guard.fields.id, doc_id(store));
        guard.writer.delete_term(id_term);

        let doc = store_document(&guard.fields, store);
        guard
            .writer
            .add_document(doc)
            .map_err(|e| SearchError::Index(format!("Failed to index store: {e}")))?;

        guard
            .writer
            .commit()
            .map_err(|e| SearchError::Index(format!("Failed to commit index: {e}")))?;
        guard
            .reader
            .reload()
            .map_err(|e| SearchError::Index(format!("Failed to reload reader: {e}")))?;

        debug!("Upserted store document");
        Ok(())
    }

    /// Drop every document and re-index the given stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the commit fails.
    #[instrument(skip_all, fields(count = stores.len()))]
    pub fn rebuild(&self, stores: &[Store]) -> Result<(), SearchError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))?;

        guard
            .writer
            .delete_all_documents()
            .map_err(|e| SearchError::Index(format!("Failed to clear index: {e}")))?;

        for store in stores {
            let doc = store_document(&guard.fields, store);
            guard
                .writer
                .add_document(doc)
                .map_err(|e| SearchError::Index(format!("Failed to index store: {e}")))?;
        }

        guard
            .writer
            .commit()
            .map_err(|e| SearchError::Index(format!("Failed to commit index: {e}")))?;
        guard
            .reader
            .reload()
            .map_err(|e| SearchError::Index(format!("Failed to reload reader: {e}")))?;

        debug!("Rebuilt search index");
        Ok(())
    }
}

/// Build the Tantivy document for a store.
fn store_document(fields: &SearchFields, store: &Store) -> TantivyDocument {
    let description = store.description.clone().unwrap_or_default();

    tantivy::doc!(
        fields.id => doc_id(store),
        fields.slug => store.slug.as_str(),
        fields.name => store.name.clone(),
        fields.description => description.clone(),
        fields.name_text => store.name.clone(),
        fields.description_text => description
    )
}

/// The store's id as the u64 Tantivy documents are keyed by.
#[allow(clippy::cast_sign_loss)]
fn doc_id(store: &Store) -> u64 {
    store.id.as_i32() as u64
}
