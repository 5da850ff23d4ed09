//! Per-project glossaries imported from two-column spreadsheets.
//!
//! The first row of the first sheet is a header; every following row maps
//! column A (source term) to column B (target term).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::GlossaryError;
use crate::normalizer::{classify, spreadsheet, DocumentKind};
use crate::store::{Namespace, RecordStore, StoreError};

pub type Terms = BTreeMap<String, String>;

/// Outcome of storing a glossary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryImport {
    pub name: String,
    pub term_count: usize,
    /// A glossary with the same name was replaced.
    pub overwritten: bool,
}

/// Reads the term pairs from spreadsheet bytes.
pub fn parse_terms(name: &str, bytes: &[u8]) -> Result<Terms, GlossaryError> {
    let sheets = spreadsheet::read_sheets(bytes).map_err(|e| e.with_filename(name))?;
    let Some(sheet) = sheets.into_iter().next() else {
        return Err(GlossaryError::Empty {
            name: name.to_string(),
        });
    };

    let terms: Terms = sheet
        .rows
        .into_iter()
        .skip(1)
        .filter_map(|row| {
            let mut cells = row.into_iter();
            let source = cells.next().flatten()?;
            let target = cells.next().flatten().unwrap_or_default();
            let source = source.trim().to_string();
            (!source.is_empty()).then(|| (source, target.trim().to_string()))
        })
        .collect();

    if terms.is_empty() {
        return Err(GlossaryError::Empty {
            name: name.to_string(),
        });
    }
    Ok(terms)
}

#[derive(Clone)]
pub struct GlossaryBook {
    store: Arc<dyn RecordStore>,
    namespace: Namespace,
}

impl GlossaryBook {
    pub fn new(store: Arc<dyn RecordStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn names(&self, project: &str) -> Result<Vec<String>, StoreError> {
        self.store.hkeys(&self.namespace.glossaries(project))
    }

    pub fn get(&self, project: &str, name: &str) -> Result<Option<Terms>, StoreError> {
        let partition = self.namespace.glossaries(project);
        let Some(raw) = self.store.hget(&partition, name)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                partition,
                field: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parses an uploaded spreadsheet and stores it under `name`, replacing
    /// any glossary of the same name.
    pub fn import(
        &self,
        project: &str,
        name: &str,
        bytes: &[u8],
    ) -> Result<GlossaryImport, GlossaryError> {
        if classify(name) != DocumentKind::Spreadsheet {
            return Err(GlossaryError::Unsupported {
                name: name.to_string(),
            });
        }

        let terms = parse_terms(name, bytes)?;
        let partition = self.namespace.glossaries(project);
        let overwritten = self.store.hexists(&partition, name)?;

        let value = serde_json::to_string(&terms).map_err(|e| StoreError::Corrupt {
            partition: partition.clone(),
            field: name.to_string(),
            reason: e.to_string(),
        })?;
        self.store.hset(&partition, name, &value)?;

        log::info!(
            "Glossary '{}' stored for project '{}' ({} terms, overwritten: {})",
            name,
            project,
            terms.len(),
            overwritten
        );

        Ok(GlossaryImport {
            name: name.to_string(),
            term_count: terms.len(),
            overwritten,
        })
    }
}
