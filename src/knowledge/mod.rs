//! Knowledge corpus consumed by the text analyzer.
//!
//! A [`Corpus`] pairs the fault keyword taxonomy with the documents that
//! text evidence is matched against. Both are configuration supplied by the
//! host; a small equipment-maintenance corpus is bundled as the default.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CorpusError, CorpusResult};

const BUILTIN_CORPUS: &str = include_str!("../../assets/default_corpus.json");

/// Remediation plan used for documents that carry no curated steps.
pub const GENERIC_SOLUTION_STEPS: [&str; 6] = [
    "初步检查设备状态",
    "分析故障现象",
    "确定故障原因",
    "制定解决方案",
    "执行维修操作",
    "验证修复效果",
];

/// A knowledge base article, or the descriptor of an analyzer finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Ids of related documents in the same corpus.
    #[serde(default)]
    pub related_documents: Vec<String>,
    /// Curated remediation steps, if the author provided any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solution_steps: Vec<String>,
}

impl KnowledgeDocument {
    /// Create a document with no relations or curated steps.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: category.into(),
            tags: Vec::new(),
            created_at: Utc::now(),
            related_documents: Vec::new(),
            solution_steps: Vec::new(),
        }
    }

    /// Set the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set curated remediation steps.
    pub fn with_solution_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.solution_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Curated steps, or the generic plan when there are none.
    pub fn remediation_steps(&self) -> Vec<String> {
        if self.solution_steps.is_empty() {
            GENERIC_SOLUTION_STEPS.iter().map(|s| s.to_string()).collect()
        } else {
            self.solution_steps.clone()
        }
    }
}

/// One category of fault keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub category: String,
    pub keywords: Vec<String>,
}

/// Ordered fault keyword taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTaxonomy {
    categories: Vec<KeywordCategory>,
}

impl KeywordTaxonomy {
    /// Create a taxonomy from categories in matching order.
    pub fn new(categories: Vec<KeywordCategory>) -> Self {
        Self { categories }
    }

    /// Append a category.
    pub fn with_category<I, S>(mut self, category: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.push(KeywordCategory {
            category: category.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Categories in matching order.
    pub fn categories(&self) -> &[KeywordCategory] {
        &self.categories
    }

    /// Every keyword, category by category. Keywords listed under several
    /// categories appear once per listing.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|c| c.keywords.iter().map(String::as_str))
    }
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    #[serde(default)]
    taxonomy: KeywordTaxonomy,
    #[serde(default)]
    documents: Vec<KnowledgeDocument>,
}

/// Keyword taxonomy plus the documents it is matched against.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    taxonomy: KeywordTaxonomy,
    documents: Vec<KnowledgeDocument>,
}

impl Corpus {
    /// Build a corpus, rejecting duplicate document ids.
    pub fn new(taxonomy: KeywordTaxonomy, documents: Vec<KnowledgeDocument>) -> CorpusResult<Self> {
        let mut seen = HashSet::new();
        for doc in &documents {
            if !seen.insert(doc.id.as_str()) {
                return Err(CorpusError::DuplicateDocument { id: doc.id.clone() });
            }
        }
        Ok(Self {
            taxonomy,
            documents,
        })
    }

    /// Parse a corpus from JSON.
    pub fn from_json_str(json: &str) -> CorpusResult<Self> {
        let file: CorpusFile = serde_json::from_str(json)?;
        Self::new(file.taxonomy, file.documents)
    }

    /// Load a corpus file.
    pub fn from_path(path: impl AsRef<Path>) -> CorpusResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            documents = corpus.documents.len(),
            categories = corpus.taxonomy.categories().len(),
            "Knowledge corpus loaded"
        );
        Ok(corpus)
    }

    /// The bundled maintenance corpus.
    pub fn builtin() -> CorpusResult<Self> {
        Self::from_json_str(BUILTIN_CORPUS)
    }

    /// The keyword taxonomy.
    pub fn taxonomy(&self) -> &KeywordTaxonomy {
        &self.taxonomy
    }

    /// All documents in authored order.
    pub fn documents(&self) -> &[KnowledgeDocument] {
        &self.documents
    }

    /// Look up a document by id.
    pub fn get(&self, id: &str) -> Option<&KnowledgeDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Resolve a document's related ids, skipping ones not in the corpus.
    pub fn related_to(&self, doc: &KnowledgeDocument) -> Vec<KnowledgeDocument> {
        doc.related_documents
            .iter()
            .filter_map(|id| self.get(id))
            .cloned()
            .collect()
    }
}
