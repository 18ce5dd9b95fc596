//! Averaged static word vectors
//!
//! Reads GloVe / word2vec plain-text tables (`word v1 ... vN` per line, with
//! an optional `count dim` header). A text's embedding is the element-wise
//! mean of the vectors of its known tokens.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::{Array1, Array2};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingBackend;

use super::assets::{AssetFetcher, AssetKind, AssetSpec};

const ASSET_NAME: &str = "static word vectors";

/// Immutable lookup table
#[derive(Debug)]
struct VectorTable {
    index: HashMap<String, usize>,
    vectors: Array2<f32>,
}

/// Static-vector embedding backend
#[derive(Debug, Clone)]
pub struct StaticVectorEmbedder {
    table: Arc<VectorTable>,
    dimensions: usize,
}

impl StaticVectorEmbedder {
    /// Parse a table, rejecting rows whose width is not `dimensions`
    pub fn from_reader<R: BufRead>(reader: R, dimensions: usize) -> Result<Self> {
        let mut index = HashMap::new();
        let mut flat: Vec<f32> = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::asset(ASSET_NAME, format!("read failed: {}", e)))?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: Vec<&str> = parts.collect();

            // word2vec header: "<count> <dim>"
            if line_no == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                if let Ok(declared) = values[0].parse::<usize>() {
                    if declared != dimensions {
                        return Err(Error::asset(
                            ASSET_NAME,
                            format!("table declares {} dimensions, expected {}", declared, dimensions),
                        ));
                    }
                    continue;
                }
            }

            if values.len() != dimensions {
                return Err(Error::asset(
                    ASSET_NAME,
                    format!(
                        "line {} has {} values, expected {}",
                        line_no + 1,
                        values.len(),
                        dimensions
                    ),
                ));
            }

            if index.contains_key(word) {
                continue;
            }

            let row = flat.len() / dimensions.max(1);
            for value in values {
                let v: f32 = value.parse().map_err(|_| {
                    Error::asset(
                        ASSET_NAME,
                        format!("line {}: '{}' is not a number", line_no + 1, value),
                    )
                })?;
                flat.push(v);
            }
            index.insert(word.to_string(), row);
        }

        let rows = index.len();
        let vectors = Array2::from_shape_vec((rows, dimensions), flat)
            .map_err(|e| Error::asset(ASSET_NAME, format!("malformed table: {}", e)))?;

        tracing::info!("Loaded {} static word vectors ({} dimensions)", rows, dimensions);

        Ok(Self {
            table: Arc::new(VectorTable { index, vectors }),
            dimensions,
        })
    }

    /// Load a table from disk
    pub fn load(path: &Path, dimensions: usize) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::asset(ASSET_NAME, format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_reader(std::io::BufReader::new(file), dimensions)
    }

    /// Acquire the configured table (downloading it when a URL is set) and load it
    pub async fn acquire(config: &EmbeddingConfig, fetcher: &AssetFetcher) -> Result<Self> {
        let settings = &config.static_vectors;
        let path = match &settings.url {
            Some(url) => {
                let spec = AssetSpec {
                    name: ASSET_NAME.to_string(),
                    url: url.clone(),
                    file_name: settings.file_name.clone(),
                    kind: AssetKind::Text,
                    min_bytes: 1024,
                    sha256: settings.sha256.clone(),
                };
                fetcher.ensure(&spec).await?
            }
            None => {
                let path = fetcher.cache_dir().join(&settings.file_name);
                if !path.exists() {
                    return Err(Error::asset(
                        ASSET_NAME,
                        format!("{} not found and no download URL configured", path.display()),
                    ));
                }
                path
            }
        };

        let dimensions = settings.dimensions;
        tokio::task::spawn_blocking(move || Self::load(&path, dimensions))
            .await
            .map_err(|e| Error::internal(format!("Vector table load panicked: {}", e)))?
    }

    /// Number of words in the table
    pub fn vocabulary_size(&self) -> usize {
        self.table.index.len()
    }

    /// Mean vector of the known tokens; zero vector when none are known
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut sum = Array1::<f32>::zeros(self.dimensions);
        let mut found = 0usize;

        for token in text.split_whitespace().filter_map(normalize_token) {
            if let Some(&row) = self.table.index.get(&token) {
                sum += &self.table.vectors.row(row);
                found += 1;
            }
        }

        if found > 0 {
            sum /= found as f32;
        }
        sum.to_vec()
    }
}

/// Lowercase and strip surrounding punctuation
fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
    if token.is_empty() {
        None
    } else {
        Some(token.to_lowercase())
    }
}

#[async_trait]
impl EmbeddingBackend for StaticVectorEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || texts.iter().map(|t| embedder.embed_text(t)).collect())
            .await
            .map_err(|e| Error::embedding(format!("Embedding task panicked: {}", e)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "static"
    }
}
