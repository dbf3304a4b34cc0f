use anyhow::{Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};

use fille_core::traits::Embedder;
use fille_core::types::{CorpusEntry, EntryId};
use fille_core::{Error, Metric};

use crate::metric::{dot, prepare};

/// A corpus entry matched by a query, with its similarity score.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub id: EntryId,
    pub entry: &'a CorpusEntry,
    pub score: f32,
}

/// Exact-scan similarity index. Never empty; every vector has length `dim`.
pub struct SimilarityIndex {
    entries: Vec<CorpusEntry>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
    metric: Metric,
}

impl SimilarityIndex {
    /// Encode `corpus` in batches and index the vectors in corpus order.
    pub fn build(corpus: Vec<CorpusEntry>, embedder: &dyn Embedder, metric: Metric, batch_size: usize) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus("<in-memory corpus>".to_string()).into());
        }
        tracing::info!(entries = corpus.len(), model = embedder.model_id(), ?metric, "Building similarity index");
        let pb = ProgressBar::new(corpus.len() as u64);
        pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} snippets ({percent}%)")?.progress_chars("#>-"));

        let mut vectors = Vec::with_capacity(corpus.len());
        for chunk in corpus.chunks(batch_size.max(1)) {
            let texts: Vec<String> = chunk.iter().map(|e| e.text.clone()).collect();
            let batch = embedder.embed_batch(&texts)?;
            if batch.len() != texts.len() {
                return Err(anyhow!("embedder returned {} vectors for {} texts", batch.len(), texts.len()));
            }
            vectors.extend(batch);
            pb.inc(chunk.len() as u64);
        }
        pb.finish_and_clear();
        let index = Self::from_parts(corpus, vectors, metric)?;
        tracing::info!(entries = index.len(), dim = index.dim(), "Similarity index ready");
        Ok(index)
    }

    /// Index precomputed vectors. `vectors[i]` belongs to `entries[i]`.
    pub fn from_parts(entries: Vec<CorpusEntry>, vectors: Vec<Vec<f32>>, metric: Metric) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::EmptyCorpus("<in-memory corpus>".to_string()).into());
        }
        if entries.len() != vectors.len() {
            return Err(anyhow!("{} entries but {} vectors", entries.len(), vectors.len()));
        }
        let dim = vectors[0].len();
        if dim == 0 {
            return Err(anyhow!("embedding dimension must be positive"));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(anyhow!("vector {} has dimension {}, expected {}", i, v.len(), dim));
        }
        let vectors = vectors.into_iter().map(|v| prepare(metric, v)).collect();
        Ok(Self { entries, vectors, dim, metric })
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn dim(&self) -> usize { self.dim }
    pub fn metric(&self) -> Metric { self.metric }
    pub fn entry(&self, id: EntryId) -> Option<&CorpusEntry> { self.entries.get(id) }

    /// The single best match. Ties go to the lowest id; NaN scores never win.
    ///
    /// # Panics
    /// If `query.len() != self.dim()`.
    pub fn nearest(&self, query: &[f32]) -> Neighbor<'_> {
        let mut best = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for (i, score) in self.scores(query).enumerate() {
            if i == 0 || score > best_score {
                best = i;
                best_score = score;
            }
        }
        Neighbor { id: best, entry: &self.entries[best], score: best_score }
    }

    /// Top `k` matches, best first; equal scores keep corpus order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor<'_>> {
        let mut scored: Vec<(usize, f32)> = self.scores(query).enumerate().collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored.into_iter().map(|(id, score)| Neighbor { id, entry: &self.entries[id], score }).collect()
    }

    fn scores<'a>(&'a self, query: &[f32]) -> impl Iterator<Item = f32> + 'a {
        assert_eq!(query.len(), self.dim, "query dimension {} does not match index dimension {}", query.len(), self.dim);
        let q = prepare(self.metric, query.to_vec());
        self.vectors.iter().map(move |v| {
            let s = dot(&q, v);
            if s.is_nan() { f32::NEG_INFINITY } else { s }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: usize) -> Vec<CorpusEntry> {
        (0..n).map(|i| CorpusEntry::new(i, format!("snippet {i}"))).collect()
    }

    #[test]
    fn ties_resolve_to_lowest_id() {
        let idx = SimilarityIndex::from_parts(entries(3), vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]], Metric::Dot).unwrap();
        assert_eq!(idx.nearest(&[1.0, 0.0]).id, 1);
    }

    #[test]
    fn dot_and_cosine_can_disagree() {
        // Entry 1 points the same way as the query but is short; entry 0 is long and off-axis.
        let vectors = vec![vec![10.0, 5.0], vec![0.5, 0.0]];
        let dot_idx = SimilarityIndex::from_parts(entries(2), vectors.clone(), Metric::Dot).unwrap();
        let cos_idx = SimilarityIndex::from_parts(entries(2), vectors, Metric::Cosine).unwrap();
        assert_eq!(dot_idx.nearest(&[1.0, 0.0]).id, 0);
        assert_eq!(cos_idx.nearest(&[1.0, 0.0]).id, 1);
    }

    #[test]
    fn nan_scores_never_win() {
        let idx = SimilarityIndex::from_parts(entries(2), vec![vec![f32::NAN, 0.0], vec![0.1, 0.0]], Metric::Dot).unwrap();
        assert_eq!(idx.nearest(&[1.0, 0.0]).id, 1);
    }

    #[test]
    fn rejects_ragged_vectors() {
        assert!(SimilarityIndex::from_parts(entries(2), vec![vec![1.0, 0.0], vec![1.0]], Metric::Dot).is_err());
        assert!(SimilarityIndex::from_parts(entries(2), vec![vec![1.0, 0.0]], Metric::Dot).is_err());
    }

    #[test]
    #[should_panic(expected = "does not match index dimension")]
    fn query_dimension_mismatch_panics() {
        let idx = SimilarityIndex::from_parts(entries(1), vec![vec![1.0, 0.0]], Metric::Dot).unwrap();
        let _ = idx.nearest(&[1.0, 0.0, 0.0]);
    }
}
