use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use fille_core::corpus::load_corpus;
use fille_core::{Embedder, Settings};
use fille_embed::get_default_embedder;
use fille_vector::SimilarityIndex;

use crate::completion::ChatCompletionsClient;
use crate::orchestrator::ChatOrchestrator;
use crate::prompt::PromptComposer;

/// One-time startup: load the corpus, pick the embedder, build the index and
/// the upstream client. Blocks on model loading and corpus encoding, so call
/// it before serving (from a blocking context when inside a runtime).
pub fn bootstrap(settings: &Settings) -> Result<ChatOrchestrator> {
    settings.validate()?;
    let cwd = std::env::current_dir().context("resolving working directory")?;
    let corpus_path = settings.corpus.resolved_path(&cwd);
    let corpus = load_corpus(&corpus_path)?;

    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let index = SimilarityIndex::build(corpus, embedder.as_ref(), settings.retrieval.metric, settings.embedding.batch_size)?;
    let client = ChatCompletionsClient::from_settings(&settings.upstream)?;
    tracing::info!(
        corpus = index.len(),
        dim = index.dim(),
        metric = ?index.metric(),
        embedder = embedder.model_id(),
        model = client.model(),
        timeout_secs = client.timeout().as_secs(),
        "Chat pipeline initialized"
    );

    Ok(ChatOrchestrator::new(embedder, Arc::new(index), PromptComposer::from_settings(&settings.prompt), Arc::new(client))
        .with_max_retries(settings.upstream.max_retries)
        .with_deadline(Duration::from_secs(settings.upstream.timeout_secs)))
}
