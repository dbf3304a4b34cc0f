#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fille_chat::{ChatOrchestrator, CompletionClient, PromptComposer, UpstreamError};
use fille_core::corpus::into_entries;
use fille_core::{Embedder, Metric};
use fille_vector::SimilarityIndex;

/// Maps text onto hand-picked topic axes so retrieval outcomes are predictable.
pub struct KeywordEmbedder;

const TOPICS: [&[&str]; 3] = [
    &["bleeding", "spotting", "pregnancy", "pregnant", "early"],
    &["exercise", "hormonal", "hormones", "workout"],
    &["sleep", "tired", "fatigue"],
];

impl Embedder for KeywordEmbedder {
    fn dim(&self) -> usize { TOPICS.len() }
    fn max_len(&self) -> usize { usize::MAX }
    fn model_id(&self) -> &str { "keyword:test" }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lowered = t.to_lowercase();
                TOPICS
                    .iter()
                    .map(|words| words.iter().filter(|w| lowered.contains(*w)).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Encoder that fails every call, or panics when `panic` is set.
pub struct BrokenEmbedder {
    pub panic: bool,
}

impl Embedder for BrokenEmbedder {
    fn dim(&self) -> usize { TOPICS.len() }
    fn max_len(&self) -> usize { usize::MAX }
    fn model_id(&self) -> &str { "broken:test" }

    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.panic {
            panic!("encoder crashed");
        }
        Err(anyhow::anyhow!("model weights unavailable"))
    }
}

/// Completion client that replays scripted results and records prompts.
pub struct ScriptedClient {
    script: Mutex<Vec<Result<String, UpstreamError>>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, UpstreamError>>) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(script), calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()) })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(UpstreamError::Malformed("script exhausted".to_string()));
        }
        script.remove(0)
    }
}

pub const CORPUS: [&str; 2] = [
    "Spotting is common in early pregnancy.",
    "Regular exercise supports hormonal balance.",
];

pub fn orchestrator(client: Arc<dyn CompletionClient>) -> ChatOrchestrator {
    orchestrator_with(Arc::new(KeywordEmbedder), client)
}

/// Index built with the keyword encoder, queries encoded by `embedder`.
pub fn orchestrator_with(embedder: Arc<dyn Embedder>, client: Arc<dyn CompletionClient>) -> ChatOrchestrator {
    let index = SimilarityIndex::build(into_entries(CORPUS), &KeywordEmbedder, Metric::Cosine, 8).expect("index");
    ChatOrchestrator::new(embedder, Arc::new(index), PromptComposer::default(), client)
}

/// Serve `router` on an ephemeral local port and return its completions URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{addr}/openai/v1/chat/completions")
}
