//! Look up the corpus snippets closest to a query without calling the
//! completion API. Handy for checking what context a question would get.

use std::env;

use fille_core::config::{CorpusSettings, EmbeddingSettings, LogSettings, RetrievalSettings};
use fille_core::corpus::load_corpus;
use fille_core::{Config, Embedder};
use fille_embed::get_default_embedder;
use fille_server::init_tracing;
use fille_vector::SimilarityIndex;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [--limit N]", args[0]);
        eprintln!("Example: {} 'Is light bleeding normal early on?' --limit 3", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let mut limit = 5usize;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                Some(l) => { limit = l; i += 1; }
                None => { eprintln!("Error: --limit requires a number"); std::process::exit(1); }
            },
            other => { eprintln!("Ignoring unknown argument {other}"); }
        }
        i += 1;
    }

    // Only the retrieval half of the settings is needed, so no API key is required.
    let config = Config::load()?;
    init_tracing(&config.get::<LogSettings>("log").unwrap_or_default());
    let corpus_settings: CorpusSettings = config.get("corpus")?;
    let embedding: EmbeddingSettings = config.get("embedding")?;
    let retrieval: RetrievalSettings = config.get("retrieval")?;

    let corpus = load_corpus(&corpus_settings.resolved_path(&env::current_dir()?))?;
    let embedder: Box<dyn Embedder> = get_default_embedder(&embedding)?;
    let index = SimilarityIndex::build(corpus, embedder.as_ref(), retrieval.metric, embedding.batch_size)?;

    println!("fille-nearest\n=============");
    println!("Query: {}", query_text);
    println!("Corpus: {} snippets, dim={}, metric={:?}", index.len(), index.dim(), index.metric());
    let query = embedder.embed_text(query_text)?;
    let results = index.search(&query, limit);
    println!("\nFound {} results for: \"{}\"", results.len(), query_text);
    for (rank, hit) in results.iter().enumerate() {
        println!("\n  {}. score={:.4}  id={}", rank + 1, hit.score, hit.id);
        println!("     {}", hit.entry.text);
    }
    Ok(())
}
