//! `conclave knowledge` — Add documents to and search the knowledge base.

use std::path::Path;
use anyhow::{Context, bail};
use conclave_core::knowledge::KnowledgeQuery;

pub fn add(config: Option<&Path>, collection: &str, title: &str, file: &Path) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let kb = conclave_knowledge::file_backend_from_config(&config)?;
    let path = kb.add_document(collection, title, &body)?;

    println!("✅ Added '{title}' to {collection}: {}", path.display());
    Ok(())
}

pub async fn search(
    config: Option<&Path>,
    capability: &str,
    query: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let Some(descriptor) = config
        .capability_descriptors()
        .into_iter()
        .find(|d| d.id.as_str() == capability)
    else {
        bail!("Unknown capability '{capability}' (see `conclave capabilities`)");
    };

    let lookup = conclave_knowledge::build_from_config(&config)?;
    let snippets = lookup
        .search(KnowledgeQuery::new(descriptor.id.clone(), &descriptor.collection, query).with_limit(limit))
        .await?;

    if snippets.is_empty() {
        println!("No documents in '{}' match \"{query}\"", descriptor.collection);
        return Ok(());
    }

    println!("📚 {} result(s) for {} ({} backend)", snippets.len(), descriptor.id, lookup.name());
    for snippet in &snippets {
        println!("\n  [{:>3}] {}", snippet.score, snippet.title);
        for line in snippet.body.lines().take(3) {
            println!("        {line}");
        }
    }
    Ok(())
}
