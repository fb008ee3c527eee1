mod ask;
mod cite;
mod config;
mod ingest;
mod manage;
mod open;

use crate::state::Context;

/// Knowledge base reader with cited answers
#[poise::command(
    slash_command,
    subcommands(
        "ask::ask",
        "cite::cite",
        "open::open",
        "open::tree",
        "ingest::ingest",
        "manage::clear",
        "config::config"
    )
)]
pub async fn kb(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Send a reply in Discord-sized chunks. Follow-ups go through the
/// interaction webhook, so no Send Messages permission is needed.
pub(crate) async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in split_chunks(text, 1990) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Split at the last newline (or space) before `max` bytes, never inside a char.
fn split_chunks(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let mut chunk_len = remaining.len().min(max);
        while !remaining.is_char_boundary(chunk_len) {
            chunk_len -= 1;
        }
        if chunk_len == 0 {
            chunk_len = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }
        let split_at = if chunk_len < remaining.len() {
            remaining[..chunk_len]
                .rfind('\n')
                .or_else(|| remaining[..chunk_len].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(chunk_len)
        } else {
            chunk_len
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

/// Autocomplete for document names in the knowledge base.
async fn autocomplete_document(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let tree = ctx.data().tree.read().await;
    let partial = partial.to_lowercase();
    tree.documents()
        .into_iter()
        .map(|d| d.name.clone())
        .filter(|name| name.to_lowercase().contains(&partial))
        .take(25)
        .collect()
}
