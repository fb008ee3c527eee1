use crate::docs::ingest as doc_ingest;
use crate::state::Context;
use tracing::info;

/// Add a web page to the knowledge base
#[poise::command(slash_command, guild_only)]
pub async fn ingest(
    ctx: Context<'_>,
    #[description = "URL of the page"] url: String,
    #[description = "Folder to put it in"] folder: String,
    #[description = "Document name (defaults to the last URL segment)"] name: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(user = ctx.author().name, url, folder, "Ingestion started");

    let (doc_id, size) =
        doc_ingest::ingest_url(&ctx.data().tree, &url, name.as_deref(), &folder).await?;

    let name = ctx
        .data()
        .tree
        .read()
        .await
        .find_by_id(&doc_id)
        .map(|n| n.name.clone())
        .unwrap_or_default();

    ctx.say(format!(
        "Ingested **{}** into **{}** ({} bytes of text)\nDoc ID: `{}`",
        name,
        folder,
        size,
        &doc_id[..12]
    ))
    .await?;

    Ok(())
}
