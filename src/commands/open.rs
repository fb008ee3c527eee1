use super::{autocomplete_document, send_chunked};
use crate::docs::display_name;
use crate::highlight::{NavigationOutcome, NavigationRequest};
use crate::state::Context;

/// Open a document from the knowledge base
#[poise::command(slash_command, guild_only)]
pub async fn open(
    ctx: Context<'_>,
    #[description = "Document name"]
    #[autocomplete = "autocomplete_document"]
    document: String,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let (node_id, kind, headings) = {
        let tree = ctx.data().tree.read().await;
        let Some(node) = tree.resolve_by_name(&document) else {
            ctx.say(format!("No document named `{}` in the knowledge base.", document))
                .await?;
            return Ok(());
        };
        (node.id.clone(), node.kind, tree.headings(&node.id))
    };

    let config = ctx.data().cite_config.read().await.clone();
    let viewer = ctx.data().viewer(ctx.channel_id().get()).await;
    viewer
        .renderer()
        .lock()
        .await
        .set_window(config.highlight.viewport_blocks);
    let outcome = viewer
        .navigate(
            NavigationRequest {
                doc_id: node_id,
                quote: None,
            },
            &config.locator,
            &config.highlight,
        )
        .await;
    if outcome == NavigationOutcome::Superseded {
        ctx.say(format!("Opening `{}` was replaced by a newer request in this channel.", document))
            .await?;
        return Ok(());
    }

    let mut out = format!("**{}** ({})\n", display_name(&document), kind.as_str());
    if !headings.is_empty() {
        out.push_str("\n**Contents:**\n");
        for h in &headings {
            out.push_str(&format!("{}- {}\n", "  ".repeat(h.level as usize - 1), h.text));
        }
    }
    out.push('\n');
    out.push_str(&viewer.renderer().lock().await.render());
    send_chunked(&ctx, &out).await
}

/// Show the knowledge base file tree
#[poise::command(slash_command, guild_only)]
pub async fn tree(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let outline = ctx.data().tree.read().await.outline();
    if outline.is_empty() {
        ctx.say("The knowledge base is empty. Use `/kb ingest` to add documents.")
            .await?;
        return Ok(());
    }
    send_chunked(&ctx, &format!("**Knowledge Base**\n{}", outline)).await
}
