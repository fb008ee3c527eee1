use super::{autocomplete_document, send_chunked};
use crate::chat;
use crate::state::Context;
use tracing::info;

/// Ask a question about the knowledge base
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
    #[description = "Document to focus on"]
    #[autocomplete = "autocomplete_document"]
    document: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(
        user = ctx.author().name,
        question,
        document = document.as_deref().unwrap_or("-"),
        "question received"
    );

    let channel_id = ctx.channel_id().get();
    let viewing = ctx.data().active_document(channel_id).await;

    let answer = {
        let tree = ctx.data().tree.read().await;
        let selected: Vec<_> = match document.as_deref() {
            Some(name) => match tree.resolve_by_name(name) {
                Some(node) => vec![node],
                None => {
                    ctx.say(format!("No document named `{}` in the knowledge base.", name))
                        .await?;
                    return Ok(());
                }
            },
            None => chat::default_selection(&tree, viewing.as_deref()),
        };
        chat::ask(&ctx.data().llm, &tree, &question, &selected).await?
    };

    let mut full = format!(
        "**Q:** {}\n\n{}",
        question,
        chat::render_answer(&answer)
    );
    if answer.citations.iter().any(|c| c.is_actionable()) {
        full.push_str("\nUse `/kb cite <number>` to jump to a cited passage.");
    }

    ctx.data()
        .set_answer(channel_id, answer)
        .await;

    send_chunked(&ctx, &full).await
}
