use super::send_chunked;
use crate::docs::display_name;
use crate::highlight::{NavigationOutcome, NavigationRequest};
use crate::state::Context;
use tracing::info;

/// Jump to a citation from the last answer in this channel
#[poise::command(slash_command, guild_only)]
pub async fn cite(
    ctx: Context<'_>,
    #[description = "Citation number"] number: u32,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    let channel_id = ctx.channel_id().get();
    let Some(answer) = ctx.data().last_answer(channel_id).await else {
        ctx.say("No answer with citations in this channel yet. Try `/kb ask` first.")
            .await?;
        return Ok(());
    };
    let Some(citation) = answer.citation(number as usize) else {
        ctx.say(format!(
            "The last answer has {} citation(s); there is no [{}].",
            answer.citations.len(),
            number
        ))
        .await?;
        return Ok(());
    };

    let name = display_name(&citation.token.source_name).to_string();
    let Some(doc_id) = citation.target.clone() else {
        ctx.say(format!("[{}] cites `{}`, which is not in the knowledge base.", number, name))
            .await?;
        return Ok(());
    };

    let config = ctx.data().cite_config.read().await.clone();
    let viewer = ctx.data().viewer(channel_id).await;
    viewer
        .renderer()
        .lock()
        .await
        .set_window(config.highlight.viewport_blocks);

    let outcome = viewer
        .navigate(
            NavigationRequest {
                doc_id,
                quote: citation.token.quoted_span.clone(),
            },
            &config.locator,
            &config.highlight,
        )
        .await;

    let header = match &outcome {
        NavigationOutcome::Highlighted(m) => format!(
            "**{}** [{}] (matched: `{}`, score {})",
            name,
            number,
            m.strategy.as_str(),
            m.score
        ),
        NavigationOutcome::NoHighlight(Some(_)) => {
            format!("**{}** [{}] (quoted passage not found, showing the top)", name, number)
        }
        NavigationOutcome::NoHighlight(None) => format!("**{}** [{}]", name, number),
        NavigationOutcome::BlockMissing(_) => {
            format!("**{}** [{}] (passage could not be displayed)", name, number)
        }
        NavigationOutcome::Superseded => {
            info!(channel_id, number, "citation jump superseded");
            ctx.say(format!(
                "[{}] was replaced by a newer request in this channel.",
                number
            ))
            .await?;
            return Ok(());
        }
    };

    let body = viewer.renderer().lock().await.render();
    send_chunked(&ctx, &format!("{}\n\n{}", header, body)).await
}
