use crate::state::Context;

/// Clear the highlighted passage in this channel
#[poise::command(slash_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let viewer = ctx.data().viewer(ctx.channel_id().get()).await;
    viewer.clear().await;
    ctx.say("Highlight cleared.").await?;
    Ok(())
}
