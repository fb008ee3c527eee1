use std::time::Duration;

use crate::state::{CiteConfig, Context};

const PARAMS: &str = "`window_len`, `score_floor`, `max_span_ratio`, `min_punct_len`, \
`min_partial_len`, `settle_ms`, `retry_ms`, `max_attempts`, `viewport_blocks`";

/// Configure citation matching and highlighting (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "Parameter name (omit to show all)"] param: Option<String>,
    #[description = "New value"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().cite_config.read().await;
            ctx.say(describe(&config)).await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => {
            let mut config = ctx.data().cite_config.write().await;
            match apply(&mut config, key, val) {
                Ok(()) => ctx.say(format!("`{}` set to {}", key, val)).await?,
                Err(msg) => ctx.say(msg).await?,
            };
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/kb config score_floor 40`")
                .await?;
        }
    }

    Ok(())
}

fn describe(config: &CiteConfig) -> String {
    let l = &config.locator;
    let h = &config.highlight;
    format!(
        "**Citation Matching:**\n\
         `window_len`: {}\n\
         `score_floor`: {}\n\
         `max_span_ratio`: {}\n\
         `min_punct_len`: {}\n\
         `min_partial_len`: {}\n\
         **Highlighting:**\n\
         `settle_ms`: {}\n\
         `retry_ms`: {}\n\
         `max_attempts`: {}\n\
         `viewport_blocks`: {}",
        l.window_len,
        l.score_floor,
        l.max_span_ratio,
        l.min_punct_len,
        l.min_partial_len,
        h.settle_delay.as_millis(),
        h.retry_interval.as_millis(),
        h.max_attempts,
        h.viewport_blocks,
    )
}

fn apply(config: &mut CiteConfig, key: &str, val: u32) -> Result<(), String> {
    let n = val as usize;
    match key {
        "window_len" if val == 0 => return Err("`window_len` must be at least 1".into()),
        "window_len" => config.locator.window_len = n,
        "score_floor" if val > 100 => return Err("`score_floor` is a percentage (0-100)".into()),
        "score_floor" => config.locator.score_floor = val,
        "max_span_ratio" if val == 0 => {
            return Err("`max_span_ratio` must be at least 1".into())
        }
        "max_span_ratio" => config.locator.max_span_ratio = n,
        "min_punct_len" => config.locator.min_punct_len = n,
        "min_partial_len" => config.locator.min_partial_len = n,
        "settle_ms" => config.highlight.settle_delay = Duration::from_millis(val.into()),
        "retry_ms" => config.highlight.retry_interval = Duration::from_millis(val.into()),
        "max_attempts" if val == 0 => return Err("`max_attempts` must be at least 1".into()),
        "max_attempts" => config.highlight.max_attempts = val,
        "viewport_blocks" if val == 0 => {
            return Err("`viewport_blocks` must be at least 1".into())
        }
        "viewport_blocks" => config.highlight.viewport_blocks = n,
        _ => return Err(format!("Unknown param `{}`. Valid: {}", key, PARAMS)),
    }
    Ok(())
}
