//! `post`

use chrono::Utc;
use tracing::error;

use crate::cli::types::PostKind;
use crate::social::{run_post, AnyPoster, PostReport};
use crate::Result;

use super::CommandContext;

/// Compose and (with `live`) send one kind of post.
///
/// Only a live post without a configured webhook is an error; anything that
/// goes wrong upstream is printed and logged.
pub async fn handle_post(
    ctx: &CommandContext,
    kind: PostKind,
    live: bool,
    force: bool,
) -> Result<Option<PostReport>> {
    let poster = AnyPoster::select(live, ctx.config.social.as_ref(), ctx.fetcher.client().clone())?;

    match run_post(&ctx.run_context(), kind, &poster, force, Utc::now()).await {
        Ok(report) => {
            if !live {
                for text in &report.composed {
                    println!("{}\n", text);
                }
            }
            println!("{}: {}", kind, report.summary());
            Ok(Some(report))
        }
        Err(e) => {
            error!(kind = %kind, error = %e, "post failed");
            println!("{}: failed: {}", kind, e);
            Ok(None)
        }
    }
}
