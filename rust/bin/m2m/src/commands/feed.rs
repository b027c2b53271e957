//! Feed browsing and engagement.

use anyhow::Result;
use m2m_client::{Content, FeedMode, SearchQuery};
use m2m_core::PageParams;
use m2m_feed::{FeedController, FeedItem, FeedPhase, LikeSettlement, PageOutcome, ShareSettlement};

use super::Context;

pub async fn list(ctx: &Context, mode: FeedMode, pages: u32) -> Result<()> {
    let controller = ctx.controller().await?;
    load_pages(&controller, mode, pages.max(1), None).await?;
    print_items(ctx, &controller.items())?;

    if !ctx.json() {
        let status = controller.status();
        let more = if status.phase == FeedPhase::Exhausted { "end of feed" } else { "more available" };
        println!("\n{} items from {} ({})", status.item_count, mode, more);
    }
    Ok(())
}

pub async fn like(ctx: &Context, id: &str, mode: FeedMode, pages: u32) -> Result<()> {
    let controller = signed_in(ctx).await?;
    find(&controller, id, mode, pages).await?;

    let settlement = controller.toggle_like(id).await?;
    let liked = controller.is_liked(id);
    let count = like_count(&controller, id);
    match settlement {
        LikeSettlement::Confirmed => {
            println!("{} {} ({} likes)", if liked { "Liked" } else { "Unliked" }, id, count)
        }
        LikeSettlement::RolledBack | LikeSettlement::Superseded | LikeSettlement::Deferred => {
            anyhow::bail!("Server rejected the change; {} is still {}", id, if liked { "liked" } else { "not liked" })
        }
        LikeSettlement::Stale => anyhow::bail!("Feed changed while the request was in flight"),
    }
    Ok(())
}

pub async fn share(ctx: &Context, id: &str, mode: FeedMode, pages: u32) -> Result<()> {
    let controller = signed_in(ctx).await?;
    find(&controller, id, mode, pages).await?;

    match controller.record_share(id).await? {
        ShareSettlement::Confirmed => println!("Shared {}.", id),
        ShareSettlement::Kept => println!("Shared {} (server did not record it).", id),
        ShareSettlement::Stale => anyhow::bail!("Feed changed while the request was in flight"),
    }
    Ok(())
}

pub async fn shorts(ctx: &Context) -> Result<()> {
    let controller = ctx.controller().await?;
    let shorts = controller.shorts_preview(ctx.config.shorts_preview).await?;
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&shorts)?);
        return Ok(());
    }
    if shorts.is_empty() {
        println!("No trending shorts.");
    }
    for c in &shorts {
        println!("{:<28} {:>7} views  {}", c.id, c.view_count, truncate(c.caption(), 48));
    }
    Ok(())
}

pub async fn search(ctx: &Context, query: &SearchQuery, page: u32) -> Result<()> {
    let viewer = ctx.auth()?.restore_session().await?.map(|u| u.id);
    let params = PageParams::new(page, ctx.config.page_size);
    let hits = ctx.content()?.search(query, params, viewer.as_deref()).await?;
    print_content(ctx, &hits.content)?;
    if !ctx.json() && !hits.last {
        println!("
more results: --page {}", page + 1);
    }
    Ok(())
}

/// A user's own posts, or the posts they liked.
pub async fn posts(ctx: &Context, user_id: &str, liked: bool, page: u32) -> Result<()> {
    let viewer = ctx.auth()?.restore_session().await?.map(|u| u.id);
    let params = PageParams::new(page, ctx.config.page_size);
    let api = ctx.content()?;
    let items = if liked {
        api.liked_content(user_id, params, viewer.as_deref()).await?.content.content
    } else {
        api.creator_content(user_id, params, viewer.as_deref()).await?.content
    };
    print_content(ctx, &items)
}

async fn signed_in(ctx: &Context) -> Result<FeedController> {
    let controller = ctx.controller().await?;
    if controller.caller().is_none() {
        anyhow::bail!("Not logged in. Run `m2m login`.");
    }
    Ok(controller)
}

/// Loads pages until `stop` returns true, the feed ends, or `pages` are in.
async fn load_pages(
    controller: &FeedController,
    mode: FeedMode,
    pages: u32,
    stop: Option<&dyn Fn(&FeedController) -> bool>,
) -> Result<()> {
    let mut outcome = controller.reset_feed(mode).await?;
    for _ in 1..pages {
        if outcome == PageOutcome::Exhausted || stop.is_some_and(|f| f(controller)) {
            break;
        }
        if controller.status().phase == FeedPhase::Exhausted {
            break;
        }
        outcome = controller.load_next_page().await?;
    }
    Ok(())
}

async fn find(controller: &FeedController, id: &str, mode: FeedMode, pages: u32) -> Result<()> {
    let has = |c: &FeedController| c.store().read(|s| s.contains_item(id));
    load_pages(controller, mode, pages.max(1), Some(&has)).await?;
    if !has(controller) {
        anyhow::bail!("{} not found in the first {} page(s) of {}", id, pages, mode);
    }
    Ok(())
}

fn like_count(controller: &FeedController, id: &str) -> u64 {
    controller
        .items()
        .iter()
        .find(|i| i.content.id == id)
        .map(|i| i.content.like_count)
        .unwrap_or_default()
}

fn print_items(ctx: &Context, items: &[FeedItem]) -> Result<()> {
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    println!(
        "{:<28} {:<12} {:>6} {:>6} {:>8} {:<5} CAPTION",
        "ID", "TYPE", "LIKES", "SHARES", "COMMENTS", "LIKED"
    );
    for item in items {
        let c: &Content = &item.content;
        println!(
            "{:<28} {:<12} {:>6} {:>6} {:>8} {:<5} {}",
            c.id,
            if c.is_short() { "short" } else { "meme" },
            c.like_count,
            c.share_count,
            c.comment_count,
            if item.liked() { "yes" } else { "" },
            truncate(c.caption(), 40),
        );
    }
    Ok(())
}

fn print_content(ctx: &Context, items: &[Content]) -> Result<()> {
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("Nothing found.");
    }
    for c in items {
        println!("{:<28} {:>6} likes  {}", c.id, c.like_count, truncate(c.caption(), 48));
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
