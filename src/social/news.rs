//! News roundup: the top story from each outlet, best effort

use scraper::Html;
use tracing::{info, warn};

use super::{PostReport, Poster};
use crate::cli::types::PostKind;
use crate::core::{element_text, selector};
use crate::pipeline::RunContext;
use crate::Result;

/// Where an outlet keeps its top story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outlet {
    pub source: &'static str,
    pub path: &'static str,
    /// The first element matching this is the top story.
    pub item: &'static str,
    pub headline: &'static str,
    pub link: &'static str,
    /// Links are site-relative and need the outlet's base URL.
    pub relative_links: bool,
}

pub const LA_TIMES: Outlet = Outlet {
    source: "LA Times",
    path: "/sports/dodgers",
    item: "div.promo-content",
    headline: "h1.promo-title a, h2.promo-title a",
    link: "h1.promo-title a, h2.promo-title a",
    relative_links: false,
};

pub const DODGERS_NATION: Outlet = Outlet {
    source: "Dodgers Nation",
    path: "/news/team/",
    item: "li.post-item",
    headline: "h2.post-title a",
    link: "h2.post-title a",
    relative_links: false,
};

pub const MLB_COM: Outlet = Outlet {
    source: "MLB.com",
    path: "/dodgers/news",
    item: "li.article-navigation__item",
    headline: "span.article-navigation__item__meta-headline",
    link: "a",
    relative_links: true,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub source: &'static str,
    pub title: String,
    pub url: String,
}

/// The outlet's top story, or `None` when the page has no usable one.
pub fn top_story(html: &str, outlet: &Outlet, base: &str) -> Result<Option<Story>> {
    let document = Html::parse_document(html);
    let Some(item) = document.select(&selector(outlet.item)?).next() else {
        return Ok(None);
    };

    let title = item
        .select(&selector(outlet.headline)?)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty());
    let href = item
        .select(&selector(outlet.link)?)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty());

    Ok(match (title, href) {
        (Some(title), Some(href)) => Some(Story {
            source: outlet.source,
            title,
            url: if outlet.relative_links {
                format!("{}{}", base.trim_end_matches('/'), href)
            } else {
                href.to_string()
            },
        }),
        _ => None,
    })
}

pub fn compose_news(stories: &[Story]) -> String {
    let mut lines = vec!["Dodgers news update:".to_string()];
    lines.extend(
        stories
            .iter()
            .map(|s| format!("- {}: {} {}", s.source, s.title, s.url)),
    );
    lines.join("\n\n")
}

async fn fetch_story(ctx: &RunContext<'_>, outlet: &Outlet, base: &str) -> Option<Story> {
    let url = format!("{}{}", base, outlet.path);
    let html = match ctx.fetcher.get_text(&url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(source = outlet.source, url = %url, error = %e, "news fetch failed");
            return None;
        }
    };
    match top_story(&html, outlet, base) {
        Ok(Some(story)) => Some(story),
        Ok(None) => {
            warn!(source = outlet.source, "no top story found");
            None
        }
        Err(e) => {
            warn!(source = outlet.source, error = %e, "news page unreadable");
            None
        }
    }
}

pub(super) async fn post_news<P: Poster>(ctx: &RunContext<'_>, poster: &P) -> Result<PostReport> {
    let mut stories = Vec::new();
    let endpoints = &ctx.config.endpoints;
    let outlets = [
        (LA_TIMES, &endpoints.latimes),
        (DODGERS_NATION, &endpoints.dodgers_nation),
        (MLB_COM, &endpoints.mlb_web),
    ];
    for (outlet, base) in outlets {
        if let Some(story) = fetch_story(ctx, &outlet, base).await {
            stories.push(story);
        }
    }
    if stories.is_empty() {
        return Ok(PostReport::skipped(PostKind::News, "no stories found"));
    }

    let text = compose_news(&stories);
    poster.post(&text).await?;
    let posted = usize::from(poster.is_live());
    info!(stories = stories.len(), posted, "news roundup done");
    Ok(PostReport {
        kind: PostKind::News,
        composed: vec![text],
        posted,
        skipped: None,
    })
}
