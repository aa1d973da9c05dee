use core::{ops::ControlFlow, time::Duration};
use std::sync::Arc;

use compact_str::CompactString;
use headless_chrome::Tab;
use pscr::{
    episode::{NO_DESCRIPTION, Record, UNKNOWN},
    scrape::{content, is_displayed, navigate_to, wait_for_async},
    util::inner_text,
};
use scraper::{Html, Selector};

/// Rendered once the episode list is on the page.
pub const TILE: &str = "div.tile";

pub struct Selectors {
    pub tile: Selector,
    pub number: Selector,
    pub title: Selector,
    pub time: Selector,
    pub topic: Selector,
    pub description: Selector,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            tile: Selector::parse(TILE).unwrap(),
            number: Selector::parse("span.number").unwrap(),
            title: Selector::parse("h2.tile-title a").unwrap(),
            time: Selector::parse("time.time").unwrap(),
            topic: Selector::parse(r#"a[data-grouping-type="Topic"]"#).unwrap(),
            description: Selector::parse("div.tile-description").unwrap(),
        }
    }
}

impl Selectors {
    pub fn parse_tiles(&self, html: &str, site_root: &str) -> Vec<Record> {
        let document = Html::parse_document(html);
        let tiles = document.select(&self.tile).collect::<Vec<_>>();
        tracing::info!(target: "worker", "found {} episode tiles", tiles.len());

        tiles
            .into_iter()
            .filter_map(|tile| {
                let episode_number: CompactString = tile
                    .select(&self.number)
                    .next()
                    .map_or_else(|| UNKNOWN.into(), |e| inner_text(e).into());

                let Some(link) = tile.select(&self.title).next() else {
                    tracing::error!(target: "worker", "tile {episode_number} has no title link");
                    return None;
                };
                let Some(href) = link.attr("href") else {
                    tracing::error!(target: "worker", "tile {episode_number} has no href");
                    return None;
                };
                let url = if href.starts_with("http") {
                    href.to_owned()
                } else {
                    format!("{site_root}{href}")
                };

                let date = tile
                    .select(&self.time)
                    .next()
                    .and_then(|e| e.attr("datetime"))
                    .unwrap_or(UNKNOWN)
                    .to_owned();
                let topic = tile
                    .select(&self.topic)
                    .next()
                    .map_or_else(|| UNKNOWN.to_owned(), inner_text);
                let description = tile
                    .select(&self.description)
                    .next()
                    .map_or_else(|| NO_DESCRIPTION.to_owned(), inner_text);

                Some(Record {
                    episode_number,
                    title: inner_text(link),
                    url,
                    date,
                    topic,
                    description,
                })
            })
            .collect()
    }
}

pub struct Context {
    pub tab: Arc<Tab>,
    pub sel: Selectors,
    pub site_root: &'static str,
    pub wait: Duration,
}

pub async fn work(url: String, ctx: &Context) -> Vec<Record> {
    tracing::info!(target: "worker", "fetching content from {url}");

    if let Err(e) = navigate_to(&ctx.tab, url.into()).await {
        tracing::warn!(target: "worker", "\x1b[31merr: {e:?}\x1b[0m");
        return Vec::new();
    }

    if let Err(e) = wait_for_async(&ctx.tab, TILE.into(), ctx.wait).await {
        tracing::error!(target: "worker", "\x1b[31mtimeout waiting for page to load: {e}\x1b[0m");
        return Vec::new();
    }

    let html = match content(&ctx.tab).await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(target: "worker", "\x1b[31merr: {e:?}\x1b[0m");
            return Vec::new();
        }
    };

    ctx.sel.parse_tiles(&html, ctx.site_root)
}

/// Stops the page loop once the "load more" button is gone.
pub async fn has_more(ctx: &Context) -> ControlFlow<()> {
    match is_displayed(&ctx.tab, ".load-more").await {
        Ok(true) => ControlFlow::Continue(()),
        Ok(false) => {
            tracing::info!(target: "worker", "no more episodes to load");
            ControlFlow::Break(())
        }
        Err(e) => {
            tracing::warn!(target: "worker", "cannot inspect 'load more' button: {e}");
            ControlFlow::Break(())
        }
    }
}
