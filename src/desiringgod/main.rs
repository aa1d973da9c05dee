mod scrape;

use core::time::Duration;
use std::path::PathBuf;

mod constants {
    macro_rules! env_or_default {
        ($name:expr, $default:expr) => {
            if let Some(s) = option_env!($name) {
                s
            } else {
                $default
            }
        };
    }

    pub const SITE_ROOT: &str = env_or_default!("SITE_ROOT", "https://www.desiringgod.org");
    /// Ask Pastor John's recent list is only walked from this page on.
    pub const APJ_START_PAGE: u32 = 215;
}

#[derive(clap::Parser)]
struct Args {
    #[command(subcommand)]
    source: Source,
    /// CSV file to merge into; defaults to one file per source
    #[arg(short, long, global = true, env = "PSCR_OUTPUT")]
    output: Option<PathBuf>,
    /// Pages of the recent list to walk after the landing page
    #[arg(long, global = true, default_value_t = 216)]
    max_pages: u32,
    /// First page of the recent list
    #[arg(long, global = true)]
    start_page: Option<u32>,
    #[arg(long, global = true, default_value_t = 2000)]
    delay_ms: u64,
    /// Seconds to wait for episode tiles to render
    #[arg(long, global = true, default_value_t = 10)]
    wait_secs: u64,
    #[arg(long, global = true)]
    show_browser: bool,
}

#[derive(clap::Subcommand)]
enum Source {
    /// desiringgod.org/ask-pastor-john, numbered episodes
    AskPastorJohn,
    /// desiringgod.org/podcasts/<slug>, season/episode numbering
    Podcast { slug: String },
}

impl Source {
    fn base_url(&self) -> String {
        use constants::SITE_ROOT;

        match self {
            Self::AskPastorJohn => format!("{SITE_ROOT}/ask-pastor-john"),
            Self::Podcast { slug } => format!("{SITE_ROOT}/podcasts/{slug}"),
        }
    }

    fn default_output(&self) -> PathBuf {
        match self {
            Self::AskPastorJohn => PathBuf::from("ask_pastor_john.csv"),
            Self::Podcast { slug } => PathBuf::from(format!("{}.csv", slug.replace('-', "_"))),
        }
    }

    const fn start_page(&self) -> u32 {
        match self {
            Self::AskPastorJohn => constants::APJ_START_PAGE,
            Self::Podcast { .. } => 1,
        }
    }
}

/// Pages of the recent list to visit, each flagged when nothing follows it.
fn page_plan(start: u32, max_pages: u32) -> impl Iterator<Item = (u32, bool)> {
    (start..)
        .take(max_pages as usize)
        .enumerate()
        .map(move |(i, page)| (page, i + 1 == max_pages as usize))
}

async fn collect(args: &Args, ctx: &scrape::Context) -> Vec<pscr::episode::Record> {
    let base_url = args.source.base_url();
    let mut res = Vec::new();

    tracing::info!(target: "main", "fetching latest episodes from {base_url}");
    let mut block = scrape::work(base_url.clone(), ctx).await;
    res.append(&mut block);
    tracing::info!(target: "main", "total episodes collected so far: {}", res.len());

    let start = args.start_page.unwrap_or_else(|| args.source.start_page());
    for (page, last) in page_plan(start, args.max_pages) {
        let mut block = scrape::work(format!("{base_url}/recent.html?page={page}"), ctx).await;
        if block.is_empty() {
            tracing::info!(target: "main", "no more episodes found on page {page}, stopping");
            break;
        }
        res.append(&mut block);
        tracing::info!(target: "main", "total episodes collected so far: {}", res.len());

        if last || scrape::has_more(ctx).await.is_break() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }

    res
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.source.default_output());

    let browser = pscr::scrape::puppeteer(!args.show_browser)?;
    let tab = pscr::scrape::first_tab(&browser)?;

    let user_agent = pscr::scrape::random_user_agent();
    tracing::info!("choosing user-agent \x1b[1;36m{user_agent}\x1b[0m ...");
    tab.set_user_agent(user_agent, None, None)?;

    let ctx = scrape::Context {
        tab,
        sel: scrape::Selectors::default(),
        site_root: constants::SITE_ROOT,
        wait: Duration::from_secs(args.wait_secs),
    };

    let episodes = collect(&args, &ctx).await;
    drop(ctx);
    drop(browser);

    if episodes.is_empty() {
        tracing::error!(target: "main", "\x1b[31mno episodes were retrieved, check the logs for errors\x1b[0m");
        anyhow::bail!("nothing scraped, {} left untouched", output.display());
    }

    pscr::store::update(&output, episodes)?;
    Ok(())
}
