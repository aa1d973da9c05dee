use std::{borrow::Cow, ffi::OsStr, sync::Arc, time::Duration};

use headless_chrome::{Browser, LaunchOptions, Tab, browser::tab::NoElementFound};
use serde_json::Value;
use tokio::{
    task::spawn_blocking,
    time::{Instant, sleep},
};

pub fn puppeteer(headless: bool) -> anyhow::Result<Browser> {
    Browser::new(LaunchOptions {
        args: vec![OsStr::new("--disable-blink-features=AutomationControlled")],
        headless,
        window_size: Some((1920, 1080)),
        ..LaunchOptions::default()
    })
}

#[allow(clippy::significant_drop_tightening)]
pub fn first_tab(browser: &Browser) -> anyhow::Result<Arc<Tab>> {
    let tab = browser.new_tab()?;

    {
        let tabs_guard = browser
            .get_tabs()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        for remain in &*tabs_guard {
            if !Arc::ptr_eq(&tab, remain) {
                remain.close(true)?;
            }
        }
    }

    Ok(tab)
}

pub async fn navigate_to(tab: &Arc<Tab>, url: Cow<'static, str>) -> anyhow::Result<()> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || tab.navigate_to(&url).map(|_| ())).await?
}

pub async fn find_async(tab: &Arc<Tab>, selector: Cow<'static, str>) -> anyhow::Result<()> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || tab.find_element(&selector).map(|_| ())).await?
}

/// Polls for `selector` until it shows up or `timeout` has passed.
pub async fn wait_for_async(
    tab: &Arc<Tab>,
    selector: Cow<'static, str>,
    timeout: Duration,
) -> anyhow::Result<()> {
    const PERIOD: Duration = Duration::from_millis(1832 / 4);

    let deadline = Instant::now() + timeout;
    loop {
        match find_async(tab, selector.clone()).await {
            Ok(()) => break Ok(()),
            Err(err) => {
                if !err.is::<NoElementFound>() {
                    break Err(err);
                }
                if Instant::now() >= deadline {
                    anyhow::bail!("`{selector}` did not appear within {timeout:?}");
                }
            }
        }

        sleep(PERIOD).await;
    }
}

pub async fn content(tab: &Arc<Tab>) -> anyhow::Result<String> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || tab.get_content()).await?
}

/// Whether `selector` matches an element that is currently rendered.
pub async fn is_displayed(tab: &Arc<Tab>, selector: &str) -> anyhow::Result<bool> {
    let expression = format!(
        "(() => {{ const e = document.querySelector({}); return !!e && e.offsetParent !== null; }})()",
        serde_json::to_string(selector)?,
    );
    let tab = Arc::clone(tab);

    let ret = spawn_blocking(move || tab.evaluate(&expression, false)).await??;

    match ret.value {
        Some(Value::Bool(b)) => Ok(b),
        Some(value) => anyhow::bail!("not a bool: {value}"),
        None => anyhow::bail!("returned nothing"),
    }
}
