// Scraper for Vanguard ETF holdings tables
//
// The holdings table on the fund profile page is rendered client-side and
// paged through a <select>, so a plain HTTP fetch sees nothing. Uses
// headless Chrome to render the page, walks every pagination option and
// extracts the raw cell rows for the normalizer.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::holdings::normalize::normalize_rows;
use crate::holdings::{FundHoldings, HoldingsOrigin};
use crate::scraping::HoldingsProvider;

const PROFILE_URL_BASE: &str = "https://investor.vanguard.com/investment-products/etfs/profile";

const HOLDINGS_TABLE_SELECTOR: &str = "holding-details-container table";
const HOLDINGS_ROW_SELECTOR: &str = "holding-details-container table tbody tr";
const FALLBACK_ROW_SELECTOR: &str = "table tbody tr";
const PAGINATION_OPTION_SELECTOR: &str = "holding-details-pagination select option";
const PAGINATION_SELECT_SELECTOR: &str = "holding-details-pagination select";

/// Knobs for one source instance. Defaults match the documented retry
/// policy: 3 attempts, 1s backoff base doubling per attempt.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub table_timeout: Duration,
    pub page_settle: Duration,
    pub headless: bool,
    pub max_dropped_fraction: f64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            table_timeout: Duration::from_secs(20),
            page_settle: Duration::from_secs(2),
            headless: true,
            max_dropped_fraction: 0.2,
        }
    }
}

/// Holdings source backed by the Vanguard fund profile pages.
pub struct VanguardSource {
    settings: FetchSettings,
}

impl VanguardSource {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }
}

/// Failure of a single scrape attempt.
#[derive(Debug)]
enum AttemptError {
    /// The provider explicitly has no such fund; retrying cannot help.
    NotFound,
    /// Anything that might succeed on a retry: launch/navigation errors,
    /// timeouts, a table that never appeared.
    Transient(anyhow::Error),
}

/// Retry progress, driven by [`next_state`].
#[derive(Debug)]
enum FetchState {
    Attempting(u32),
    Succeeded(Vec<Vec<String>>),
    Failed(FetchError),
}

/// Pure transition function: the retry bound lives here so it can be
/// exercised without a browser.
fn next_state(
    fund_id: &str,
    attempt: u32,
    outcome: Result<Vec<Vec<String>>, AttemptError>,
    max_attempts: u32,
) -> FetchState {
    match outcome {
        Ok(rows) => FetchState::Succeeded(rows),
        Err(AttemptError::NotFound) => FetchState::Failed(FetchError::NotFound {
            fund_id: fund_id.to_string(),
        }),
        Err(AttemptError::Transient(cause)) if attempt >= max_attempts => {
            FetchState::Failed(FetchError::Exhausted {
                fund_id: fund_id.to_string(),
                attempts: attempt,
                last_cause: cause,
            })
        }
        Err(AttemptError::Transient(cause)) => {
            warn!(
                "{}: attempt {}/{} failed ({:#}), retrying",
                fund_id, attempt, max_attempts, cause
            );
            FetchState::Attempting(attempt + 1)
        }
    }
}

/// Exponential backoff before retry `n` (1-based): base, base*2, base*4...
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base * 2u32.saturating_pow(retry.saturating_sub(1))
}

fn build_profile_url(fund_id: &str) -> String {
    format!(
        "{}/{}#portfolio-composition",
        PROFILE_URL_BASE,
        fund_id.trim().to_ascii_lowercase()
    )
}

/// Detect the provider's explicit "unknown fund" page.
fn is_not_found_page(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    lower.contains("we can't find the page")
        || lower.contains("we can\u{2019}t find the page")
        || lower.contains("no results found")
        || lower.contains("0 results for")
}

/// Number of pages offered by the pagination select; 1 when absent.
fn count_holdings_pages(html: &str) -> Result<usize> {
    let document = Html::parse_document(html);
    let option_sel = Selector::parse(PAGINATION_OPTION_SELECTOR)
        .map_err(|_| anyhow!("invalid pagination selector"))?;
    Ok(document.select(&option_sel).count().max(1))
}

/// Extract the raw cell text of every holdings row on the current page.
fn extract_holdings_rows(html: &str) -> Result<Vec<Vec<String>>> {
    let document = Html::parse_document(html);
    let row_sel =
        Selector::parse(HOLDINGS_ROW_SELECTOR).map_err(|_| anyhow!("invalid row selector"))?;
    let fallback_sel =
        Selector::parse(FALLBACK_ROW_SELECTOR).map_err(|_| anyhow!("invalid row selector"))?;
    let cell_sel = Selector::parse("th, td").map_err(|_| anyhow!("invalid cell selector"))?;

    let mut tagged_rows: Vec<_> = document.select(&row_sel).collect();
    if tagged_rows.is_empty() {
        tagged_rows = document.select(&fallback_sel).collect();
    }

    let mut rows = Vec::with_capacity(tagged_rows.len());
    for row in tagged_rows {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|cell| {
                let text = cell.text().collect::<Vec<_>>().join(" ");
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            })
            .collect();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    Ok(rows)
}

/// JS snippet flipping the pagination select to `index` and notifying the
/// page's framework via a bubbling change event.
fn select_page_script(index: usize) -> String {
    format!(
        "(() => {{ const select = document.querySelector('{}'); if (!select) return false; \
         select.selectedIndex = {}; \
         select.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        PAGINATION_SELECT_SELECTOR, index
    )
}

fn launch_browser(settings: &FetchSettings) -> Result<Browser> {
    let options = LaunchOptions {
        headless: settings.headless,
        sandbox: false, // May be needed on some systems
        args: vec![
            std::ffi::OsStr::new("--disable-blink-features=AutomationControlled"),
            std::ffi::OsStr::new("--user-agent=Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
            std::ffi::OsStr::new("--disable-dev-shm-usage"),
            std::ffi::OsStr::new("--window-size=1920,1080"),
        ],
        ..Default::default()
    };

    Browser::new(options).context("Failed to launch headless Chrome. Is Chrome/Chromium installed?")
}

fn flip_to_page(tab: &Tab, page: usize, settle: Duration) -> Result<()> {
    let result = tab
        .evaluate(&select_page_script(page), false)
        .with_context(|| format!("Failed to select holdings page {}", page + 1))?;
    let flipped = result
        .value
        .as_ref()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !flipped {
        anyhow::bail!("pagination select disappeared at page {}", page + 1);
    }
    std::thread::sleep(settle);
    Ok(())
}

/// One blocking scrape attempt: render the profile page, wait for the
/// holdings table, walk every pagination page and collect raw rows.
fn scrape_holdings_pages(
    fund_id: &str,
    settings: &FetchSettings,
) -> Result<Vec<Vec<String>>, AttemptError> {
    let url = build_profile_url(fund_id);
    info!("{}: loading {}", fund_id, url);

    let browser = launch_browser(settings).map_err(AttemptError::Transient)?;
    let tab = browser
        .new_tab()
        .context("Failed to create browser tab")
        .map_err(AttemptError::Transient)?;

    tab.navigate_to(&url)
        .with_context(|| format!("Failed to navigate to {}", url))
        .map_err(AttemptError::Transient)?;
    tab.wait_for_element_with_custom_timeout("body", Duration::from_secs(10))
        .context("Timed out waiting for page to load")
        .map_err(AttemptError::Transient)?;

    let table_present = tab
        .wait_for_element_with_custom_timeout(HOLDINGS_TABLE_SELECTOR, settings.table_timeout)
        .is_ok();

    let html = tab
        .get_content()
        .context("Failed to read page content")
        .map_err(AttemptError::Transient)?;

    if is_not_found_page(&html) {
        return Err(AttemptError::NotFound);
    }
    if !table_present {
        return Err(AttemptError::Transient(anyhow!(
            "holdings table did not appear within {:?}",
            settings.table_timeout
        )));
    }

    let total_pages = count_holdings_pages(&html).map_err(AttemptError::Transient)?;
    let mut all_rows = extract_holdings_rows(&html).map_err(AttemptError::Transient)?;

    for page in 1..total_pages {
        info!(
            "{}: processing holdings page {}/{}",
            fund_id,
            page + 1,
            total_pages
        );
        flip_to_page(&tab, page, settings.page_settle).map_err(AttemptError::Transient)?;
        let page_html = tab
            .get_content()
            .context("Failed to read page content")
            .map_err(AttemptError::Transient)?;
        all_rows.extend(extract_holdings_rows(&page_html).map_err(AttemptError::Transient)?);
    }

    if all_rows.is_empty() {
        return Err(AttemptError::Transient(anyhow!(
            "holdings table present but no rows extracted"
        )));
    }

    Ok(all_rows)
}

#[async_trait]
impl HoldingsProvider for VanguardSource {
    async fn fetch(&self, fund_id: &str) -> Result<FundHoldings, FetchError> {
        let fund_id = fund_id.trim();
        if fund_id.is_empty() {
            return Err(FetchError::NotFound {
                fund_id: String::new(),
            });
        }

        let mut state = FetchState::Attempting(1);
        loop {
            state = match state {
                FetchState::Attempting(attempt) => {
                    if attempt > 1 {
                        tokio::time::sleep(backoff_delay(self.settings.backoff_base, attempt - 1))
                            .await;
                    }
                    let settings = self.settings.clone();
                    let fund = fund_id.to_string();
                    let outcome = match tokio::task::spawn_blocking(move || {
                        scrape_holdings_pages(&fund, &settings)
                    })
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(join_err) => Err(AttemptError::Transient(anyhow!(
                            "scrape task failed: {}",
                            join_err
                        ))),
                    };
                    next_state(fund_id, attempt, outcome, self.settings.max_attempts)
                }
                FetchState::Succeeded(raw) => {
                    let normalized =
                        normalize_rows(fund_id, &raw, self.settings.max_dropped_fraction).map_err(
                            |source| FetchError::Malformed {
                                fund_id: fund_id.to_string(),
                                source,
                            },
                        )?;
                    info!(
                        "{}: extracted {} holdings rows (weights sum {:.2}%)",
                        fund_id,
                        normalized.rows.len(),
                        normalized.weight_sum
                    );
                    return Ok(FundHoldings {
                        fund_id: fund_id.to_ascii_uppercase(),
                        rows: normalized.rows,
                        fetched_at: Utc::now(),
                        weight_sum: normalized.weight_sum,
                        origin: HoldingsOrigin::Live,
                    });
                }
                FetchState::Failed(err) => return Err(err),
            };
        }
    }

    fn name(&self) -> &str {
        "vanguard"
    }
}
