//! Test doubles shared across module tests.

use crate::cache::Clock;
use crate::models::OperatorRecord;
use crate::scraper::cleaner::row_to_record;
use crate::scraper::error::ScrapeError;
use crate::scraper::OperatorSource;
use crate::models::RawOperatorRow;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// ASP.NET GridView-shaped listing page.
///
/// `pager_to` lists the page numbers the pager links to; pass an empty slice
/// for a last page without a pager.
pub fn listing_page(page: usize, names: &[&str], pager_to: &[usize]) -> String {
    let mut rows = String::from(
        "<tr><th>Company Name</th><th>Phone</th><th>Address</th><th>Email</th><th>Website</th></tr>\n",
    );
    for name in names {
        rows.push_str(&format!(
            "<tr><td>{name}</td><td>226-{page:04}</td>\
             <td>Barrier Reef Drive, San Pedro, Ambergris Caye</td>\
             <td>info@example.bz</td><td>www.example.bz</td></tr>\n"
        ));
    }

    if !pager_to.is_empty() {
        rows.push_str("<tr class=\"pager\"><td colspan=\"5\"><table><tr>");
        for p in pager_to {
            rows.push_str(&format!(
                "<td><a href=\"javascript:__doPostBack(&#39;ctl00$MainContent$gvOperators&#39;,&#39;Page${p}&#39;)\">{p}</a></td>"
            ));
        }
        rows.push_str("</tr></table></td></tr>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html><head><title>Licensed Tour Operators</title></head>
<body>
<form method="post" action="./Operators.aspx" id="form1">
<input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="" />
<input type="hidden" name="__EVENTARGUMENT" id="__EVENTARGUMENT" value="" />
<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="vs-{page}" />
<input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="CA0B0334" />
<input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="ev-{page}" />
<input type="hidden" name="ctl00$hfSort" value="Name" />
<input type="text" name="ctl00$txtSearch" value="" />
<table id="ctl00_MainContent_gvOperators">
{rows}</table>
</form>
</body></html>"#
    )
}

pub fn sample_operators(names: &[&str]) -> Vec<OperatorRecord> {
    let mut rng = StdRng::seed_from_u64(42);
    names
        .iter()
        .map(|name| {
            let row = RawOperatorRow {
                name: name.to_string(),
                address: Some("Placencia Village".into()),
                ..Default::default()
            };
            row_to_record(row, &mut rng)
        })
        .collect()
}

// ── Clock ─────────────────────────────────────────────────────────────────────

pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::from_std(by).unwrap();
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ── Operator source ───────────────────────────────────────────────────────────

/// Scripted source: pops one outcome per walk, counts walks, optionally
/// sleeps to keep a walk in flight.
pub struct StubSource {
    outcomes: Mutex<VecDeque<Result<Vec<OperatorRecord>, ScrapeError>>>,
    walks: AtomicUsize,
    delay: Duration,
}

impl StubSource {
    pub fn new(outcomes: Vec<Result<Vec<OperatorRecord>, ScrapeError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            walks: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn walks(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }
}

pub fn server_down() -> ScrapeError {
    ScrapeError::Status {
        status: 503,
        url: "https://operators.example.bz/".into(),
    }
}

#[async_trait]
impl OperatorSource for StubSource {
    async fn fetch_operators(&self) -> Result<Vec<OperatorRecord>, ScrapeError> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(server_down()))
    }
}
