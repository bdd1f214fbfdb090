pub mod cleaner;
pub mod error;
pub mod http_client;
pub mod parsers;
pub mod session;

use crate::config::ScraperConfig;
use crate::models::OperatorRecord;
use crate::utils::Timer;
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use self::error::ScrapeError;
use self::http_client::HttpClient;
use self::parsers::{Continuation, PagerLink, extract_records, find_continuation, parse_page};
use self::session::PaginationSession;

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Swappable source of the full operator listing.
#[async_trait]
pub trait OperatorSource: Send + Sync {
    async fn fetch_operators(&self) -> Result<Vec<OperatorRecord>, ScrapeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Plain GET of the listing, no form state.
    Initial,
    /// Form POST replaying a `__doPostBack` call.
    Postback(Vec<(String, String)>),
}

#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub body: String,
    /// Raw `Set-Cookie` header values.
    pub set_cookies: Vec<String>,
}

/// Transport for one page of the remote form.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        cookie: Option<&str>,
    ) -> Result<FetchedPage, ScrapeError>;
}

// ── Walker ────────────────────────────────────────────────────────────────────

/// Why a walk stopped. All variants are successful walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    LastPage,
    MalformedContinuation,
    SafetyBound,
}

#[derive(Debug)]
pub struct WalkReport {
    pub records: Vec<OperatorRecord>,
    pub pages: usize,
    pub termination: Termination,
}

enum WalkState {
    Fetching(usize, PageRequest),
    Extracting(usize, String),
    Continuing(usize, Vec<PagerLink>),
    Done(Termination),
}

/// Walks the postback-paginated operator listing page by page.
///
/// Pages are strictly sequential: each POST replays the tokens of the page
/// before it. Any fetch failure aborts the walk and drops what was collected.
pub struct PaginationWalker<F> {
    fetcher: F,
    max_pages: usize,
}

pub type TourOperatorScraper = PaginationWalker<HttpClient>;

impl TourOperatorScraper {
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        Ok(Self::new(HttpClient::new(config)?, config.max_pages))
    }
}

impl<F: PageFetcher> PaginationWalker<F> {
    pub fn new(fetcher: F, max_pages: usize) -> Self {
        Self {
            fetcher,
            max_pages: max_pages.max(1),
        }
    }

    /// Runs the walk to completion.
    ///
    /// There is no failed end state: a fetch or selector error returns
    /// straight out of the loop and the collected records are dropped.
    pub async fn walk(&self) -> Result<WalkReport, ScrapeError> {
        let _t = Timer::start("Operator listing walk");

        let mut session = PaginationSession::new();
        let mut rng = StdRng::from_os_rng();
        let mut records = Vec::new();
        let mut pages = 0usize;
        let mut state = WalkState::Fetching(1, PageRequest::Initial);

        let termination = loop {
            state = match state {
                WalkState::Fetching(page, request) => {
                    let cookie = session.cookie_header();
                    let fetched = self
                        .fetcher
                        .fetch_page(&request, cookie.as_deref())
                        .await
                        .inspect_err(|e| {
                            warn!("Page {} failed, discarding {} operators: {}", page, records.len(), e)
                        })?;

                    pages = page;
                    if session.absorb_cookies(fetched.set_cookies.iter().map(String::as_str)) {
                        debug!("Session cookies updated on page {}", page);
                    }
                    WalkState::Extracting(page, fetched.body)
                }

                WalkState::Extracting(page, body) => {
                    let parsed = parse_page(&body)?;
                    let page_records = extract_records(&parsed.rows, &mut rng);
                    info!("  Page {}: {} operators", page, page_records.len());
                    records.extend(page_records);

                    session.absorb_page(&parsed.hidden_fields);
                    if !session.has_view_state() {
                        debug!("Page {} carries no __VIEWSTATE", page);
                    }
                    WalkState::Continuing(page, parsed.pager_links)
                }

                WalkState::Continuing(page, links) => match find_continuation(&links, page + 1) {
                    Continuation::LastPage => WalkState::Done(Termination::LastPage),
                    Continuation::Malformed => {
                        warn!("Unreadable pager link to page {}, stopping", page + 1);
                        WalkState::Done(Termination::MalformedContinuation)
                    }
                    Continuation::Next(_) if page >= self.max_pages => {
                        warn!("Reached page limit ({}), stopping", self.max_pages);
                        WalkState::Done(Termination::SafetyBound)
                    }
                    Continuation::Next(target) => {
                        debug!("Postback {} / {}", target.target, target.argument);
                        WalkState::Fetching(page + 1, PageRequest::Postback(session.postback_form(&target)))
                    }
                },

                WalkState::Done(termination) => break termination,
            };
        };

        info!(
            "Walk finished: {} operators over {} pages ({:?})",
            records.len(),
            pages,
            termination
        );

        Ok(WalkReport {
            records,
            pages,
            termination,
        })
    }
}

#[async_trait]
impl<F: PageFetcher> OperatorSource for PaginationWalker<F> {
    async fn fetch_operators(&self) -> Result<Vec<OperatorRecord>, ScrapeError> {
        Ok(self.walk().await?.records)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{listing_page, server_down};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves scripted pages in order and records every request it sees.
    struct ScriptedFetcher {
        pages: Mutex<VecDeque<Result<FetchedPage, ScrapeError>>>,
        fallback: Option<String>,
        seen: Mutex<Vec<(PageRequest, Option<String>)>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<Result<FetchedPage, ScrapeError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                fallback: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn endless(body: String) -> Self {
            Self {
                fallback: Some(body),
                ..Self::new(Vec::new())
            }
        }

        fn seen(&self) -> Vec<(PageRequest, Option<String>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(
            &self,
            request: &PageRequest,
            cookie: Option<&str>,
        ) -> Result<FetchedPage, ScrapeError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.clone(), cookie.map(str::to_string)));

            if let Some(next) = self.pages.lock().unwrap().pop_front() {
                return next;
            }
            match &self.fallback {
                Some(body) => Ok(page(body.clone())),
                None => panic!("unexpected request {request:?}"),
            }
        }
    }

    fn page(body: String) -> FetchedPage {
        FetchedPage {
            body,
            set_cookies: Vec::new(),
        }
    }

    fn form_value<'a>(request: &'a PageRequest, name: &str) -> Option<&'a str> {
        match request {
            PageRequest::Initial => None,
            PageRequest::Postback(form) => form
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
        }
    }

    #[tokio::test]
    async fn test_three_pages_concatenated_in_order() {
        let first = FetchedPage {
            body: listing_page(1, &["Reef Divers", "Sea Kayak Belize"], &[2, 3]),
            set_cookies: vec!["ASP.NET_SessionId=s1; path=/; HttpOnly".into()],
        };
        let fetcher = ScriptedFetcher::new(vec![
            Ok(first),
            Ok(page(listing_page(2, &["Xunantunich Maya Tours"], &[1, 3]))),
            Ok(page(listing_page(3, &["Placencia Fishing Charters"], &[1, 2]))),
        ]);

        let walker = PaginationWalker::new(fetcher, 15);
        let report = walker.walk().await.unwrap();

        assert_eq!(report.termination, Termination::LastPage);
        assert_eq!(report.pages, 3);
        let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Reef Divers",
                "Sea Kayak Belize",
                "Xunantunich Maya Tours",
                "Placencia Fishing Charters"
            ]
        );

        let seen = walker.fetcher.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (PageRequest::Initial, None));

        let (second, cookie) = &seen[1];
        assert_eq!(cookie.as_deref(), Some("ASP.NET_SessionId=s1"));
        assert_eq!(form_value(second, "__EVENTTARGET"), Some("ctl00$MainContent$gvOperators"));
        assert_eq!(form_value(second, "__EVENTARGUMENT"), Some("Page$2"));
        assert_eq!(form_value(second, "__VIEWSTATE"), Some("vs-1"));
        assert_eq!(form_value(second, "__VIEWSTATEGENERATOR"), Some("CA0B0334"));
        assert_eq!(form_value(second, "__EVENTVALIDATION"), Some("ev-1"));
        assert_eq!(form_value(second, "ctl00$hfSort"), Some("Name"));

        let (third, cookie) = &seen[2];
        assert_eq!(cookie.as_deref(), Some("ASP.NET_SessionId=s1"));
        assert_eq!(form_value(third, "__EVENTARGUMENT"), Some("Page$3"));
        assert_eq!(form_value(third, "__VIEWSTATE"), Some("vs-2"));
    }

    #[tokio::test]
    async fn test_cookie_set_on_postback_is_replayed_on_next_page() {
        let first = FetchedPage {
            body: listing_page(1, &["Reef Divers"], &[2, 3]),
            set_cookies: vec!["ASP.NET_SessionId=s1; path=/; HttpOnly".into()],
        };
        let second = FetchedPage {
            body: listing_page(2, &["Xunantunich Maya Tours"], &[1, 3]),
            set_cookies: vec![
                "ASP.NET_SessionId=s2; path=/; HttpOnly".into(),
                "lb=node-b; path=/".into(),
            ],
        };
        let fetcher = ScriptedFetcher::new(vec![
            Ok(first),
            Ok(second),
            Ok(page(listing_page(3, &["Placencia Fishing Charters"], &[1, 2]))),
        ]);

        let walker = PaginationWalker::new(fetcher, 15);
        let report = walker.walk().await.unwrap();
        assert_eq!(report.pages, 3);

        let seen = walker.fetcher.seen();
        assert_eq!(seen[1].1.as_deref(), Some("ASP.NET_SessionId=s1"));
        assert_eq!(seen[2].1.as_deref(), Some("ASP.NET_SessionId=s2; lb=node-b"));
    }

    #[tokio::test]
    async fn test_endless_pager_stops_after_fifteen_fetches() {
        let all_pages: Vec<usize> = (1..=100).collect();
        let fetcher = ScriptedFetcher::endless(listing_page(1, &["Cave Tubing Co"], &all_pages));

        let walker = PaginationWalker::new(fetcher, 15);
        let report = walker.walk().await.unwrap();

        assert_eq!(report.termination, Termination::SafetyBound);
        assert_eq!(report.pages, 15);
        assert_eq!(walker.fetcher.seen().len(), 15);
        assert_eq!(report.records.len(), 15);
    }

    #[tokio::test]
    async fn test_single_page_without_pager() {
        let fetcher = ScriptedFetcher::new(vec![Ok(page(listing_page(1, &["Solo Tours"], &[])))]);

        let report = PaginationWalker::new(fetcher, 15).walk().await.unwrap();

        assert_eq!(report.termination, Termination::LastPage);
        assert_eq!(report.pages, 1);
        assert_eq!(report.records.len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_postback_ends_walk_normally() {
        let body = listing_page(1, &["Reef Divers"], &[]).replace(
            "</table>\n</form>",
            "<tr><td><a href=\"javascript:__doPostBack(gv,Page$2)\">2</a></td></tr></table>\n</form>",
        );
        let fetcher = ScriptedFetcher::new(vec![Ok(page(body))]);

        let walker = PaginationWalker::new(fetcher, 15);
        let report = walker.walk().await.unwrap();

        assert_eq!(report.termination, Termination::MalformedContinuation);
        assert_eq!(report.records.len(), 1);
        assert_eq!(walker.fetcher.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_mid_walk_discards_partial_results() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(page(listing_page(1, &["Reef Divers"], &[2, 3]))),
            Ok(page(listing_page(2, &["Maya Walk"], &[1, 3]))),
            Err(server_down()),
        ]);

        let walker = PaginationWalker::new(fetcher, 15);
        let result = walker.walk().await;

        assert!(matches!(result, Err(ScrapeError::Status { status: 503, .. })));
        assert_eq!(walker.fetcher.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_operators_returns_records() {
        let fetcher = ScriptedFetcher::new(vec![Ok(page(listing_page(
            1,
            &["Hopkins Dive Shop"],
            &[],
        )))]);

        let operators = PaginationWalker::new(fetcher, 15)
            .fetch_operators()
            .await
            .unwrap();

        assert_eq!(operators.len(), 1);
        assert_eq!(operators[0].location, "San Pedro");
    }
}
