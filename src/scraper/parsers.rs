use crate::models::{OperatorRecord, RawOperatorRow};
use crate::scraper::cleaner::row_to_record;
use crate::scraper::error::ScrapeError;
use rand::Rng;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Name | Phone | Address | Email are mandatory; Website is optional.
const MIN_CELLS: usize = 4;

static POSTBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"__doPostBack\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#)
        .expect("postback regex")
});

static PAGE_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Page\$(\d+)").expect("page argument regex"));

// ── Intermediate representation ───────────────────────────────────────────────

/// One listing page reduced to plain data; nothing here borrows the DOM.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Cell text of every table row outside the pager, in document order.
    pub rows: Vec<Vec<String>>,
    /// Every `<input type="hidden">` with a name, in document order.
    pub hidden_fields: Vec<(String, String)>,
    /// Anchors that fire a postback or address a grid page.
    pub pager_links: Vec<PagerLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerLink {
    pub text: String,
    pub href: String,
}

/// Arguments of a client-side `__doPostBack(target, argument)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostbackTarget {
    pub target: String,
    pub argument: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    Next(PostbackTarget),
    LastPage,
    /// A link to the next page exists but its postback call could not be read.
    Malformed,
}

// ── Markup → ParsedPage ───────────────────────────────────────────────────────

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        reason: format!("{e:?}"),
    })
}

fn collapsed_text(el: &ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_pager_href(href: &str) -> bool {
    href.contains("__doPostBack") || href.contains("Page$")
}

pub fn parse_page(html: &str) -> Result<ParsedPage, ScrapeError> {
    let doc = Html::parse_document(html);

    let tr_sel = selector("tr")?;
    let input_sel = selector("input")?;
    let a_sel = selector("a[href]")?;

    let mut page = ParsedPage::default();

    for tr in doc.select(&tr_sel) {
        // GridView pagers render as a row holding a nested table of page links.
        let is_pager_row = tr
            .select(&a_sel)
            .filter_map(|a| a.value().attr("href"))
            .any(|href| href.contains("Page$"));
        if is_pager_row {
            continue;
        }

        let cells: Vec<String> = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches!(el.value().name(), "td" | "th"))
            .map(|el| collapsed_text(&el))
            .collect();

        if !cells.is_empty() {
            page.rows.push(cells);
        }
    }

    for input in doc.select(&input_sel) {
        let el = input.value();
        let hidden = el
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
        let Some(name) = el.attr("name").filter(|n| !n.is_empty()) else { continue };
        if hidden {
            let value = el.attr("value").unwrap_or_default();
            page.hidden_fields.push((name.to_string(), value.to_string()));
        }
    }

    for a in doc.select(&a_sel) {
        let Some(href) = a.value().attr("href") else { continue };
        if is_pager_href(href) {
            page.pager_links.push(PagerLink {
                text: collapsed_text(&a),
                href: href.to_string(),
            });
        }
    }

    Ok(page)
}

// ── Rows → records ────────────────────────────────────────────────────────────

fn is_header_label(first_cell: &str) -> bool {
    first_cell == "Name" || first_cell.contains("Company Name")
}

/// Positional mapping of one table row, or None when the row is not an operator.
pub fn qualify_row(cells: &[String]) -> Option<RawOperatorRow> {
    if cells.len() < MIN_CELLS {
        return None;
    }

    let name = cells[0].trim();
    if name.is_empty() || is_header_label(name) {
        return None;
    }

    Some(RawOperatorRow {
        name: name.to_string(),
        phone: cells.get(1).cloned(),
        address: cells.get(2).cloned(),
        email: cells.get(3).cloned(),
        website: cells.get(4).cloned(),
    })
}

pub fn extract_records<R: Rng>(rows: &[Vec<String>], rng: &mut R) -> Vec<OperatorRecord> {
    rows.iter()
        .filter_map(|cells| qualify_row(cells))
        .map(|raw| row_to_record(raw, &mut *rng))
        .collect()
}

// ── Pager → continuation ──────────────────────────────────────────────────────

/// "javascript:__doPostBack('ctl00$MainContent$gvOperators','Page$2')"
/// → target "ctl00$MainContent$gvOperators", argument "Page$2"
pub fn parse_postback(href: &str) -> Option<PostbackTarget> {
    let caps = POSTBACK_RE.captures(href)?;
    Some(PostbackTarget {
        target: caps[1].to_string(),
        argument: caps[2].to_string(),
    })
}

fn links_to_page(link: &PagerLink, page: usize) -> bool {
    let by_argument = PAGE_ARG_RE
        .captures_iter(&link.href)
        .filter_map(|c| c[1].parse::<usize>().ok())
        .any(|n| n == page);
    by_argument || link.text == page.to_string()
}

pub fn find_continuation(links: &[PagerLink], next_page: usize) -> Continuation {
    let Some(link) = links.iter().find(|l| links_to_page(l, next_page)) else {
        return Continuation::LastPage;
    };

    match parse_postback(&link.href) {
        Some(target) => Continuation::Next(target),
        None => Continuation::Malformed,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
