//! Per-walk postback state.
//!
//! The listing is an ASP.NET WebForms page: every POST must echo back the
//! `__VIEWSTATE` / `__VIEWSTATEGENERATOR` / `__EVENTVALIDATION` triple from the
//! page it was issued from, together with the session cookie. A session lives
//! for exactly one walk and is never shared.

use std::collections::BTreeMap;

use super::parsers::PostbackTarget;

pub const EVENT_TARGET: &str = "__EVENTTARGET";
pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
pub const VIEWSTATE: &str = "__VIEWSTATE";
pub const VIEWSTATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";

#[derive(Debug, Clone, Default)]
pub struct PaginationSession {
    cookies: BTreeMap<String, String>,
    view_state: Option<String>,
    view_state_generator: Option<String>,
    event_validation: Option<String>,
    hidden_fields: Vec<(String, String)>,
}

impl PaginationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge raw `Set-Cookie` header values into the jar. Attributes after the
    /// first `;` (path, expiry, flags) are ignored. Returns true if anything changed.
    pub fn absorb_cookies<'a>(&mut self, set_cookies: impl IntoIterator<Item = &'a str>) -> bool {
        let mut changed = false;
        for raw in set_cookies {
            let pair = raw.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else { continue };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim().to_string();
            if self.cookies.get(name) != Some(&value) {
                self.cookies.insert(name.to_string(), value);
                changed = true;
            }
        }
        changed
    }

    /// `Cookie` request header value, or None before the server has set any.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let header = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        Some(header)
    }

    /// Replace the continuation state with what the current page carries.
    pub fn absorb_page(&mut self, hidden_fields: &[(String, String)]) {
        let lookup = |name: &str| {
            hidden_fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        };

        self.view_state = lookup(VIEWSTATE);
        self.view_state_generator = lookup(VIEWSTATE_GENERATOR);
        self.event_validation = lookup(EVENT_VALIDATION);
        self.hidden_fields = hidden_fields.to_vec();
    }

    pub fn has_view_state(&self) -> bool {
        self.view_state.is_some()
    }

    /// Form body for a `__doPostBack(target, argument)` call.
    ///
    /// Event fields and the continuation triple come first; every other hidden
    /// input of the page follows once, in document order.
    pub fn postback_form(&self, postback: &PostbackTarget) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            (EVENT_TARGET.into(), postback.target.clone()),
            (EVENT_ARGUMENT.into(), postback.argument.clone()),
            (VIEWSTATE.into(), self.view_state.clone().unwrap_or_default()),
            (
                VIEWSTATE_GENERATOR.into(),
                self.view_state_generator.clone().unwrap_or_default(),
            ),
            (
                EVENT_VALIDATION.into(),
                self.event_validation.clone().unwrap_or_default(),
            ),
        ];

        for (name, value) in &self.hidden_fields {
            if form.iter().any(|(n, _)| n == name) {
                continue;
            }
            form.push((name.clone(), value.clone()));
        }

        form
    }
}
