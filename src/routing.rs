//! Route resolution
//!
//! A fixed table of string-matched paths selects which top-level view the
//! presentation layer renders. Exact matches for the listing pages,
//! prefix matches for detail pages whose trailing segment is the entity
//! slug, extracted by plain string splitting. No parameterized matching,
//! no nesting. Unknown paths resolve to the not-found view; the landing
//! page owns `/` alone.
//!
//! Hash fragments name an element on the landing page; the client scrolls
//! to it after a fixed delay so the target view has mounted first.

/// Delay before scrolling to a hash-fragment target, in milliseconds.
pub const SCROLL_MOUNT_DELAY_MS: u64 = 100;

/// Top-level views of the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Admin,
    Partner,
    Hackathons,
    HackathonDetail(String),
    Workshops,
    WorkshopDetail(String),
    Events,
    OtherEventDetail(String),
    NotFound,
}

impl Route {
    /// View name used in responses to the presentation layer.
    pub fn view_name(&self) -> &'static str {
        match self {
            Route::Landing => "landing",
            Route::Admin => "admin",
            Route::Partner => "partner",
            Route::Hackathons => "hackathons",
            Route::HackathonDetail(_) => "hackathon_detail",
            Route::Workshops => "workshops",
            Route::WorkshopDetail(_) => "workshop_detail",
            Route::Events => "events",
            Route::OtherEventDetail(_) => "other_event_detail",
            Route::NotFound => "not_found",
        }
    }
}

/// Resolve a browser path to its view.
pub fn resolve(path: &str) -> Route {
    // Query string and hash fragment never participate in matching.
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    match path {
        "" | "/" => Route::Landing,
        "/admin" => Route::Admin,
        "/partner" => Route::Partner,
        "/hackathons" => Route::Hackathons,
        "/workshops" => Route::Workshops,
        "/events" => Route::Events,
        _ => {
            if let Some(slug) = single_segment_after(path, "/hackathons/") {
                return Route::HackathonDetail(slug.to_string());
            }
            if let Some(slug) = single_segment_after(path, "/workshops/") {
                return Route::WorkshopDetail(slug.to_string());
            }
            if let Some(slug) = single_segment_after(path, "/other-events/") {
                return Route::OtherEventDetail(slug.to_string());
            }
            Route::NotFound
        }
    }
}

/// The trailing segment after `prefix`, if it is exactly one non-empty
/// path segment.
fn single_segment_after<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest)
}

/// Element id named by the path's hash fragment, if any.
pub fn scroll_target(path: &str) -> Option<&str> {
    let (_, fragment) = path.split_once('#')?;
    if fragment.is_empty() {
        None
    } else {
        Some(fragment)
    }
}
