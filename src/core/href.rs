//! Href canonicalization against a synthetic origin.
//!
//! The crawler never knows the deployed origin; it resolves every
//! href against a fixed fallback origin whose only job is to be equal
//! to itself. Relative hrefs therefore always resolve as internal,
//! and only absolute hrefs to a different origin classify external.

use std::sync::LazyLock;

use url::Url;

use super::PagePath;

/// Synthetic origin used when no base URL is supplied.
///
/// `.invalid` is reserved (RFC 2606), so this can never collide with
/// a real deployed origin.
pub const FALLBACK_ORIGIN: &str = "https://fallback-origin.invalid";

static FALLBACK_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse(FALLBACK_ORIGIN).expect("fallback origin is a valid URL"));

/// A canonicalized href.
#[derive(Debug, Clone)]
pub struct CanonicalHref {
    /// Resolved pathname, query string and fragment stripped.
    pub path: PagePath,
    /// True iff the resolved origin equals the base origin.
    pub is_internal: bool,
    /// The fully resolved URL. Useful as the base for resolving links
    /// relative to this one without re-parsing.
    pub url: Url,
}

/// Resolve `href` against `base` (the fallback origin when `None`)
/// and classify it as internal or external.
///
/// Resolution never fails for relative hrefs because the base always
/// supplies a valid origin. An absolute href that cannot be parsed at
/// all is classified external rather than treated as an error.
pub fn canonicalize_href(href: &str, base: Option<&Url>) -> CanonicalHref {
    let base = base.unwrap_or(&FALLBACK_BASE);

    match base.join(href) {
        Ok(url) => {
            let is_internal = url.origin() == base.origin();
            CanonicalHref {
                path: PagePath::from_normalized(url.path()),
                is_internal,
                url,
            }
        }
        // Unparseable even against a valid base (e.g. `https://@`).
        // Classified external; the path is never consulted for
        // external hrefs.
        Err(_) => CanonicalHref {
            path: PagePath::from_normalized("/"),
            is_internal: false,
            url: base.clone(),
        },
    }
}
