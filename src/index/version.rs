//! Version ordering for package file links
//!
//! A simple-index page lists every release of a package. The version is
//! pulled out of each file name (`torch-2.1.0-cp311-….whl`) and compared
//! with PEP 440 rules, so `dev < a < b < rc < final < post`. Local labels
//! (`+cu118`) are not part of the captured version.

use pep440_rs::Version;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// `X.Y.Z` plus any suffix, ending at the next name separator or file extension
fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"[-_](\d+\.\d+\.\d+[0-9A-Za-z.]*?)(?:\+[^-_/#]*)?(?:[-_/#]|\.tar\.gz|\.zip|\.whl|$)").ok()
        })
        .as_ref()
}

/// The version in a package file link, `None` if there is none or it is not PEP 440
pub fn version_of(link: &str) -> Option<Version> {
    let captured = version_pattern()?.captures(link)?.get(1)?.as_str();
    Version::from_str(captured).ok()
}

/// Order links newest version first; links without a version go last,
/// and links with equal versions keep their page order.
pub fn sort_newest_first(links: &mut [String]) {
    links.sort_by_cached_key(|link| std::cmp::Reverse(version_of(link)));
}
