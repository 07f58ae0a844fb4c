//! Package-link discovery on simple-index pages
//!
//! Given a mirror and a package name, fetch `{mirror}/{package}/`, scrape the
//! file links out of the HTML and choose the one to download:
//!
//! 1. wheels built for this interpreter and platform,
//! 2. otherwise any wheel,
//! 3. newest version first,
//! 4. otherwise the first sdist/zip/wheel link on the page.

pub mod version;

pub use version::{sort_newest_first, version_of};

use crate::{
    client::{platform, HttpClient},
    error::{AppError, Result},
    types::Mirror,
};
use regex::Regex;
use std::time::Duration;

/// Extracts candidate package files from an index page
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    /// Wheels for this interpreter and platform; `None` when the interpreter is unknown
    matching_wheel: Option<Regex>,
    any_wheel: Regex,
    any_archive: Regex,
}

impl LinkExtractor {
    /// Build an extractor for an interpreter version and a platform tag pattern
    /// (a regex fragment, see [`platform::platform_pattern_for`])
    pub fn new(python_version: Option<(u32, u32)>, platform_pattern: &str) -> Result<Self> {
        let matching_wheel = match python_version {
            Some(version) => Some(Regex::new(&format!(
                r#"href=['"]?([^'" >]+{}[^'" >]*(?:{})[^'" >]*\.whl)"#,
                regex::escape(&platform::interpreter_tag(version)),
                platform_pattern,
            ))?),
            None => None,
        };

        Ok(Self {
            matching_wheel,
            any_wheel: Regex::new(r#"href=['"]?([^'" >]+\.whl)"#)?,
            any_archive: Regex::new(r#"href=['"]?([^'" >]+\.(?:tar\.gz|zip|whl))"#)?,
        })
    }

    /// Extractor for the running platform
    pub fn for_host(python_version: Option<(u32, u32)>) -> Result<Self> {
        Self::new(python_version, platform::wheel_platform_pattern())
    }

    /// Candidate links, best first. Empty when the page has no package files.
    pub fn extract(&self, html: &str) -> Vec<String> {
        let mut wheels = self
            .matching_wheel
            .as_ref()
            .map(|re| Self::captures(re, html))
            .unwrap_or_default();

        if wheels.is_empty() {
            wheels = Self::captures(&self.any_wheel, html);
        }

        if !wheels.is_empty() {
            sort_newest_first(&mut wheels);
            return wheels;
        }

        Self::captures(&self.any_archive, html)
            .into_iter()
            .take(1)
            .collect()
    }

    fn captures(re: &Regex, html: &str) -> Vec<String> {
        re.captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Turn an href from a package page into an absolute URL.
///
/// Absolute links are kept, `/`-rooted links use the page's scheme and host,
/// anything else is relative to the page itself.
pub fn resolve_link(page_url: &str, href: &str) -> Result<String> {
    let base = url::Url::parse(page_url)?;
    let resolved = base
        .join(href)
        .map_err(|e| AppError::parse(format!("Cannot resolve link '{}' against {}: {}", href, page_url, e)))?;
    Ok(resolved.to_string())
}

/// Finds a downloadable file of a package on a mirror
pub struct PackageLocator {
    extractor: LinkExtractor,
    page_timeout: Duration,
}

impl PackageLocator {
    pub fn new(extractor: LinkExtractor, page_timeout: Duration) -> Self {
        Self { extractor, page_timeout }
    }

    /// Fetch the package page on `mirror` and return the absolute URL of the file to download
    pub async fn locate(&self, client: &dyn HttpClient, mirror: &Mirror, package: &str) -> Result<String> {
        let page_url = mirror.package_page_url(package);
        let page = client.get_text(&page_url, self.page_timeout).await?;

        if page.status != 200 {
            return Err(AppError::http_request(format!(
                "package page {} returned HTTP {}", page_url, page.status
            )));
        }

        let href = self
            .extractor
            .extract(&page.body)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::validation(format!("no suitable package file for '{}' on {}", package, page_url)))?;

        // Relative links are relative to where the page was actually served from
        resolve_link(&page.final_url, &href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientSettings, MirrorClient};
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<a href="../../packages/aa/torch-1.13.1-cp311-cp311-manylinux1_x86_64.whl#sha256=11">torch-1.13.1-cp311-cp311-manylinux1_x86_64.whl</a><br/>
<a href="../../packages/bb/torch-2.1.0-cp311-cp311-manylinux1_x86_64.whl#sha256=22">torch-2.1.0-cp311-cp311-manylinux1_x86_64.whl</a><br/>
<a href="../../packages/cc/torch-2.1.0-cp311-none-macosx_10_15_x86_64.whl#sha256=33">torch-2.1.0-cp311-none-macosx_10_15_x86_64.whl</a><br/>
<a href="../../packages/dd/torch-2.2.0-cp312-cp312-win_amd64.whl#sha256=44">torch-2.2.0-cp312-cp312-win_amd64.whl</a><br/>
</body></html>"#;

    fn linux_extractor(python: Option<(u32, u32)>) -> LinkExtractor {
        LinkExtractor::new(python, platform::platform_pattern_for("linux", "x86_64")).unwrap()
    }

    #[test]
    fn test_prefers_matching_wheels_newest_first() {
        let links = linux_extractor(Some((3, 11))).extract(PAGE);
        assert_eq!(
            links,
            vec![
                "../../packages/bb/torch-2.1.0-cp311-cp311-manylinux1_x86_64.whl",
                "../../packages/aa/torch-1.13.1-cp311-cp311-manylinux1_x86_64.whl",
            ]
        );
    }

    #[test]
    fn test_current_manylinux_tags_match() {
        let page = r#"
<a href="/p/torch-2.5.0-cp311-cp311-manylinux_2_28_x86_64.whl#sha256=1">a</a>
<a href="/p/torch-2.5.0-cp311-none-macosx_11_0_arm64.whl#sha256=2">b</a>
<a href="/p/torch-2.6.0-cp313-cp313-win_amd64.whl#sha256=3">c</a>
"#;
        let links = linux_extractor(Some((3, 11))).extract(page);
        assert_eq!(links, vec!["/p/torch-2.5.0-cp311-cp311-manylinux_2_28_x86_64.whl"]);

        let mac = LinkExtractor::new(Some((3, 11)), platform::platform_pattern_for("macos", "aarch64")).unwrap();
        assert_eq!(mac.extract(page), vec!["/p/torch-2.5.0-cp311-none-macosx_11_0_arm64.whl"]);
    }

    #[test]
    fn test_falls_back_to_any_wheel() {
        // No cp39 wheels on the page
        let links = linux_extractor(Some((3, 9))).extract(PAGE);
        assert_eq!(links.len(), 4);
        assert_eq!(links[0], "../../packages/dd/torch-2.2.0-cp312-cp312-win_amd64.whl");

        // Unknown interpreter goes straight to any wheel
        let links = linux_extractor(None).extract(PAGE);
        assert_eq!(links.len(), 4);
    }

    #[test]
    fn test_falls_back_to_first_archive() {
        let page = r#"<a href='/packages/x/six-1.16.0.tar.gz#sha256=1'>a</a>
<a href='/packages/y/six-1.17.0.zip'>b</a>"#;
        let links = linux_extractor(Some((3, 11))).extract(page);
        assert_eq!(links, vec!["/packages/x/six-1.16.0.tar.gz"]);
    }

    #[test]
    fn test_empty_page_has_no_links() {
        assert!(linux_extractor(Some((3, 11))).extract("<html></html>").is_empty());
    }

    #[test]
    fn test_unquoted_href() {
        let page = "<a href=/files/pkg-1.0.0-py3-none-any.whl>pkg</a>";
        let links = linux_extractor(None).extract(page);
        assert_eq!(links, vec!["/files/pkg-1.0.0-py3-none-any.whl"]);
    }

    #[test]
    fn test_resolve_link() {
        let page = "https://mirror.example/pypi/simple/torch/";
        assert_eq!(
            resolve_link(page, "https://files.example/torch.whl").unwrap(),
            "https://files.example/torch.whl"
        );
        assert_eq!(
            resolve_link(page, "/packages/torch.whl").unwrap(),
            "https://mirror.example/packages/torch.whl"
        );
        assert_eq!(
            resolve_link(page, "torch-2.1.0.whl").unwrap(),
            "https://mirror.example/pypi/simple/torch/torch-2.1.0.whl"
        );
        assert_eq!(
            resolve_link(page, "../../packages/bb/torch.whl").unwrap(),
            "https://mirror.example/pypi/packages/bb/torch.whl"
        );
    }

    #[tokio::test]
    async fn test_locate_on_mock_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/torch/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let client = MirrorClient::new(&ClientSettings::default()).unwrap();
        let mirror = Mirror::new("mock", format!("{}/simple", server.uri()));
        let locator = PackageLocator::new(linux_extractor(Some((3, 11))), Duration::from_secs(5));

        let url = locator.locate(&client, &mirror, "torch").await.unwrap();
        assert_eq!(
            url,
            format!("{}/packages/bb/torch-2.1.0-cp311-cp311-manylinux1_x86_64.whl", server.uri())
        );
    }

    #[tokio::test]
    async fn test_locate_reports_missing_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = MirrorClient::new(&ClientSettings::default()).unwrap();
        let mirror = Mirror::new("mock", format!("{}/simple", server.uri()));
        let locator = PackageLocator::new(linux_extractor(None), Duration::from_secs(5));

        let err = locator.locate(&client, &mirror, "nope").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
    }
}
