// Outcome extraction for the HTML-form endpoints. Writes do not return JSON:
// success is a redirect, failures are sentences embedded in the page.

use super::transport::HttpResponse;
use regex::Regex;
use std::sync::LazyLock;

static PACKAGE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ID=(\d+)").unwrap());

static ERROR_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<span class=['"]error['"]>([^\n]+?)</span><br ?/>"#).unwrap());

static PKG_OUTPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<p class=['"]pkgoutput['"]>([^<]+)<"#).unwrap());

static NO_ACCOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(You must create an account before you can upload packages\.)\r?$").unwrap()
});

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Package id carried by a success redirect's `location` header.
pub fn redirect_package_id(res: &HttpResponse) -> Option<u64> {
    if !res.is_redirect() {
        return None;
    }
    let location = res.header("location")?;
    PACKAGE_ID
        .captures(location)
        .and_then(|c| c[1].parse().ok())
}

/// Error text from a rejected upload page. Patterns are tried in order and
/// the first match wins.
pub fn upload_error_message(body: &str) -> Option<String> {
    [&*ERROR_SPAN, &*PKG_OUTPUT, &*NO_ACCOUNT]
        .iter()
        .find_map(|re| re.captures(body))
        .map(|c| strip_markup(&c[1]))
}

/// Status sentence printed by the package actions page.
pub fn package_output_message(body: &str) -> Option<String> {
    PKG_OUTPUT.captures(body).map(|c| strip_markup(&c[1]))
}

pub fn strip_markup(text: &str) -> String {
    MARKUP.replace_all(text, "").trim().to_string()
}
