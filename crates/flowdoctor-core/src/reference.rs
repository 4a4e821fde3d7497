//! Extraction of automation ids from user input.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{20,30}$").expect("Invalid id regex"));

static PATH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"automations/([a-z0-9]+)").expect("Invalid path regex"));

/// Parse an automation id from a bare id or an automation URL.
///
/// Accepts `cmkwhwr4j0001jp0412bdp8zw`,
/// `https://pulseflow.co/automations/cmkwhwr4j0001jp0412bdp8zw` and the same
/// URL without a scheme.
pub fn parse_automation_ref(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if BARE_ID.is_match(text) {
        return Some(text.to_string());
    }

    let url = Url::parse(text)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("https://{text}")).ok())?;

    PATH_ID
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether `text` looks like an automation id or URL.
pub fn is_automation_ref(text: &str) -> bool {
    parse_automation_ref(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "cmkwhwr4j0001jp0412bdp8zw";

    #[test]
    fn test_bare_id() {
        assert_eq!(parse_automation_ref(ID).as_deref(), Some(ID));
        assert_eq!(parse_automation_ref(&format!("  {ID}\n")).as_deref(), Some(ID));
    }

    #[test]
    fn test_bare_id_length_bounds() {
        assert!(parse_automation_ref(&"a".repeat(19)).is_none());
        assert!(parse_automation_ref(&"a".repeat(20)).is_some());
        assert!(parse_automation_ref(&"a".repeat(30)).is_some());
        assert!(parse_automation_ref(&"a".repeat(31)).is_none());
    }

    #[test]
    fn test_bare_id_rejects_uppercase_and_symbols() {
        assert!(parse_automation_ref("CMKWHWR4J0001JP0412BDP8ZW").is_none());
        assert!(parse_automation_ref("cmkwhwr4j-0001jp0412bdp8zw").is_none());
    }

    #[test]
    fn test_url_with_scheme() {
        let url = format!("https://pulseflow.co/automations/{ID}");
        assert_eq!(parse_automation_ref(&url).as_deref(), Some(ID));

        let url = format!("https://pulseflow.co/automations/{ID}/runs?tab=logs");
        assert_eq!(parse_automation_ref(&url).as_deref(), Some(ID));
    }

    #[test]
    fn test_url_without_scheme() {
        let url = format!("pulseflow.co/automations/{ID}");
        assert_eq!(parse_automation_ref(&url).as_deref(), Some(ID));
    }

    #[test]
    fn test_free_text_is_not_a_reference() {
        assert!(parse_automation_ref("why did my swap fail?").is_none());
        assert!(parse_automation_ref("").is_none());
        assert!(parse_automation_ref("https://pulseflow.co/pricing").is_none());
        assert!(!is_automation_ref("hello"));
    }
}
