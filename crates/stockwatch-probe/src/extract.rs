//! Product-page extraction.
//!
//! Pulls three fields out of the page markup:
//! - name: text of `<h1 class="nom-name">`
//! - price: `<meta itemprop="price" content="…">`
//! - availability: `<meta itemprop="availability" content="InStock">`

use once_cell::sync::Lazy;
use regex::Regex;
use stockwatch_core::types::ProbeResult;

/// Name used when the page has no product heading.
pub const UNTITLED: &str = "Untitled";
/// Price shown when the page has no price meta tag.
pub const NO_PRICE: &str = "—";

const NAME_CLASS: &str = "nom-name";

static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1\b([^>]*)>(.*?)</h1\s*>").expect("valid h1 regex"));
static META_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b([^>]*)>").expect("valid meta regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Extract name, price, and availability from a product page.
/// `price_suffix` is appended to the raw price value.
pub fn extract_product(html: &str, price_suffix: &str) -> ProbeResult {
    let display_name = product_name(html).unwrap_or_else(|| UNTITLED.to_string());

    let price = meta_content(html, "price")
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}{price_suffix}"))
        .unwrap_or_else(|| NO_PRICE.to_string());

    let in_stock = meta_content(html, "availability").is_some_and(|a| is_in_stock(&a));

    ProbeResult { display_name, price, in_stock }
}

fn product_name(html: &str) -> Option<String> {
    H1_RE
        .captures_iter(html)
        .find(|caps| {
            attribute(&caps[1], "class")
                .is_some_and(|class| class.split_whitespace().any(|c| c == NAME_CLASS))
        })
        .map(|caps| text_content(&caps[2]))
        .filter(|name| !name.is_empty())
}

/// `content` of the first `<meta itemprop="{itemprop}">`.
fn meta_content(html: &str, itemprop: &str) -> Option<String> {
    META_RE.captures_iter(html).find_map(|caps| {
        let attrs = &caps[1];
        let prop = attribute(attrs, "itemprop")?;
        if !prop.eq_ignore_ascii_case(itemprop) {
            return None;
        }
        attribute(attrs, "content").map(|c| c.trim().to_string())
    })
}

// Accepts the bare value and the schema.org URL form.
fn is_in_stock(availability: &str) -> bool {
    availability == "InStock" || availability.ends_with("/InStock")
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(attrs).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
        Some(decode_entities(value.as_str()))
    })
}

fn text_content(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head>
          <meta property="og:title" content="Rose">
          <meta content="1490" itemprop="price">
          <meta itemprop="availability" content="InStock" />
        </head><body>
          <h1>Site header</h1>
          <h1 class="product nom-name" data-id="7">
            Rose <span>&quot;Red&nbsp;Star&quot;</span>
          </h1>
        </body></html>
    "#;

    #[test]
    fn test_extracts_all_fields() {
        let result = extract_product(PAGE, " ₽");
        assert_eq!(result.display_name, r#"Rose "Red Star""#);
        assert_eq!(result.price, "1490 ₽");
        assert!(result.in_stock);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let result = extract_product("<html><h1>Other</h1></html>", " ₽");
        assert_eq!(result.display_name, UNTITLED);
        assert_eq!(result.price, NO_PRICE);
        assert!(!result.in_stock);
    }

    #[test]
    fn test_out_of_stock_and_empty_price() {
        let html = r#"<meta itemprop="price" content=""><meta itemprop='availability' content='OutOfStock'>
            <h1 class='nom-name'>Tulip</h1>"#;
        let result = extract_product(html, " ₽");
        assert_eq!(result.display_name, "Tulip");
        assert_eq!(result.price, NO_PRICE);
        assert!(!result.in_stock);
    }

    #[test]
    fn test_schema_org_availability_url() {
        let html = r#"<meta itemprop="availability" content="https://schema.org/InStock">"#;
        assert!(extract_product(html, "").in_stock);
        let html = r#"<meta itemprop="availability" content="https://schema.org/PreOrder">"#;
        assert!(!extract_product(html, "").in_stock);
    }

    #[test]
    fn test_class_must_match_whole_token() {
        let html = r#"<h1 class="nom-name-extra">Nope</h1>"#;
        assert_eq!(extract_product(html, "").display_name, UNTITLED);
    }
}
