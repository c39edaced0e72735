//! News sitemap serialization.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:news="http://www.google.com/schemas/sitemap-news/0.9">
//!   <url>
//!     <loc>https://example.com/article</loc>
//!     <lastmod>2024-03-15T10:05:00+00:00</lastmod>
//!     <news:news>
//!       <news:publication>
//!         <news:name>Daily Planet</news:name>
//!         <news:language>en</news:language>
//!       </news:publication>
//!       <news:publication_date>2024-03-15T10:00:00+00:00</news:publication_date>
//!       <news:title>Article title</news:title>
//!       <news:author>Jane Smith</news:author>
//!       <news:keywords>politics, economy</news:keywords>
//!     </news:news>
//!   </url>
//! </urlset>
//! ```
//!
//! The document is written without whitespace between elements.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use quick_xml::escape::escape;

use crate::content::ContentItem;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const NEWS_NS: &str = "http://www.google.com/schemas/sitemap-news/0.9";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Characters percent-encoded in a location that does not parse as a URL.
const LOC_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Writes content items as a news sitemap document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedEncoder;

impl FeedEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode `items` in the order given. Every text value is escaped once.
    pub fn encode(&self, items: &[ContentItem], publication_name: &str, language: &str) -> String {
        let mut xml = String::with_capacity(256 + items.len() * 512);

        xml.push_str(XML_DECLARATION);
        xml.push_str("<urlset xmlns=\"");
        xml.push_str(SITEMAP_NS);
        xml.push_str("\" xmlns:news=\"");
        xml.push_str(NEWS_NS);
        xml.push_str("\">");

        // invariant for the whole document
        let publication = format!(
            "<news:publication><news:name>{}</news:name><news:language>{}</news:language></news:publication>",
            escape(xml_text(publication_name).as_ref()),
            escape(xml_text(language).as_ref())
        );

        for item in items {
            self.write_url(&mut xml, item, &publication);
        }

        xml.push_str("</urlset>");
        xml
    }

    fn write_url(&self, xml: &mut String, item: &ContentItem, publication: &str) {
        xml.push_str("<url><loc>");
        xml.push_str(&escape(encode_location(&item.url).as_ref()));
        xml.push_str("</loc><lastmod>");
        xml.push_str(&format_timestamp(item.last_modified()));
        xml.push_str("</lastmod><news:news>");
        xml.push_str(publication);
        xml.push_str("<news:publication_date>");
        xml.push_str(&format_timestamp(item.published));
        xml.push_str("</news:publication_date><news:title>");
        xml.push_str(&escape(xml_text(&item.title).as_ref()));
        xml.push_str("</news:title>");

        if let Some(author) = item.author_name() {
            xml.push_str("<news:author>");
            xml.push_str(&escape(xml_text(author).as_ref()));
            xml.push_str("</news:author>");
        }

        if !item.tags.is_empty() {
            xml.push_str("<news:keywords>");
            xml.push_str(&escape(xml_text(&item.tags.join(", ")).as_ref()));
            xml.push_str("</news:keywords>");
        }

        xml.push_str("</news:news></url>");
    }
}

/// Percent-encode a location per URL rules. Existing `%XX` escapes are
/// kept as they are.
fn encode_location(raw: &str) -> Cow<'_, str> {
    match url::Url::parse(raw.trim()) {
        Ok(url) => Cow::Owned(url.to_string()),
        Err(_) => Cow::from(utf8_percent_encode(raw.trim(), LOC_ENCODE_SET)),
    }
}

/// Drop characters XML 1.0 does not allow in text content.
fn xml_text(raw: &str) -> Cow<'_, str> {
    if raw.chars().all(is_xml_char) {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(raw.chars().filter(|c| is_xml_char(*c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// ISO-8601 with an explicit offset, e.g. `2024-03-15T10:00:00+00:00`.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}
