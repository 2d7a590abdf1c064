use std::borrow::Cow;

/// Strip control characters that RSS XML cannot usefully carry from text
/// extracted out of source documents (titles, descriptions, scraped cells).
///
/// Removes ASCII controls 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F and DEL (0x7F),
/// preserving tab (0x09), newline (0x0A) and carriage return (0x0D).
///
/// Returns `Cow::Borrowed` when the input is already clean (common case):
/// a single byte scan, no allocation.
pub fn scrub_text(s: &str) -> Cow<'_, str> {
    fn is_stripped(b: u8) -> bool {
        b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d)
    }

    if !s.bytes().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    // Control bytes cannot appear mid-codepoint in valid UTF-8, so
    // filtering per-char keeps multi-byte sequences intact.
    let cleaned = s
        .chars()
        .filter(|&c| !(c.is_ascii() && is_stripped(c as u8)))
        .collect();
    Cow::Owned(cleaned)
}

/// Collapse runs of whitespace to single spaces and trim the ends.
///
/// HTML-extracted text arrives with the source document's indentation and
/// line breaks baked in; a scraped title spanning nested elements needs
/// them folded before it can serve as a fingerprintable one-line value.
pub fn collapse_whitespace(s: &str) -> Cow<'_, str> {
    let clean = s.trim() == s
        && !s.contains("  ")
        && !s.contains(|c: char| c.is_whitespace() && c != ' ');
    if clean {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.split_whitespace().collect::<Vec<_>>().join(" "))
}
