use opac_engine::decode_html;
use pretty_assertions::assert_eq;

#[test]
fn decode_respects_charset_header() {
    let bytes = b"Trag\xf6die"; // iso-8859-1
    let decoded = decode_html(bytes, Some("text/html; charset=ISO-8859-1"));
    assert_eq!(decoded.html, "Tragödie");
    assert!(
        decoded.encoding_label.eq_ignore_ascii_case("ISO-8859-1")
            || decoded.encoding_label.eq_ignore_ascii_case("windows-1252")
    );
}

#[test]
fn decode_handles_utf8_bom() {
    let bytes = b"\xEF\xBB\xBFhello";
    let decoded = decode_html(bytes, Some("text/html; charset=ISO-8859-1"));
    assert_eq!(decoded.html, "hello");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn decode_reads_meta_charset_without_header() {
    let bytes = b"<html><head><meta charset=\"iso-8859-1\"></head><body>Stra\xdfe</body></html>";
    let decoded = decode_html(bytes, Some("text/html"));
    assert!(decoded.html.contains("Straße"));
}

#[test]
fn decode_replaces_malformed_utf8() {
    let bytes = b"ok \xff end";
    let decoded = decode_html(bytes, Some("text/html; charset=utf-8"));
    assert_eq!(decoded.html, "ok \u{fffd} end");
}
