use crate::package::DocumentKind;
use quick_xml::escape::escape;

/// Escaped XML-Sonderzeichen und konvertiert Newlines zu Zeilenumbrüchen der Dokumentart
pub fn escape_value(text: &str, kind: DocumentKind) -> String {
    let escaped = escape(text);

    if !escaped.contains('\n') {
        return escaped.into_owned();
    }

    escaped
        .replace("\r\n", "\n")
        .split('\n')
        .collect::<Vec<_>>()
        .join(kind.line_break())
}
