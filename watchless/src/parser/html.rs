use std::sync::LazyLock;

use regex::Regex;

use crate::document::Frame;

static FRAME_OPEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<iframe\b([^>]*)>").expect("iframe open regex"));

static FRAME_CLOSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</iframe\s*>").expect("iframe close regex"));

static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute regex")
});

/// A piece of raw HTML: either an `<iframe>` element or anything else.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HtmlPiece {
    Raw(String),
    Frame(Frame),
}

/// Cut `html` into frames and the raw HTML between them.
pub(crate) fn scan(html: &str) -> Vec<HtmlPiece> {
    let mut pieces = Vec::new();
    let mut rest = html;

    while let Some((whole, open)) = FRAME_OPEN_REGEX
        .captures(rest)
        .and_then(|caps| Some((caps.get(0)?, caps)))
    {
        let before = &rest[..whole.start()];
        if !before.trim().is_empty() {
            pieces.push(HtmlPiece::Raw(before.to_string()));
        }

        let attrs = open.get(1).map_or("", |m| m.as_str());
        pieces.push(HtmlPiece::Frame(parse_frame_attributes(attrs)));

        let after_open = &rest[whole.end()..];
        rest = match FRAME_CLOSE_REGEX.find(after_open) {
            Some(close) => &after_open[close.end()..],
            None => after_open,
        };
    }

    if !rest.trim().is_empty() {
        pieces.push(HtmlPiece::Raw(rest.to_string()));
    }
    pieces
}

/// Whether a fragment of inline HTML is an `</iframe>` closing tag.
pub(crate) fn is_frame_close(html: &str) -> bool {
    FRAME_CLOSE_REGEX
        .find(html.trim())
        .is_some_and(|m| m.start() == 0 && m.end() == html.trim().len())
}

fn parse_frame_attributes(attrs: &str) -> Frame {
    let attrs = attrs.trim_end().trim_end_matches('/');
    let mut attributes = Vec::new();
    for cap in ATTRIBUTE_REGEX.captures_iter(attrs) {
        let name = cap[1].to_string();
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .or_else(|| cap.get(4))
            .map_or_else(String::new, |m| m.as_str().to_string());
        attributes.push((name, value));
    }

    let src = attributes
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("src"))
        .map(|(_, value)| value.clone());
    Frame { src, attributes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_with_quoted_and_bare_attributes() {
        let pieces = scan(
            r#"<iframe width=560 src="https://www.youtube.com/embed/abc" title='Player' allowfullscreen></iframe>"#,
        );
        let [HtmlPiece::Frame(frame)] = pieces.as_slice() else {
            panic!("expected one frame, got {pieces:?}");
        };
        assert_eq!(frame.src.as_deref(), Some("https://www.youtube.com/embed/abc"));
        assert_eq!(
            frame.attributes,
            vec![
                ("width".to_string(), "560".to_string()),
                ("src".to_string(), "https://www.youtube.com/embed/abc".to_string()),
                ("title".to_string(), "Player".to_string()),
                ("allowfullscreen".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn raw_html_around_frames_is_kept() {
        let pieces = scan("<div>\n<IFRAME src=\"a\"></IFRAME>\n</div>\n");
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], HtmlPiece::Raw("<div>\n".into()));
        assert!(matches!(&pieces[1], HtmlPiece::Frame(f) if f.src.as_deref() == Some("a")));
        assert_eq!(pieces[2], HtmlPiece::Raw("\n</div>\n".into()));
    }

    #[test]
    fn html_without_frames_is_one_raw_piece() {
        assert_eq!(
            scan("<details>x</details>"),
            vec![HtmlPiece::Raw("<details>x</details>".into())]
        );
    }

    #[test]
    fn frame_without_src() {
        let pieces = scan("<iframe/>");
        assert_eq!(
            pieces,
            vec![HtmlPiece::Frame(Frame {
                src: None,
                attributes: Vec::new()
            })]
        );
    }

    #[test]
    fn close_tag_detection() {
        assert!(is_frame_close("</iframe>"));
        assert!(is_frame_close(" </IFRAME > "));
        assert!(!is_frame_close("</div>"));
        assert!(!is_frame_close("<iframe>"));
    }
}
