use std::cmp::Reverse;

use cws_protocol::Citation;
use tracing::debug;

/// Wraps each cited span in an inline `<cite>` marker carrying the
/// citation metadata as JSON.
///
/// Offsets are character positions in `text`. Citations are applied from
/// the highest `start_ix` down so earlier offsets stay valid. Citations with
/// missing, inverted, out-of-range or overlapping offsets are skipped.
pub fn apply_citations(text: &str, citations: &[Citation]) -> String {
    let mut ordered: Vec<(usize, usize, &Citation)> = citations
        .iter()
        .filter_map(|citation| Some((citation.start_ix?, citation.end_ix?, citation)))
        .collect();
    if ordered.is_empty() {
        return text.to_string();
    }
    ordered.sort_by_key(|(start, _, _)| Reverse(*start));

    let mut chars: Vec<char> = text.chars().collect();
    let mut limit = chars.len();
    for (start, end, citation) in ordered {
        if start > end || end > limit {
            debug!(start, end, limit, "skipping citation with unusable offsets");
            continue;
        }
        let span: String = chars[start..end].iter().collect();
        let marker = citation_marker(&span, citation);
        chars.splice(start..end, marker.chars());
        limit = start;
    }
    chars.into_iter().collect()
}

fn citation_marker(span: &str, citation: &Citation) -> String {
    let metadata = citation
        .metadata
        .as_ref()
        .and_then(|metadata| serde_json::to_string(metadata).ok())
        .unwrap_or_else(|| "{}".to_string());
    format!(
        "<cite data-citation=\"{}\">{span}</cite>",
        escape_attribute(&metadata)
    )
}

fn escape_attribute(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use cws_protocol::metadata::CiteData;
    use pretty_assertions::assert_eq;

    fn citation(start: usize, end: usize, title: &str) -> Citation {
        Citation {
            start_ix: Some(start),
            end_ix: Some(end),
            metadata: Some(CiteData {
                title: Some(title.to_string()),
                url: Some(format!("https://example.com/{title}")),
                text: None,
            }),
        }
    }

    #[test]
    fn wraps_cited_span() {
        let cited = apply_citations("The sky is blue", &[citation(4, 9, "sky")]);

        assert_eq!(
            cited,
            "The <cite data-citation=\"{&quot;title&quot;:&quot;sky&quot;,\
             &quot;url&quot;:&quot;https://example.com/sky&quot;}\">sky i</cite>s blue"
        );
    }

    #[test]
    fn applies_highest_start_first_regardless_of_input_order() {
        let text = "alpha beta gamma";
        let citations = [citation(0, 5, "a"), citation(11, 16, "g")];
        let reversed = [citation(11, 16, "g"), citation(0, 5, "a")];

        let cited = apply_citations(text, &citations);

        assert_eq!(cited, apply_citations(text, &reversed));
        assert!(cited.starts_with("<cite"));
        assert!(cited.contains(">alpha</cite> beta <cite"));
        assert!(cited.ends_with(">gamma</cite>"));
    }

    #[test]
    fn offsets_count_characters() {
        let cited = apply_citations("日本語のテキスト", &[citation(0, 3, "ja")]);

        assert!(cited.contains(">日本語</cite>のテキスト"));
    }

    #[test]
    fn skips_unusable_offsets() {
        let text = "short";
        let citations = [
            citation(3, 99, "far"),
            Citation {
                start_ix: None,
                end_ix: Some(2),
                metadata: None,
            },
        ];

        assert_eq!(apply_citations(text, &citations), "short");
    }

    #[test]
    fn overlapping_lower_citation_is_skipped() {
        let cited = apply_citations("abcdefgh", &[citation(0, 5, "x"), citation(3, 6, "y")]);

        assert_eq!(cited.matches("<cite").count(), 1);
        assert!(cited.contains(">def</cite>"));
    }
}
