use std::sync::LazyLock;

use regex::Regex;

/// Comment leaders at the start of a line
static LEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?://+|/\*+|\*+|#+)?\s*").expect("valid regex"));

/// Block comment terminator at the end of a line
static TRAILER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\*+/\s*$").expect("valid regex"));

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:TODO|FIXME)\b\s*:?\s*").expect("valid regex"));

/// Turn the text of a TODO comment into a task title.
///
/// Comment leaders and the `TODO`/`FIXME` marker are stripped and
/// continuation lines are joined with single spaces. Returns `None` when
/// nothing is left.
pub fn title_from_todo(comment: &str) -> Option<String> {
    let joined = comment
        .lines()
        .map(|line| {
            let line = TRAILER.replace(line, "");
            LEADER.replace(&line, "").trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let title = MARKER.replace(&joined, "").trim().to_string();
    if title.is_empty() { None } else { Some(title) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comment() {
        assert_eq!(
            title_from_todo("// TODO: handle empty input").as_deref(),
            Some("handle empty input")
        );
        assert_eq!(title_from_todo("# fixme retry on 503").as_deref(), Some("retry on 503"));
    }

    #[test]
    fn test_block_comment_joins_lines() {
        let comment = "/* TODO split the parser\n * into two passes */";
        assert_eq!(
            title_from_todo(comment).as_deref(),
            Some("split the parser into two passes")
        );
    }

    #[test]
    fn test_marker_only_yields_nothing() {
        assert_eq!(title_from_todo("// TODO:"), None);
        assert_eq!(title_from_todo("/* TODO\n */"), None);
        assert_eq!(title_from_todo("   "), None);
    }

    #[test]
    fn test_text_without_marker_is_kept() {
        assert_eq!(
            title_from_todo("/** cache the lookup */").as_deref(),
            Some("cache the lookup")
        );
    }

    #[test]
    fn test_marker_must_be_a_word() {
        assert_eq!(
            title_from_todo("// TODOS are tracked elsewhere").as_deref(),
            Some("TODOS are tracked elsewhere")
        );
    }
}
