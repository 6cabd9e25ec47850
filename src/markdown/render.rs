//! [`Block`] tree to markdown text.
//!
//! Output is unwrapped and deterministic: parsing it again yields the same
//! tree. Top-level rules are written as `---` so Mochi sees a page break;
//! rules inside lists and quotes are written as `***`, which can neither
//! underline a setext heading nor pass for a page break.

use super::{Block, Inline};

pub(super) fn render_blocks(blocks: &[Block]) -> String {
    join_blocks(blocks, false, "\n\n")
}

fn join_blocks(blocks: &[Block], nested: bool, sep: &str) -> String {
    blocks
        .iter()
        .map(|block| render_block(block, nested))
        .collect::<Vec<_>>()
        .join(sep)
}

fn render_block(block: &Block, nested: bool) -> String {
    match block {
        Block::Plain(inlines) | Block::Para(inlines) => render_inlines(inlines),
        Block::Heading { level, content } => {
            let mut out = "#".repeat(usize::from(*level));
            out.push(' ');
            out.push_str(&escape_closing_hashes(render_inlines(content)));
            out
        }
        Block::CodeBlock { info, text } => {
            let fence = "`".repeat((longest_run(text, '`') + 1).max(3));
            let mut out = format!("{fence}{info}\n{text}");
            if !text.is_empty() && !text.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out
        }
        Block::BlockQuote(blocks) => prefix_lines(&join_blocks(blocks, true, "\n\n"), "> ", ">"),
        Block::List { start, items } => render_list(*start, items),
        Block::Html(html) => html.trim_end_matches('\n').to_string(),
        Block::Rule if nested => "***".to_string(),
        Block::Rule => "---".to_string(),
    }
}

fn render_list(start: Option<u64>, items: &[Vec<Block>]) -> String {
    let tight = items
        .iter()
        .flatten()
        .all(|block| !matches!(block, Block::Para(_)));
    let (block_sep, item_sep) = if tight { ("\n", "\n") } else { ("\n\n", "\n\n") };

    let mut rendered = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let marker = match start {
            Some(n) => format!("{}. ", n + i as u64),
            None => "- ".to_string(),
        };
        let body = join_blocks(item, true, block_sep);
        if body.is_empty() {
            rendered.push(marker.trim_end().to_string());
            continue;
        }
        let indent = " ".repeat(marker.len());
        let mut lines = body.lines();
        let mut out = marker;
        if let Some(first) = lines.next() {
            out.push_str(first);
        }
        for line in lines {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
                out.push_str(line);
            }
        }
        rendered.push(out);
    }
    rendered.join(item_sep)
}

/// A trailing run of `#` after a space would be read as a closing sequence.
fn escape_closing_hashes(mut content: String) -> String {
    let kept = content.trim_end_matches('#').len();
    if kept < content.len() && (kept == 0 || content[..kept].ends_with(' ')) {
        content.insert(kept, '\\');
    }
    content
}

fn prefix_lines(text: &str, prefix: &str, empty: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                empty.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_inlines(inlines: &[Inline]) -> String {
    let mut writer = InlineWriter {
        out: String::new(),
        line_start: true,
    };
    writer.write_all(inlines);
    writer.out
}

struct InlineWriter {
    out: String,
    /// Next text starts a line and may need block-marker escaping.
    line_start: bool,
}

impl InlineWriter {
    fn write_all(&mut self, inlines: &[Inline]) {
        for (i, inline) in inlines.iter().enumerate() {
            self.write(inline, inlines.get(i + 1));
        }
    }

    fn write(&mut self, inline: &Inline, next: Option<&Inline>) {
        let at_line_start = std::mem::replace(&mut self.line_start, false);
        match inline {
            Inline::Str(text) => {
                let mut escaped = escape_text(text);
                if at_line_start {
                    escaped = escape_line_start(&escaped);
                }
                // `!` directly before a link would turn it into an image.
                if escaped.ends_with('!')
                    && matches!(next, Some(Inline::Link { autolink: false, .. }))
                {
                    escaped.insert(escaped.len() - 1, '\\');
                }
                self.out.push_str(&escaped);
            }
            Inline::Space => self.out.push(' '),
            Inline::SoftBreak => {
                self.out.push('\n');
                self.line_start = true;
            }
            Inline::LineBreak => {
                self.out.push_str("\\\n");
                self.line_start = true;
            }
            Inline::Emph(children) => {
                let delim = if self.touches_word(next) { "*" } else { "_" };
                self.wrap(delim, children);
            }
            Inline::Strong(children) => self.wrap("**", children),
            Inline::Strikeout(children) => self.wrap("~~", children),
            Inline::Code(code) => {
                let ticks = "`".repeat(longest_run(code, '`') + 1);
                let pad = code.starts_with('`')
                    || code.ends_with('`')
                    || (code.starts_with(' ') && code.ends_with(' ') && code.trim() != "");
                let space = if pad { " " } else { "" };
                self.out
                    .push_str(&format!("{ticks}{space}{code}{space}{ticks}"));
            }
            Inline::Math { display, text } => {
                let delim = if *display { "$$" } else { "$" };
                self.out.push_str(&format!("{delim}{text}{delim}"));
            }
            Inline::Link {
                content,
                url,
                title,
                autolink,
            } => {
                if *autolink {
                    self.out.push_str(&format!("<{}>", url.trim_start_matches("mailto:")));
                } else {
                    self.out.push('[');
                    self.write_all(content);
                    self.out.push(']');
                    self.out.push_str(&target(url, title));
                }
            }
            Inline::Image { alt, url, title } => {
                self.out.push_str("![");
                self.write_all(alt);
                self.out.push(']');
                self.out.push_str(&target(url, title));
            }
            Inline::Html(html) => self.out.push_str(html),
        }
    }

    fn wrap(&mut self, delim: &str, children: &[Inline]) {
        self.out.push_str(delim);
        self.write_all(children);
        self.out.push_str(delim);
    }

    /// Underscore emphasis does not work inside a word.
    fn touches_word(&self, next: Option<&Inline>) -> bool {
        let before = self.out.chars().last().is_some_and(char::is_alphanumeric);
        let after = matches!(
            next,
            Some(Inline::Str(s)) if s.chars().next().is_some_and(char::is_alphanumeric)
        );
        before || after
    }
}

fn target(url: &str, title: &str) -> String {
    let url = if url.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", url.replace('<', "\\<").replace('>', "\\>"))
    } else {
        url.to_string()
    };
    if title.is_empty() {
        format!("({url})")
    } else {
        let title = title.replace('\\', "\\\\").replace('"', "\\\"");
        format!("({url} \"{title}\")")
    }
}

/// Escape characters that would start inline markup.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '$' | '~' => {
                out.push('\\');
                out.push(c);
            }
            '&' if chars.peek().is_some_and(|n| n.is_alphanumeric() || *n == '#') => {
                out.push_str("\\&");
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escape a word that would otherwise open a heading, list, quote or rule.
fn escape_line_start(word: &str) -> String {
    if word.starts_with(['#', '-', '+', '=', '>']) {
        return format!("\\{word}");
    }
    let digits = word.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && word[digits..].starts_with(['.', ')']) {
        return format!("{}\\{}", &word[..digits], &word[digits..]);
    }
    word.to_string()
}

fn longest_run(text: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::super::parse::parse_blocks;
    use super::*;
    use pretty_assertions::assert_eq;

    fn roundtrip(text: &str) -> String {
        render_blocks(&parse_blocks(text))
    }

    #[test]
    fn test_rule_is_three_dashes() {
        assert_eq!(roundtrip("Q\n\n***\n\nA"), "Q\n\n---\n\nA");
        assert_eq!(roundtrip("Q\n\n- - - - -\n\nA"), "Q\n\n---\n\nA");
    }

    #[test]
    fn test_nested_rules_stay_nested() {
        assert_eq!(roundtrip("- ***\n\n---\n\nA"), "- ***\n\n---\n\nA");
        assert_eq!(roundtrip("- a\n  ***\n\n---\n\nA"), "- a\n  ***\n\n---\n\nA");
        assert_eq!(roundtrip("> Q\n>\n> ---"), "> Q\n>\n> ***");
    }

    #[test]
    fn test_heading_keeps_trailing_hash() {
        assert_eq!(roundtrip("# C \\#"), "# C \\#");
        assert_eq!(roundtrip("## C#"), "## C#");
    }

    #[test]
    fn test_no_line_wrapping() {
        let long = "word ".repeat(60);
        let rendered = roundtrip(long.trim_end());
        assert!(!rendered.contains('\n'));
    }

    #[test]
    fn test_line_start_escapes() {
        let blocks = vec![Block::Para(vec![
            Inline::Str("#1".into()),
            Inline::SoftBreak,
            Inline::Str("2.".into()),
            Inline::Space,
            Inline::Str("-".into()),
        ])];
        let rendered = render_blocks(&blocks);
        assert_eq!(rendered, "\\#1\n2\\. -");
        assert_eq!(parse_blocks(&rendered), blocks);
    }

    #[test]
    fn test_emphasis_inside_word_uses_asterisk() {
        assert_eq!(roundtrip("un*believ*able"), "un*believ*able");
        assert_eq!(roundtrip("*hint*"), "_hint_");
    }

    #[test]
    fn test_code_span_with_backticks() {
        assert_eq!(roundtrip("`` a`b ``"), "``a`b``");
        assert_eq!(roundtrip("`` `x ``"), "`` `x ``");
    }

    #[test]
    fn test_fenced_code_longer_than_content() {
        let rendered = roundtrip("````\n```\ninner\n```\n````");
        assert_eq!(rendered, "````\n```\ninner\n```\n````");
    }

    #[test]
    fn test_block_quote_and_loose_list() {
        assert_eq!(roundtrip("> a\n>\n> b"), "> a\n>\n> b");
        assert_eq!(roundtrip("1. one\n\n   more\n\n2. two"), "1. one\n\n   more\n\n2. two");
    }

    #[test]
    fn test_link_targets() {
        assert_eq!(roundtrip("[x](<a b.png>)"), "[x](<a b.png>)");
        assert_eq!(roundtrip("<https://mochi.cards>"), "<https://mochi.cards>");
        assert_eq!(roundtrip("[x](u \"say \\\"hi\\\"\")"), "[x](u \"say \\\"hi\\\"\")");
    }
}
