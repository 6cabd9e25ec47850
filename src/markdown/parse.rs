//! pulldown-cmark event stream to [`Block`] tree.

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag};

use super::{Block, Inline};

pub(super) fn parse_blocks(text: &str) -> Vec<Block> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_MATH;
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(text, options) {
        builder.event(event);
    }
    builder.finish()
}

/// An open container while walking the event stream.
enum Frame {
    /// Document root, block quote or list item.
    Blocks {
        kind: BlocksKind,
        blocks: Vec<Block>,
        /// Inlines that arrived without a paragraph (tight list items).
        loose: Vec<Inline>,
    },
    Inlines { kind: InlinesKind, inlines: Vec<Inline> },
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Code { info: String, text: String },
    Html(String),
    /// Tag this tree has no node for; its content goes to the parent.
    Transparent,
}

enum BlocksKind {
    Root,
    Quote,
    Item,
}

enum InlinesKind {
    Para,
    Heading(u8),
    Emph,
    Strong,
    Strikeout,
    Link { url: String, title: String, autolink: bool },
    Image { url: String, title: String },
}

enum Node {
    Block(Block),
    Inline(Inline),
    Item(Vec<Block>),
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::Blocks {
                kind: BlocksKind::Root,
                blocks: Vec::new(),
                loose: Vec::new(),
            }],
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(_) => self.close(),
            Event::Text(text) => match self.target() {
                Frame::Code { text: code, .. } => code.push_str(&text),
                Frame::Html(html) => html.push_str(&text),
                _ => {
                    for token in tokenize(&text) {
                        self.attach(Node::Inline(token));
                    }
                }
            },
            Event::Html(html) => match self.target() {
                Frame::Html(block) => block.push_str(&html),
                _ => self.attach(Node::Inline(Inline::Html(html.into_string()))),
            },
            Event::InlineHtml(html) => self.attach(Node::Inline(Inline::Html(html.into_string()))),
            Event::Code(code) => self.attach(Node::Inline(Inline::Code(code.into_string()))),
            Event::InlineMath(text) => self.attach(Node::Inline(Inline::Math {
                display: false,
                text: text.into_string(),
            })),
            Event::DisplayMath(text) => self.attach(Node::Inline(Inline::Math {
                display: true,
                text: text.into_string(),
            })),
            Event::SoftBreak => self.attach(Node::Inline(Inline::SoftBreak)),
            Event::HardBreak => self.attach(Node::Inline(Inline::LineBreak)),
            Event::Rule => self.attach(Node::Block(Block::Rule)),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x]" } else { "[ ]" };
                self.attach(Node::Inline(Inline::Str(marker.to_string())));
                self.attach(Node::Inline(Inline::Space));
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => inlines(InlinesKind::Para),
            Tag::Heading { level, .. } => inlines(InlinesKind::Heading(level as u8)),
            Tag::BlockQuote(_) => blocks(BlocksKind::Quote),
            Tag::Item => blocks(BlocksKind::Item),
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
            },
            Tag::CodeBlock(kind) => Frame::Code {
                info: match kind {
                    CodeBlockKind::Fenced(info) => info.into_string(),
                    CodeBlockKind::Indented => String::new(),
                },
                text: String::new(),
            },
            Tag::HtmlBlock => Frame::Html(String::new()),
            Tag::Emphasis => inlines(InlinesKind::Emph),
            Tag::Strong => inlines(InlinesKind::Strong),
            Tag::Strikethrough => inlines(InlinesKind::Strikeout),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => inlines(InlinesKind::Link {
                url: dest_url.into_string(),
                title: title.into_string(),
                autolink: matches!(link_type, LinkType::Autolink | LinkType::Email),
            }),
            Tag::Image { dest_url, title, .. } => inlines(InlinesKind::Image {
                url: dest_url.into_string(),
                title: title.into_string(),
            }),
            _ => Frame::Transparent,
        };
        self.stack.push(frame);
    }

    fn close(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if let Some(node) = finish(frame) {
            self.attach(node);
        }
    }

    /// Innermost frame that can receive content.
    fn target(&mut self) -> &mut Frame {
        let index = self
            .stack
            .iter()
            .rposition(|frame| !matches!(frame, Frame::Transparent))
            .unwrap_or(0);
        &mut self.stack[index]
    }

    fn attach(&mut self, node: Node) {
        match (self.target(), node) {
            (Frame::Blocks { blocks, loose, .. }, Node::Block(block)) => {
                flush_loose(blocks, loose);
                blocks.push(block);
            }
            (Frame::Blocks { blocks, loose, .. }, Node::Item(items)) => {
                flush_loose(blocks, loose);
                blocks.extend(items);
            }
            (Frame::Blocks { loose, .. }, Node::Inline(inline)) => push_inline(loose, inline),
            (Frame::Inlines { inlines, .. }, Node::Inline(inline)) => push_inline(inlines, inline),
            (
                Frame::Inlines { inlines, .. },
                Node::Block(Block::Plain(more) | Block::Para(more)),
            ) => {
                more.into_iter().for_each(|inline| push_inline(inlines, inline));
            }
            (Frame::List { items, .. }, Node::Item(item)) => items.push(item),
            (Frame::List { items, .. }, Node::Block(block)) => items.push(vec![block]),
            (Frame::Code { text, .. }, Node::Inline(Inline::Str(s))) => text.push_str(&s),
            (Frame::Html(html), Node::Inline(Inline::Html(s))) => html.push_str(&s),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        while self.stack.len() > 1 {
            self.close();
        }
        match self.stack.pop() {
            Some(Frame::Blocks {
                mut blocks,
                mut loose,
                ..
            }) => {
                flush_loose(&mut blocks, &mut loose);
                blocks
            }
            _ => Vec::new(),
        }
    }
}

fn inlines(kind: InlinesKind) -> Frame {
    Frame::Inlines {
        kind,
        inlines: Vec::new(),
    }
}

fn blocks(kind: BlocksKind) -> Frame {
    Frame::Blocks {
        kind,
        blocks: Vec::new(),
        loose: Vec::new(),
    }
}

fn finish(frame: Frame) -> Option<Node> {
    let node = match frame {
        Frame::Blocks {
            kind,
            mut blocks,
            mut loose,
        } => {
            flush_loose(&mut blocks, &mut loose);
            match kind {
                BlocksKind::Root => return None,
                BlocksKind::Quote => Node::Block(Block::BlockQuote(blocks)),
                BlocksKind::Item => Node::Item(blocks),
            }
        }
        Frame::Inlines { kind, mut inlines } => match kind {
            InlinesKind::Para => Node::Block(Block::Para(trim_breaks(inlines))),
            InlinesKind::Heading(level) => Node::Block(Block::Heading {
                level,
                content: trim_breaks(inlines),
            }),
            InlinesKind::Emph => Node::Inline(Inline::Emph(inlines)),
            InlinesKind::Strong => Node::Inline(Inline::Strong(inlines)),
            InlinesKind::Strikeout => Node::Inline(Inline::Strikeout(inlines)),
            InlinesKind::Link { url, title, autolink } => Node::Inline(Inline::Link {
                content: inlines,
                url,
                title,
                autolink,
            }),
            InlinesKind::Image { url, title } => {
                inlines.retain(|inline| !matches!(inline, Inline::SoftBreak | Inline::LineBreak));
                Node::Inline(Inline::Image {
                    alt: inlines,
                    url,
                    title,
                })
            }
        },
        Frame::List { start, items } => Node::Block(Block::List { start, items }),
        Frame::Code { info, text } => Node::Block(Block::CodeBlock { info, text }),
        Frame::Html(html) => Node::Block(Block::Html(html)),
        Frame::Transparent => return None,
    };
    Some(node)
}

fn flush_loose(blocks: &mut Vec<Block>, loose: &mut Vec<Inline>) {
    if !loose.is_empty() {
        blocks.push(Block::Plain(trim_breaks(std::mem::take(loose))));
    }
}

fn trim_breaks(mut inlines: Vec<Inline>) -> Vec<Inline> {
    while matches!(
        inlines.last(),
        Some(Inline::Space | Inline::SoftBreak | Inline::LineBreak)
    ) {
        inlines.pop();
    }
    inlines
}

/// Append an inline, merging adjacent words and collapsing spaces.
fn push_inline(inlines: &mut Vec<Inline>, inline: Inline) {
    match (inlines.last_mut(), inline) {
        (Some(Inline::Str(last)), Inline::Str(next)) => last.push_str(&next),
        (Some(Inline::Space), Inline::Space) => {}
        (Some(Inline::SoftBreak | Inline::LineBreak), Inline::Space) => {}
        (Some(Inline::Space), Inline::SoftBreak) => {
            inlines.pop();
            inlines.push(Inline::SoftBreak);
        }
        (None, Inline::Space) => {}
        (_, inline) => inlines.push(inline),
    }
}

/// Split text into words and single spaces.
fn tokenize(text: &str) -> Vec<Inline> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !word.is_empty() {
                tokens.push(Inline::Str(std::mem::take(&mut word)));
            }
            tokens.push(Inline::Space);
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        tokens.push(Inline::Str(word));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(text: &str) -> Inline {
        Inline::Str(text.to_string())
    }

    #[test]
    fn test_paragraphs_and_rule() {
        assert_eq!(
            parse_blocks("Question\n\n---\n\n! hint\n\nAnswer"),
            vec![
                Block::Para(vec![s("Question")]),
                Block::Rule,
                Block::Para(vec![s("!"), Inline::Space, s("hint")]),
                Block::Para(vec![s("Answer")]),
            ]
        );
    }

    #[test]
    fn test_escaped_text_merges_into_words() {
        assert_eq!(
            parse_blocks(r"snake\_case \[x\]"),
            vec![Block::Para(vec![s("snake_case"), Inline::Space, s("[x]")])]
        );
    }

    #[test]
    fn test_tight_list_items_are_plain() {
        assert_eq!(
            parse_blocks("- one\n- two"),
            vec![Block::List {
                start: None,
                items: vec![
                    vec![Block::Plain(vec![s("one")])],
                    vec![Block::Plain(vec![s("two")])],
                ],
            }]
        );
    }

    #[test]
    fn test_loose_list_items_are_paragraphs() {
        let blocks = parse_blocks("3. one\n\n4. two");
        assert_eq!(
            blocks,
            vec![Block::List {
                start: Some(3),
                items: vec![
                    vec![Block::Para(vec![s("one")])],
                    vec![Block::Para(vec![s("two")])],
                ],
            }]
        );
    }

    #[test]
    fn test_image_with_title() {
        assert_eq!(
            parse_blocks("![the *alt*](pic.png \"abc\")"),
            vec![Block::Para(vec![Inline::Image {
                alt: vec![s("the"), Inline::Space, Inline::Emph(vec![s("alt")])],
                url: "pic.png".to_string(),
                title: "abc".to_string(),
            }])]
        );
    }

    #[test]
    fn test_code_block_and_math() {
        assert_eq!(
            parse_blocks("```py\nx = 1\n```\n\n$a_b$"),
            vec![
                Block::CodeBlock {
                    info: "py".to_string(),
                    text: "x = 1\n".to_string(),
                },
                Block::Para(vec![Inline::Math {
                    display: false,
                    text: "a_b".to_string(),
                }]),
            ]
        );
    }

    #[test]
    fn test_unknown_containers_splice_into_parent() {
        // Tables are not enabled, so only plain paragraphs come out; nothing is lost.
        let blocks = parse_blocks("a | b\n--|--\n1 | 2");
        assert!(!blocks.is_empty());
    }
}
