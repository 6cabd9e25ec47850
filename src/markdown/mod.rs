//! Structured markdown for two-page cards.
//!
//! A card document is parsed into a flat sequence of top-level [`Block`]s.
//! Exactly one top-level horizontal rule splits it into a question page and
//! an answer page. All orientation work happens on this tree, never on text:
//!
//! - [`Markdown::oriented`] swaps the pages for the backward card
//! - [`Markdown::maybe_prompted`] moves a `! prompt` paragraph to the question side
//! - [`Markdown::with_rewritten_images`] points images at uploaded attachments
//! - [`Markdown::as_mochi_md`] writes the Mochi dialect (`---` page breaks)
//!
//! Every transformation returns a new value, so the same parsed document can
//! be rendered in both orientations.

mod parse;
mod render;

use std::fmt;

use crate::error::{Error, Result};

/// Which side of a two-page document is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// First page is the question, second page the answer.
    Forward,
    /// Second page is the question, first page the answer.
    Backward,
}

impl Direction {
    /// Both directions, forward first.
    pub const ALL: [Self; 2] = [Self::Forward, Self::Backward];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}

/// Block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Inline content without paragraph spacing (tight list items).
    Plain(Vec<Inline>),
    Para(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock { info: String, text: String },
    BlockQuote(Vec<Block>),
    /// Ordered when `start` is set. Each item is its own block sequence.
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Html(String),
    /// Horizontal rule; at the top level this is the page divider.
    Rule,
}

/// Inline element. Text is tokenized into words and spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Str(String),
    Space,
    SoftBreak,
    LineBreak,
    Emph(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikeout(Vec<Inline>),
    Code(String),
    Math { display: bool, text: String },
    Link {
        content: Vec<Inline>,
        url: String,
        title: String,
        autolink: bool,
    },
    Image {
        alt: Vec<Inline>,
        url: String,
        title: String,
    },
    Html(String),
}

/// Parsed card document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markdown {
    pub body: Vec<Block>,
}

/// Literal first tokens that turn a paragraph into a prompt.
const PROMPT_MARKERS: [&str; 3] = ["!", "prompt:", "Prompt:"];

impl Markdown {
    /// Parse markdown text into a block tree.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            body: parse::parse_blocks(text),
        }
    }

    /// Serialize into Mochi's markdown dialect.
    ///
    /// Rules are always written as exactly `---`, Mochi's page break.
    #[must_use]
    pub fn as_mochi_md(&self) -> String {
        render::render_blocks(&self.body)
    }

    /// Split into question and answer pages at the single top-level rule.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` when there is no top-level rule or more than one.
    pub fn split_pages(&self) -> Result<(&[Block], &[Block])> {
        split_pages(&self.body)
    }

    /// Return this document asked in the given direction.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the pages cannot be split.
    pub fn oriented(&self, direction: Direction) -> Result<Self> {
        match direction {
            Direction::Forward => Ok(self.clone()),
            Direction::Backward => self.reversed(),
        }
    }

    /// Swap the pages: answer first, then the divider, then the question.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the pages cannot be split.
    pub fn reversed(&self) -> Result<Self> {
        let (first, second) = self.split_pages()?;
        Ok(Self {
            body: join_pages(second.to_vec(), first.to_vec()),
        })
    }

    /// Whether the answer page carries a prompt, i.e. a backward card exists.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the pages cannot be split or the answer
    /// page has more than one prompt.
    pub fn has_reverse_prompt(&self) -> Result<bool> {
        let (_, answer) = self.split_pages()?;
        Ok(single_prompt(answer)?.is_some())
    }

    /// Apply prompt scaffolding for display.
    ///
    /// A prompt on the answer page is dropped. A prompt on the question page
    /// replaces that page with the prompt text as a single emphasized paragraph.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the pages cannot be split or a page has
    /// more than one prompt.
    pub fn maybe_prompted(&self) -> Result<Self> {
        let (question, answer) = self.split_pages()?;
        single_prompt(answer)?;

        let question = match single_prompt(question)? {
            Some(prompt) => vec![Block::Para(vec![Inline::Emph(prompt.to_vec())])],
            None => question.to_vec(),
        };
        let answer = answer
            .iter()
            .filter(|block| match_prompt(block).is_none())
            .cloned()
            .collect();

        Ok(Self {
            body: join_pages(question, answer),
        })
    }

    /// Replace every image target, in document order, with what `collect`
    /// returns for it as `(url, title)`.
    ///
    /// Images that already point somewhere remote are left alone.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `collect`.
    pub fn with_rewritten_images<F>(&self, mut collect: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<(String, String)>,
    {
        let mut body = self.body.clone();
        for block in &mut body {
            rewrite_block(block, &mut collect)?;
        }
        Ok(Self { body })
    }
}

/// Split blocks at the one top-level rule.
///
/// # Errors
///
/// Returns `MalformedDocument` with an empty path; callers that know the
/// document path attach it.
pub fn split_pages(blocks: &[Block]) -> Result<(&[Block], &[Block])> {
    let rules: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| **block == Block::Rule)
        .map(|(i, _)| i)
        .collect();

    match rules.as_slice() {
        [split] => Ok((&blocks[..*split], &blocks[split + 1..])),
        [] => Err(Error::malformed("", "no page divider (---) found")),
        _ => Err(Error::malformed(
            "",
            format!("expected one page divider (---), found {}", rules.len()),
        )),
    }
}

/// Inline prompt body if `block` is a prompt paragraph.
///
/// A prompt is a paragraph whose first two tokens are one of `!`, `prompt:`
/// or `Prompt:` followed by a space.
#[must_use]
pub fn match_prompt(block: &Block) -> Option<&[Inline]> {
    let Block::Para(inlines) = block else {
        return None;
    };
    match inlines.as_slice() {
        [Inline::Str(marker), Inline::Space, rest @ ..]
            if PROMPT_MARKERS.contains(&marker.as_str()) =>
        {
            Some(rest)
        }
        _ => None,
    }
}

fn single_prompt(page: &[Block]) -> Result<Option<&[Inline]>> {
    let prompts: Vec<&[Inline]> = page.iter().filter_map(match_prompt).collect();
    match prompts.as_slice() {
        [] => Ok(None),
        [prompt] => Ok(Some(prompt)),
        _ => Err(Error::malformed(
            "",
            format!("expected at most one prompt per page, found {}", prompts.len()),
        )),
    }
}

fn join_pages(mut first: Vec<Block>, second: Vec<Block>) -> Vec<Block> {
    first.push(Block::Rule);
    first.extend(second);
    first
}

/// Whether an image target refers to a file next to the document.
#[must_use]
pub fn is_local_target(url: &str) -> bool {
    !(url.is_empty()
        || url.starts_with("@media/")
        || url.starts_with("data:")
        || url.contains("://"))
}

fn rewrite_block<F>(block: &mut Block, collect: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Result<(String, String)>,
{
    match block {
        Block::Plain(inlines) | Block::Para(inlines) | Block::Heading { content: inlines, .. } => {
            rewrite_inlines(inlines, collect)
        }
        Block::BlockQuote(blocks) => blocks.iter_mut().try_for_each(|b| rewrite_block(b, collect)),
        Block::List { items, .. } => items
            .iter_mut()
            .flatten()
            .try_for_each(|b| rewrite_block(b, collect)),
        Block::CodeBlock { .. } | Block::Html(_) | Block::Rule => Ok(()),
    }
}

fn rewrite_inlines<F>(inlines: &mut [Inline], collect: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Result<(String, String)>,
{
    for inline in inlines {
        match inline {
            Inline::Image { url, title, .. } => {
                if is_local_target(url) {
                    let (remote, hash) = collect(url)?;
                    *url = remote;
                    *title = hash;
                }
            }
            Inline::Emph(children)
            | Inline::Strong(children)
            | Inline::Strikeout(children)
            | Inline::Link { content: children, .. } => rewrite_inlines(children, collect)?,
            Inline::Str(_)
            | Inline::Space
            | Inline::SoftBreak
            | Inline::LineBreak
            | Inline::Code(_)
            | Inline::Math { .. }
            | Inline::Html(_) => {}
        }
    }
    Ok(())
}
