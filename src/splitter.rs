//! Section splitter: cuts a markdown document into a cover and note sections.
//!
//! The document is scanned once, line by line. Everything before the first
//! level-2 heading forms the cover (typically the `# Title` and its intro),
//! and every level-2 heading opens a new note section that runs until the
//! next one. Heading markers inside fenced code blocks, and inside raw HTML
//! blocks whose content is kept verbatim (`<pre>`, `<script>`, `<style>`,
//! `<textarea>`, comments), are ignored.

use serde::Serialize;

/// Which rendering unit a block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ordinal")]
pub enum BlockKind {
    /// Text preceding the first level-2 heading
    Cover,
    /// A level-2 section; the ordinal starts at 1 and has no gaps
    Section(usize),
}

impl BlockKind {
    /// File stem used for everything produced from this block (`cover`, `note_01`, ...)
    pub fn file_stem(&self) -> String {
        match self {
            BlockKind::Cover => "cover".to_string(),
            BlockKind::Section(n) => format!("note_{:02}", n),
        }
    }
}

/// A contiguous, heading-delimited excerpt of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    #[serde(flatten)]
    pub kind: BlockKind,
    pub text: String,
}

impl Block {
    /// Name of the PNG written for this block.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.kind.file_stem())
    }

    pub fn is_cover(&self) -> bool {
        self.kind == BlockKind::Cover
    }
}

/// An open fenced code block (```` ``` ```` or `~~~`).
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: u8,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Fence> {
        let rest = strip_indent(line)?;
        let marker = *rest.as_bytes().first()?;
        if marker != b'`' && marker != b'~' {
            return None;
        }
        let len = rest.bytes().take_while(|&b| b == marker).count();
        if len < 3 {
            return None;
        }
        // A backtick fence's info string may not contain backticks.
        if marker == b'`' && rest[len..].contains('`') {
            return None;
        }
        Some(Fence { marker, len })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let Some(rest) = strip_indent(line) else {
            return false;
        };
        let len = rest.bytes().take_while(|&b| b == self.marker).count();
        len >= self.len && rest[len..].trim().is_empty()
    }
}

const VERBATIM_TAGS: [(&str, &str); 4] = [
    ("pre", "</pre>"),
    ("script", "</script>"),
    ("style", "</style>"),
    ("textarea", "</textarea>"),
];

/// An open raw HTML block that runs until a line containing its end marker.
#[derive(Debug, Clone, Copy)]
struct HtmlBlock {
    end: &'static str,
}

impl HtmlBlock {
    /// Returns a block only if it stays open past `line`.
    fn open(line: &str) -> Option<HtmlBlock> {
        let rest = strip_indent(line)?;
        if let Some(body) = rest.strip_prefix("<!--") {
            return (!body.contains("-->")).then_some(HtmlBlock { end: "-->" });
        }
        let name = rest.strip_prefix('<')?;
        let (tag, end) = VERBATIM_TAGS.iter().copied().find(|(tag, _)| {
            name.get(..tag.len()).is_some_and(|head| head.eq_ignore_ascii_case(tag))
                && matches!(name.as_bytes().get(tag.len()), None | Some(b' ' | b'\t' | b'>' | b'\n' | b'\r'))
        })?;
        let block = HtmlBlock { end };
        (!block.is_closed_by(&name[tag.len()..])).then_some(block)
    }

    fn is_closed_by(&self, line: &str) -> bool {
        line.to_ascii_lowercase().contains(self.end)
    }
}

/// Content whose lines are never headings.
#[derive(Debug, Clone, Copy)]
enum Verbatim {
    Fence(Fence),
    Html(HtmlBlock),
}

impl Verbatim {
    fn open(line: &str) -> Option<Verbatim> {
        Fence::open(line)
            .map(Verbatim::Fence)
            .or_else(|| HtmlBlock::open(line).map(Verbatim::Html))
    }

    fn is_closed_by(&self, line: &str) -> bool {
        match self {
            Verbatim::Fence(fence) => fence.is_closed_by(line),
            Verbatim::Html(block) => block.is_closed_by(line),
        }
    }
}

/// Drop up to three leading spaces; four or more means an indented code line.
fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.bytes().take_while(|&b| b == b' ').count();
    if indent > 3 {
        None
    } else {
        Some(&line[indent..])
    }
}

/// ATX heading level of a line, if it is one.
///
/// `## Title`, `##`, and `  # Title` are headings; `##Title`, `\## Title`
/// and lines indented by four spaces are not.
pub fn heading_level(line: &str) -> Option<usize> {
    let rest = strip_indent(line)?;
    let level = rest.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    match rest[level..].bytes().next() {
        None | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => Some(level),
        _ => None,
    }
}

/// Split `text` into blocks: the cover first (if non-empty), then one block
/// per level-2 section in document order.
///
/// Blocks are trimmed and whitespace-only blocks are dropped before
/// section ordinals are assigned. A document without any level-2 heading
/// yields a single cover block.
pub fn split_document(text: &str) -> Vec<Block> {
    let mut cover = String::new();
    let mut sections: Vec<String> = Vec::new();
    let mut verbatim: Option<Verbatim> = None;

    for line in text.split_inclusive('\n') {
        let opens_section = match verbatim {
            Some(open) => {
                if open.is_closed_by(line) {
                    verbatim = None;
                }
                false
            }
            None => {
                verbatim = Verbatim::open(line);
                verbatim.is_none() && heading_level(line) == Some(2)
            }
        };

        if opens_section {
            sections.push(String::new());
        }
        match sections.last_mut() {
            Some(section) => section.push_str(line),
            None => cover.push_str(line),
        }
    }

    let mut blocks = Vec::with_capacity(sections.len() + 1);
    let cover = cover.trim();
    if !cover.is_empty() {
        blocks.push(Block {
            kind: BlockKind::Cover,
            text: cover.to_string(),
        });
    }

    let retained = sections
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    for (i, section) in retained.enumerate() {
        blocks.push(Block {
            kind: BlockKind::Section(i + 1),
            text: section.to_string(),
        });
    }

    blocks
}
