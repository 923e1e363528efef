/// A complete `##XXXXXX` tag found in the text. `start`/`end` are byte
/// offsets of the whole marker including the `##` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub id: String,
    pub start: usize,
    pub end: usize,
}

/// Outcome of one pass over the text: every complete tag in order of
/// appearance, plus the trailing partial id (0 to 5 word characters
/// running to the end of input), if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub complete: Vec<TagToken>,
    pub partial: Option<String>,
}

const ID_LEN: usize = 6;

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn word_run_end(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut end = from;
    while end < bytes.len() && is_word_char(bytes[end]) {
        end += 1;
    }
    end
}

// True when the character at pos closes a tag: end of input or whitespace.
fn closes_tag(text: &str, pos: usize) -> bool {
    match text[pos..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace(),
    }
}

/// Scan `text` for prompt tag markers.
///
/// A complete tag is `##` followed by exactly six word characters
/// (ASCII alphanumerics or `_`) ending at whitespace or end of input.
/// Runs of seven or more word characters match nothing. A candidate that
/// fails resumes scanning one character later, so `###ABC123` still yields
/// `ABC123`. A matched tag is consumed whole and never rescanned.
///
/// The partial is the word run after the last `##` when that run extends
/// to the end of input with at most five characters.
pub fn scan(text: &str) -> ScanResult {
    let mut complete = Vec::new();
    let mut i = 0;

    while let Some(rel) = text[i..].find("##") {
        let start = i + rel;
        let run_start = start + 2;
        let run_end = word_run_end(text, run_start);

        if run_end - run_start == ID_LEN && closes_tag(text, run_end) {
            complete.push(TagToken {
                id: text[run_start..run_end].to_string(),
                start,
                end: run_end,
            });
            i = run_end;
        } else {
            i = start + 1;
        }
    }

    let partial = text.rfind("##").and_then(|start| {
        let run_start = start + 2;
        let run_end = word_run_end(text, run_start);
        let len = run_end - run_start;
        if run_end == text.len() && len < ID_LEN {
            Some(text[run_start..].to_string())
        } else {
            None
        }
    });

    ScanResult { complete, partial }
}
