//! Text patching: apply one correction to the document and clean up the
//! spacing artifacts that spliced fragments leave behind.

use regex::Regex;

/// Result of applying one correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub text: String,
    /// Whether the pattern matched; an unmatched patch leaves the text as is.
    pub matched: bool,
}

/// Replace the leftmost match of `pattern` in `text` with `replacement`.
///
/// The replacement is inserted literally (`$` is not a group reference).
/// A successful replacement is followed by [`normalize_spacing`].
pub fn apply_patch(text: &str, pattern: &Regex, replacement: &str) -> PatchOutcome {
    let Some(found) = pattern.find(text) else {
        return PatchOutcome {
            text: text.to_string(),
            matched: false,
        };
    };
    let mut patched = String::with_capacity(text.len() + replacement.len());
    patched.push_str(&text[..found.start()]);
    patched.push_str(replacement);
    patched.push_str(&text[found.end()..]);
    PatchOutcome {
        text: normalize_spacing(&patched),
        matched: true,
    }
}

/// Collapse runs of spaces and separate `.`/`,` glued between two words.
///
/// `word.Word` becomes `word. Word` and `a,b` becomes `a, b`.
///
/// Deviation from the plain letter/digit rule: a separator with an ASCII
/// digit on both sides is never split, so decimals and grouped numbers
/// (`3.5`, `1,000`) survive. Mixed pairs such as `750.Apply` are still split.
pub fn normalize_spacing(text: &str) -> String {
    use std::sync::LazyLock;
    static SPACE_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" {2,}").expect("space-run pattern"));

    let collapsed = SPACE_RUN_RE.replace_all(text, " ");
    let chars: Vec<char> = collapsed.chars().collect();
    let mut out = String::with_capacity(collapsed.len());
    for (index, &ch) in chars.iter().enumerate() {
        out.push(ch);
        if (ch != '.' && ch != ',') || index == 0 {
            continue;
        }
        let (Some(&prev), Some(&next)) = (chars.get(index - 1), chars.get(index + 1)) else {
            continue;
        };
        let glued = prev.is_alphanumeric() && next.is_alphanumeric();
        let numeric = prev.is_ascii_digit() && next.is_ascii_digit();
        if glued && !numeric {
            out.push(' ');
        }
    }
    out
}
