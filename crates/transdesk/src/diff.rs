//! Line diff between a source document and its translation.
//!
//! Lines are aligned by longest common subsequence. Where a block of removed
//! lines is followed by added lines they are paired up as replacements and
//! carry a word-level diff.

use std::cmp::Reverse;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTag {
    Equal,
    Delete,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordChange {
    pub tag: ChangeTag,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiffLine {
    Equal { text: String },
    Delete { text: String },
    Insert { text: String },
    Replace {
        old: String,
        new: String,
        words: Vec<WordChange>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub equal: usize,
    pub deleted: usize,
    pub inserted: usize,
    pub replaced: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextDiff {
    pub lines: Vec<DiffLine>,
}

impl TextDiff {
    pub fn is_identical(&self) -> bool {
        self.lines
            .iter()
            .all(|line| matches!(line, DiffLine::Equal { .. }))
    }

    pub fn stats(&self) -> DiffStats {
        self.lines
            .iter()
            .fold(DiffStats::default(), |mut stats, line| {
                match line {
                    DiffLine::Equal { .. } => stats.equal += 1,
                    DiffLine::Delete { .. } => stats.deleted += 1,
                    DiffLine::Insert { .. } => stats.inserted += 1,
                    DiffLine::Replace { .. } => stats.replaced += 1,
                }
                stats
            })
    }

    /// One line per entry, prefixed with `' '`, `-` or `+`. A replacement
    /// renders as its old line followed by its new line.
    pub fn render_unified(&self) -> String {
        let mut out = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            match line {
                DiffLine::Equal { text } => out.push(format!(" {}", text)),
                DiffLine::Delete { text } => out.push(format!("-{}", text)),
                DiffLine::Insert { text } => out.push(format!("+{}", text)),
                DiffLine::Replace { old, new, .. } => {
                    out.push(format!("-{}", old));
                    out.push(format!("+{}", new));
                }
            }
        }
        out.join("\n")
    }
}

/// Diffs `source` against `translated`; a missing translation diffs as empty text.
pub fn diff(source: &str, translated: Option<&str>) -> TextDiff {
    let old: Vec<&str> = source.lines().collect();
    let new: Vec<&str> = translated.unwrap_or("").lines().collect();

    let mut lines = Vec::new();
    let mut deleted: Vec<&str> = Vec::new();
    let mut inserted: Vec<&str> = Vec::new();

    for op in align(&old, &new) {
        match op {
            Op::Equal(i, _) => {
                flush_changes(&mut lines, &mut deleted, &mut inserted);
                lines.push(DiffLine::Equal {
                    text: old[i].to_string(),
                });
            }
            Op::Delete(i) => deleted.push(old[i]),
            Op::Insert(j) => inserted.push(new[j]),
        }
    }
    flush_changes(&mut lines, &mut deleted, &mut inserted);

    TextDiff { lines }
}

/// Emits a pending change block, pairing removed and added lines in order.
fn flush_changes(lines: &mut Vec<DiffLine>, deleted: &mut Vec<&str>, inserted: &mut Vec<&str>) {
    let paired = deleted.len().min(inserted.len());
    for (old, new) in deleted.iter().zip(inserted.iter()) {
        lines.push(DiffLine::Replace {
            old: old.to_string(),
            new: new.to_string(),
            words: diff_words(old, new),
        });
    }
    for old in &deleted[paired..] {
        lines.push(DiffLine::Delete {
            text: old.to_string(),
        });
    }
    for new in &inserted[paired..] {
        lines.push(DiffLine::Insert {
            text: new.to_string(),
        });
    }
    deleted.clear();
    inserted.clear();
}

/// Word-level changes between two lines; adjacent changes with the same tag merge.
pub fn diff_words(old: &str, new: &str) -> Vec<WordChange> {
    let a = tokenize(old);
    let b = tokenize(new);

    let mut changes: Vec<WordChange> = Vec::new();
    for op in align(&a, &b) {
        let (tag, text) = match op {
            Op::Equal(i, _) => (ChangeTag::Equal, a[i]),
            Op::Delete(i) => (ChangeTag::Delete, a[i]),
            Op::Insert(j) => (ChangeTag::Insert, b[j]),
        };
        match changes.last_mut() {
            Some(last) if last.tag == tag => last.text.push_str(text),
            _ => changes.push(WordChange {
                tag,
                text: text.to_string(),
            }),
        }
    }
    changes
}

/// Splits into ASCII word runs, whitespace runs and single other characters,
/// so CJK text diffs per character.
fn tokenize(line: &str) -> Vec<&str> {
    #[derive(PartialEq)]
    enum Class {
        Word,
        Space,
        Other,
    }
    let class = |c: char| {
        if c.is_ascii_alphanumeric() || c == '_' {
            Class::Word
        } else if c.is_whitespace() {
            Class::Space
        } else {
            Class::Other
        }
    };

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<Class> = None;
    for (idx, c) in line.char_indices() {
        let next = class(c);
        let continues = matches!((&current, &next), (Some(prev), n) if prev == n && *n != Class::Other);
        if !continues && idx > start {
            tokens.push(&line[start..idx]);
            start = idx;
        }
        current = Some(next);
    }
    if start < line.len() {
        tokens.push(&line[start..]);
    }
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Largest middle section, in compared pairs, aligned item by item. Anything
/// bigger diffs as one change block.
const MAX_ALIGN_PAIRS: usize = 25_000_000;

/// LCS alignment. Common prefix and suffix are matched first; the rest is
/// aligned in linear space.
fn align<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Op> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    let (n, m) = (a_mid.len(), b_mid.len());

    let mut ops: Vec<Op> = (0..prefix).map(|k| Op::Equal(k, k)).collect();
    if n.checked_mul(m).is_some_and(|pairs| pairs <= MAX_ALIGN_PAIRS) {
        hirschberg(a_mid, b_mid, prefix, prefix, &mut ops);
    } else {
        log::debug!("Diffing {} against {} items as a single change block", n, m);
        ops.extend((0..n).map(|k| Op::Delete(prefix + k)));
        ops.extend((0..m).map(|k| Op::Insert(prefix + k)));
    }
    ops.extend((0..suffix).map(|k| Op::Equal(prefix + n + k, prefix + m + k)));
    ops
}

/// Hirschberg's divide and conquer: split `a` in half, find where the halves'
/// LCS lengths meet in `b`, recurse on both sides. Deletions are placed
/// before insertions when the split is ambiguous.
fn hirschberg<T: PartialEq>(a: &[T], b: &[T], a_off: usize, b_off: usize, ops: &mut Vec<Op>) {
    match (a.len(), b.len()) {
        (0, m) => ops.extend((0..m).map(|j| Op::Insert(b_off + j))),
        (n, 0) => ops.extend((0..n).map(|i| Op::Delete(a_off + i))),
        (1, m) => match b.iter().position(|y| *y == a[0]) {
            Some(j) => {
                ops.extend((0..j).map(|k| Op::Insert(b_off + k)));
                ops.push(Op::Equal(a_off, b_off + j));
                ops.extend((j + 1..m).map(|k| Op::Insert(b_off + k)));
            }
            None => {
                ops.push(Op::Delete(a_off));
                ops.extend((0..m).map(|k| Op::Insert(b_off + k)));
            }
        },
        (n, m) => {
            let mid = n / 2;
            let forward = lcs_lengths(a[..mid].iter(), b.iter(), m);
            let backward = lcs_lengths(a[mid..].iter().rev(), b.iter().rev(), m);
            let split = (0..=m)
                .max_by_key(|&k| (forward[k] + backward[m - k], Reverse(k)))
                .unwrap_or(0);

            hirschberg(&a[..mid], &b[..split], a_off, b_off, ops);
            hirschberg(&a[mid..], &b[split..], a_off + mid, b_off + split, ops);
        }
    }
}

/// Last row of the LCS length table of `a` against every prefix of `b`.
fn lcs_lengths<'a, T, A, B>(a: A, b: B, m: usize) -> Vec<u32>
where
    T: PartialEq + 'a,
    A: Iterator<Item = &'a T>,
    B: Iterator<Item = &'a T> + Clone,
{
    let mut previous = vec![0u32; m + 1];
    let mut current = vec![0u32; m + 1];
    for x in a {
        for (j, y) in b.clone().enumerate() {
            current[j + 1] = if x == y {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous
}
