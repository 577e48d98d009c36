/// Rewrites LaTeX bracket delimiters into dollar delimiters.
///
/// `\(…\)` becomes `$…$` and `\[…\]` becomes `$$…$$`. Text inside fenced
/// code blocks (```` ``` ```` or `~~~`) and inline code spans is left
/// untouched. A doubled backslash is an escaped backslash, not a delimiter.
pub fn rewrite_math_delimiters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prose = String::new();
    let mut fence: Option<Fence> = None;

    for line in text.split_inclusive('\n') {
        match (fence, Fence::parse(line)) {
            (None, Some(opening)) => {
                rewrite_prose(&prose, &mut out);
                prose.clear();
                fence = Some(opening);
                out.push_str(line);
            }
            (Some(open), Some(closing)) if closing.closes(open, line) => {
                fence = None;
                out.push_str(line);
            }
            (Some(_), _) => out.push_str(line),
            (None, None) => prose.push_str(line),
        }
    }
    rewrite_prose(&prose, &mut out);
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn parse(line: &str) -> Option<Fence> {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent > 3 {
            return None;
        }
        let rest = &line[indent..];
        let marker = rest.chars().next().filter(|&c| matches!(c, '`' | '~'))?;
        let len = rest.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Fence { marker, len })
    }

    /// A closing fence uses the same marker, is at least as long and has
    /// nothing but whitespace after it.
    fn closes(self, open: Fence, line: &str) -> bool {
        let trailing = line.trim_start_matches(' ').trim_start_matches(self.marker);
        self.marker == open.marker && self.len >= open.len && trailing.trim().is_empty()
    }
}

fn rewrite_prose(prose: &str, out: &mut String) {
    let chars: Vec<char> = prose.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '`' => {
                let run = backtick_run(&chars, i);
                match find_closing_run(&chars, i + run, run) {
                    Some(close) => {
                        out.extend(&chars[i..close + run]);
                        i = close + run;
                    }
                    None => {
                        out.extend(&chars[i..i + run]);
                        i += run;
                    }
                }
            }
            '\\' => match chars.get(i + 1) {
                Some('(') | Some(')') => {
                    out.push('$');
                    i += 2;
                }
                Some('[') | Some(']') => {
                    out.push_str("$$");
                    i += 2;
                }
                Some('\\') => {
                    out.push_str("\\\\");
                    i += 2;
                }
                _ => {
                    out.push('\\');
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
}

fn backtick_run(chars: &[char], start: usize) -> usize {
    chars[start..].iter().take_while(|c| **c == '`').count()
}

/// Index of the next backtick run of exactly `len` at or after `from`.
fn find_closing_run(chars: &[char], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        if chars[i] == '`' {
            let run = backtick_run(chars, i);
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}
