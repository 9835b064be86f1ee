//! Reindentation of generated code.

const INDENT_WIDTH: usize = 4;

/// Reindent `source` by counting braces.
///
/// Each line is prefixed by the current brace depth. A line starting with a
/// closing brace is emitted one level shallower, as is a `case`/`default`
/// label, which does not change the depth of the following lines.
///
/// Braces inside literals and comments are counted as well.
pub fn reindent(source: &str) -> String {
    let mut out = String::with_capacity(source.len() * 2);
    let mut depth: usize = 0;

    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() {
            out.push('\n');
            continue;
        }

        let mut delta = brace_delta(line);
        if line.starts_with('}') {
            depth = depth.saturating_sub(1);
            delta += 1;
        }

        let level = if is_case_label(line) {
            depth.saturating_sub(1)
        } else {
            depth
        };
        out.extend(std::iter::repeat(' ').take(level * INDENT_WIDTH));
        out.push_str(line);
        out.push('\n');

        depth = depth.saturating_add_signed(delta);
    }

    out
}

fn brace_delta(line: &str) -> isize {
    line.chars().fold(0, |delta, ch| match ch {
        '{' => delta + 1,
        '}' => delta - 1,
        _ => delta,
    })
}

fn is_case_label(line: &str) -> bool {
    (line.starts_with("case ") || line.starts_with("default")) && line.ends_with(':')
}
