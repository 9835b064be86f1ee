//! Identifier handling for generated Rust code.

use crate::grammar::Constructor;
use crate::types::{Map, Set};

/// Check whether `s` is usable as a Rust identifier.
pub fn verify_ident(s: &str) -> bool {
    if is_strict_keyword(s) || is_reserved(s) {
        // Reserved keyword specified.
        return false;
    }
    is_ident_shaped(s)
}

/// Check whether `s` has the lexical shape of an identifier, keywords included.
pub fn is_ident_shaped(s: &str) -> bool {
    if s.is_empty() || s == "_" {
        // The identifier must not be empty.
        return false;
    }

    let mut chars = s.chars();
    let first = chars.next().unwrap_or('0');
    if !is_ident_start(first) {
        // The identifier must be started with XID-Start.
        return false;
    }
    if chars.any(|ch| !is_ident_continue(ch)) {
        // The idenfier must be continued with XID-Continue.
        return false;
    }

    true
}

/// Convert a category name into the `snake_case` form used in function names.
///
/// `ListExp` becomes `list_exp`, `HTTPHeader` becomes `http_header`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |c| c.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }
    out
}

/// Compute the enum variant names for the constructors of the category `ty`,
/// in the same order.
///
/// The category name is stripped from the front of each label together with
/// a following underscore, so that `Exp_plus` in `Exp` becomes `Plus`.
/// Labels whose stripped names collide keep their whole label, and a label
/// that still collides gets its position appended (`ExpAdd_2`).
pub fn case_names(ty: &str, rules: &[&Constructor]) -> Vec<String> {
    let stripped: Vec<String> = rules
        .iter()
        .map(|rule| case_name(strip_category(&rule.label, ty)))
        .collect();

    let mut counts: Map<&str, usize> = Map::default();
    for name in &stripped {
        *counts.entry(name.as_str()).or_default() += 1;
    }

    let mut names: Vec<String> = rules
        .iter()
        .zip(&stripped)
        .map(|(rule, name)| match counts[name.as_str()] {
            1 => name.clone(),
            _ => case_name(&rule.label),
        })
        .collect();

    // 元のラベルに戻しても重複する場合は位置で区別する
    let mut taken: Set<String> = names.iter().cloned().collect();
    for i in 0..names.len() {
        if names[..i].contains(&names[i]) {
            let mut name = format!("{}_{}", names[i], i);
            while taken.contains(&name) {
                name.push('_');
            }
            taken.insert(name.clone());
            names[i] = name;
        }
    }
    names
}

fn strip_category<'a>(label: &'a str, ty: &str) -> &'a str {
    let rest = match label.strip_prefix(ty) {
        Some(rest) if rest.starts_with(|ch: char| !ch.is_lowercase()) => rest,
        _ => label,
    };
    let rest = rest.strip_prefix('_').unwrap_or(rest);
    match rest.chars().next() {
        Some(ch) if !ch.is_ascii_digit() && ch != '_' => rest,
        _ => label,
    }
}

fn case_name(label: &str) -> String {
    let mut name = String::with_capacity(label.len());
    for ch in label.chars() {
        if is_ident_continue(ch) {
            name.push(ch);
        } else {
            name.push_str(&symbol_name(ch));
        }
    }

    let mut chars = name.chars();
    let mut name = match chars.next() {
        Some(first) if is_ident_start(first) => first.to_uppercase().chain(chars).collect(),
        _ => format!("V{}", name),
    };
    if is_strict_keyword(&name) || is_reserved(&name) {
        name.push('_');
    }
    name
}

fn symbol_name(ch: char) -> String {
    let name = match ch {
        '+' => "Plus",
        '-' => "Minus",
        '*' => "Star",
        '/' => "Slash",
        '%' => "Percent",
        '=' => "Eq",
        '<' => "Lt",
        '>' => "Gt",
        '!' => "Bang",
        '&' => "Amp",
        '|' => "Bar",
        '^' => "Caret",
        '~' => "Tilde",
        '?' => "Question",
        ':' => "Colon",
        ';' => "Semi",
        ',' => "Comma",
        '.' => "Dot",
        '@' => "At",
        '#' => "Hash",
        '$' => "Dollar",
        '(' => "LParen",
        ')' => "RParen",
        '[' => "LBracket",
        ']' => "RBracket",
        '{' => "LBrace",
        '}' => "RBrace",
        ' ' => "_",
        _ => return format!("U{:04X}", ch as u32),
    };
    name.to_owned()
}

fn is_ident_start(ch: char) -> bool {
    unicode_ident::is_xid_start(ch)
}

fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}

fn is_strict_keyword(s: &str) -> bool {
    matches!(
        s,
        "as" | "break" | "const" | "continue" | "crate" | "else" | "enum" | "extern"
        | "false" | "fn" | "for" | "if" | "impl" | "in" | "let" | "loop" | "match" | "mod"
        | "move" | "mut" | "pub" | "ref" | "return" | "self" | "Self" | "static" | "struct"
        | "super" | "trait" | "true" | "type" | "unsafe" | "use" | "where" | "while"
        // since Rust 2018
        | "async" | "await" | "dyn"
    )
}

fn is_reserved(s: &str) -> bool {
    matches!(
        s,
        "abstract" | "become" | "box" | "do" | "final" | "macro" | "override" | "priv"
        | "typeof" | "unsized" | "virtual" | "yield"
        // since Rust 2018
        | "try"
    )
}
