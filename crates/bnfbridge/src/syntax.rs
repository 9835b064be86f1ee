//! Line-oriented parser of grammar descriptions.
//!
//! Every non-empty line holds one rule and ends with `;`:
//!
//! ```text
//! comment "--" ;
//! token Name (letter)+ ;
//! entrypoints Program, Exp ;
//! rules Bool ::= "true" | "false" ;
//! EAdd. Exp ::= Exp "+" Exp1 ;
//! ```

use crate::{
    grammar::{Constructor, Elem, Entrypoint, GrammarError, Rule, Token},
    names::{is_ident_shaped, verify_ident},
};

/// Keywords of lines that only configure the native lexer and parser.
const IGNORED_KEYWORDS: &[&str] = &["comment", "terminator", "separator", "coercions"];

/// Labels of coercions and list rules, which get no native discriminant.
const IGNORED_LABELS: &[&str] = &["_", "[]", "(:)", "(:[])"];

pub fn parse(source: &str) -> Result<Vec<Rule>, GrammarError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut rules = vec![];
    let mut has_entrypoints = false;

    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        tracing::trace!("line: {:?}", line);

        let body = line
            .strip_suffix(';')
            .ok_or_else(|| GrammarError::parsing_failed("missing terminating `;'", line))?;
        let (keyword, rest) = match body.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (body.trim(), ""),
        };

        match keyword {
            kw if IGNORED_KEYWORDS.contains(&kw) => continue,
            "token" => rules.push(parse_token(rest, line)?),
            "entrypoints" => {
                if has_entrypoints {
                    return Err(GrammarError::parsing_failed(
                        "more than one `entrypoints' declaration",
                        line,
                    ));
                }
                has_entrypoints = true;
                rules.push(parse_entrypoints(rest, line)?);
            }
            "rules" => rules.extend(parse_rules(rest, line)?),
            _ => rules.extend(parse_constructor(body, line)?),
        }
    }

    Ok(rules)
}

fn is_comment(line: &str) -> bool {
    line.starts_with("--") || (line.starts_with("{-") && line.ends_with("-}"))
}

fn parse_token(rest: &str, line: &str) -> Result<Rule, GrammarError> {
    let name = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| GrammarError::parsing_failed("missing token name", line))?;
    let ty = clean_type(name);
    verify_type(&ty, line)?;
    Ok(Rule::Token(Token { ty }))
}

fn parse_entrypoints(rest: &str, line: &str) -> Result<Rule, GrammarError> {
    let types: Vec<String> = rest
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(clean_type)
        .collect();
    if types.is_empty() {
        return Err(GrammarError::parsing_failed("empty entrypoints", line));
    }
    for ty in &types {
        verify_elem(ty, line)?;
    }
    Ok(Rule::Entrypoint(Entrypoint { types }))
}

/// `rules T ::= a | b | ... ;` expands to one constructor per alternative,
/// labeled `T_a`, `T_b` and so on.
fn parse_rules(rest: &str, line: &str) -> Result<Vec<Rule>, GrammarError> {
    let (left, right) = rest
        .split_once("::=")
        .ok_or_else(|| GrammarError::parsing_failed("missing `::='", line))?;
    let ty = clean_type(left.trim());
    verify_type(&ty, line)?;

    let symbols = symbols(right).map_err(|msg| GrammarError::parsing_failed(msg, line))?;
    let mut rules = vec![];
    for alternative in symbols.split(|s| *s == Symbol::Bar) {
        let symbol = match alternative {
            [symbol] => symbol,
            [] => {
                return Err(GrammarError::parsing_failed(
                    "empty alternative in `rules'",
                    line,
                ))
            }
            _ => {
                return Err(GrammarError::parsing_failed(
                    "an alternative in `rules' must be a single symbol",
                    line,
                ))
            }
        };
        let (text, construction) = match *symbol {
            Symbol::Terminal(text) => (text, vec![]),
            Symbol::Nonterminal(word) => {
                let elem = clean_type(word);
                verify_elem(&elem, line)?;
                (word, vec![elem])
            }
            Symbol::Bar => unreachable!(),
        };
        rules.push(Rule::Constructor(Constructor {
            label: format!("{}_{}", ty, text),
            ty: ty.clone(),
            construction,
        }));
    }

    Ok(rules)
}

/// `Label . Type ::= construction ;`
fn parse_constructor(body: &str, line: &str) -> Result<Option<Rule>, GrammarError> {
    let (label, rest) = body
        .split_once('.')
        .ok_or_else(|| GrammarError::parsing_failed("missing `.' after the label", line))?;
    let (ty, construction) = rest
        .split_once("::=")
        .ok_or_else(|| GrammarError::parsing_failed("missing `::='", line))?;

    let label = clean_label(label);
    if IGNORED_LABELS.contains(&label) {
        return Ok(None);
    }
    if !is_ident_shaped(label) {
        return Err(GrammarError::parsing_failed(
            format!("invalid label `{}'", label),
            line,
        ));
    }

    let ty = clean_type(ty.trim());
    verify_type(&ty, line)?;

    let construction = clean_construction(construction, line)?;

    Ok(Some(Rule::Constructor(Constructor {
        label: label.to_owned(),
        ty,
        construction,
    })))
}

/// Strip the `internal` marker.
fn clean_label(label: &str) -> &str {
    let label = label.trim();
    match label.strip_prefix("internal") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => label,
    }
}

/// Strip the precedence digits, also inside a list form.
fn clean_type(name: &str) -> String {
    match name.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) => format!("[{}]", clean_type(inner.trim())),
        None => name.trim_end_matches(|ch: char| ch.is_ascii_digit()).to_owned(),
    }
}

/// Drop the terminals, keeping the nonterminal names in order.
fn clean_construction(construction: &str, line: &str) -> Result<Vec<String>, GrammarError> {
    let symbols = symbols(construction).map_err(|msg| GrammarError::parsing_failed(msg, line))?;
    let mut elems = vec![];
    for symbol in symbols {
        match symbol {
            Symbol::Terminal(..) => continue,
            Symbol::Nonterminal(word) => {
                let elem = clean_type(word);
                verify_elem(&elem, line)?;
                elems.push(elem);
            }
            Symbol::Bar => {
                return Err(GrammarError::parsing_failed(
                    "unexpected `|' in a constructor rule",
                    line,
                ))
            }
        }
    }
    Ok(elems)
}

fn verify_type(ty: &str, line: &str) -> Result<(), GrammarError> {
    if verify_ident(ty) {
        Ok(())
    } else {
        Err(GrammarError::parsing_failed(
            format!("invalid category name `{}'", ty),
            line,
        ))
    }
}

fn verify_elem(elem: &str, line: &str) -> Result<(), GrammarError> {
    match Elem::classify(elem) {
        Elem::Builtin(..) => Ok(()),
        Elem::Named(name) => verify_type(name, line),
        Elem::List(inner) => verify_elem(inner, line),
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Symbol<'a> {
    /// A quoted literal, without the quotes.
    Terminal(&'a str),
    Nonterminal(&'a str),
    Bar,
}

/// Split the right-hand side of a rule into symbols.
fn symbols(s: &str) -> Result<Vec<Symbol<'_>>, &'static str> {
    let mut symbols = vec![];
    let mut chars = s.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        match ch {
            ch if ch.is_whitespace() => continue,
            '|' => symbols.push(Symbol::Bar),
            '"' => {
                let mut end = None;
                while let Some((i, ch)) = chars.next() {
                    match ch {
                        '\\' => {
                            chars.next();
                        }
                        '"' => {
                            end = Some(i);
                            break;
                        }
                        _ => (),
                    }
                }
                let end = end.ok_or("unterminated string literal")?;
                symbols.push(Symbol::Terminal(&s[start + 1..end]));
            }
            _ => {
                let mut end = s.len();
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_whitespace() || ch == '"' || ch == '|' {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                symbols.push(Symbol::Nonterminal(&s[start..end]));
            }
        }
    }
    Ok(symbols)
}
