//! Grammar rule model.

use crate::types::{Map, Set};
use std::{fmt, fs, io, path::Path};

/// The built-in identifier category, never declared explicitly in a grammar.
pub const IDENT: &str = "Ident";

/// Built-in scalar categories.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Builtin {
    Integer,
    Double,
    String,
    Char,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Integer" => Some(Self::Integer),
            "Double" => Some(Self::Double),
            "String" => Some(Self::String),
            "Char" => Some(Self::Char),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Double => "Double",
            Self::String => "String",
            Self::Char => "Char",
        }
    }

    /// The Rust type used in the abstract syntax.
    pub fn rust_type(self) -> &'static str {
        match self {
            Self::Integer => "i64",
            Self::Double => "f64",
            Self::String => "String",
            Self::Char => "char",
        }
    }

    /// Whether the native representation of this scalar is a pointer.
    pub fn is_pointer(self) -> bool {
        matches!(self, Self::String)
    }
}

/// Classified view of an element name in a construction or entrypoint list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Elem<'a> {
    Builtin(Builtin),
    Named(&'a str),
    /// `[T]`, carrying the inner element name `T`.
    List(&'a str),
}

impl<'a> Elem<'a> {
    pub fn classify(name: &'a str) -> Self {
        match name.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(inner) => Elem::List(inner),
            None => Builtin::from_name(name).map_or(Elem::Named(name), Elem::Builtin),
        }
    }

    /// The name of the generated type, e.g. `Integer`, `Exp` or `ListExp`.
    pub fn type_name(&self) -> String {
        match self {
            Elem::Builtin(b) => b.name().to_owned(),
            Elem::Named(name) => (*name).to_owned(),
            Elem::List(inner) => format!("List{}", Elem::classify(inner).type_name()),
        }
    }

    /// Whether `ty` is mentioned by this element, directly or inside a list.
    pub fn mentions(&self, ty: &str) -> bool {
        match self {
            Elem::Builtin(b) => b.name() == ty,
            Elem::Named(name) => *name == ty,
            Elem::List(inner) => Elem::classify(inner).mentions(ty),
        }
    }
}

/// A labeled production of a grammar category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub label: String,
    pub ty: String,
    pub construction: Vec<String>,
}

/// A lexical category whose values are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ty: String,
}

/// The categories valid as top-level parse targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Constructor(Constructor),
    Token(Token),
    Entrypoint(Entrypoint),
}

impl Rule {
    /// Return the grammar category produced by this rule, if any.
    pub fn ty(&self) -> Option<&str> {
        match self {
            Rule::Constructor(c) => Some(&c.ty),
            Rule::Token(t) => Some(&t.ty),
            Rule::Entrypoint(..) => None,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Constructor(c) => {
                write!(f, "{}. {} ::=", c.label, c.ty)?;
                for elem in &c.construction {
                    write!(f, " {}", elem)?;
                }
                Ok(())
            }
            Rule::Token(t) => write!(f, "token {}", t.ty),
            Rule::Entrypoint(e) => write!(f, "entrypoints {}", e.types.join(", ")),
        }
    }
}

/// The rules of one grammar category.
#[derive(Debug, Clone, PartialEq)]
pub enum Partition<'g> {
    Token(&'g str),
    Sum {
        ty: &'g str,
        rules: Vec<&'g Constructor>,
    },
}

impl<'g> Partition<'g> {
    pub fn ty(&self) -> &'g str {
        match self {
            Partition::Token(ty) => *ty,
            Partition::Sum { ty, .. } => *ty,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Partition::Token(..) => 1,
            Partition::Sum { rules, .. } => rules.len(),
        }
    }
}

/// The element names whose list form `[T]` is used somewhere in the grammar.
#[derive(Debug, Clone, Default)]
pub struct ListUsage<'g> {
    used: Set<&'g str>,
}

impl<'g> ListUsage<'g> {
    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Iterate over the element names in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &'g str> + '_ {
        self.used.iter().copied()
    }

    fn mark(&mut self, name: &'g str) {
        if let Elem::List(inner) = Elem::classify(name) {
            self.used.insert(inner);
            self.mark(inner);
        }
    }
}

/// The collection of rules read from a grammar description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    rules: Vec<Rule>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{} ;", rule)?;
        }
        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::IO)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarError> {
        let rules = crate::syntax::parse(source)?;
        Ok(Self::from_rules(rules).with_identifier_token())
    }

    /// Build a grammar from already parsed rules, without any post-processing.
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn constructors(&self) -> impl Iterator<Item = &Constructor> + '_ {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::Constructor(c) => Some(c),
            _ => None,
        })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> + '_ {
        self.rules.iter().filter_map(|rule| match rule {
            Rule::Token(t) => Some(t),
            _ => None,
        })
    }

    /// Iterate over every element name referenced by a construction or an
    /// entrypoint list.
    pub fn references(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().flat_map(|rule| {
            let names: &[String] = match rule {
                Rule::Constructor(c) => &c.construction,
                Rule::Entrypoint(e) => &e.types,
                Rule::Token(..) => &[],
            };
            names.iter().map(String::as_str)
        })
    }

    /// Append the token rule for the built-in identifier category when it is
    /// referenced somewhere but not declared.
    pub fn with_identifier_token(mut self) -> Self {
        let referenced = self
            .references()
            .any(|name| Elem::classify(name).mentions(IDENT));
        let declared = self.rules.iter().any(|rule| rule.ty() == Some(IDENT));
        if referenced && !declared {
            tracing::debug!("add the token rule for built-in category `{}'", IDENT);
            self.rules.push(Rule::Token(Token {
                ty: IDENT.to_owned(),
            }));
        }
        self
    }

    /// Partition the rules by their category, in lexicographic order of the
    /// category names. Constructors keep their declaration order.
    pub fn partitions(&self) -> Result<Vec<Partition<'_>>, GenerateError> {
        let mut groups: Map<&str, (usize, Vec<&Constructor>)> = Map::default();
        for rule in &self.rules {
            match rule {
                Rule::Token(t) => groups.entry(t.ty.as_str()).or_default().0 += 1,
                Rule::Constructor(c) => groups.entry(c.ty.as_str()).or_default().1.push(c),
                Rule::Entrypoint(..) => (),
            }
        }
        groups.sort_keys();

        groups
            .into_iter()
            .map(|(ty, (num_tokens, rules))| match (num_tokens, rules.is_empty()) {
                (0, _) => Ok(Partition::Sum { ty, rules }),
                (1, true) => Ok(Partition::Token(ty)),
                (_, true) => Err(GenerateError::DuplicateToken { ty: ty.to_owned() }),
                (_, false) => Err(GenerateError::MixedPartition { ty: ty.to_owned() }),
            })
            .collect()
    }

    /// Compute the element names whose list form is referenced.
    pub fn list_usage(&self) -> ListUsage<'_> {
        let mut usage = ListUsage::default();
        for name in self.references() {
            usage.mark(name);
        }
        usage.used.sort();
        usage
    }

    /// Return the categories that get a parse entry point.
    ///
    /// Without an `entrypoints` declaration, the category of the first
    /// constructor rule is used.
    pub fn entrypoints(&self) -> Result<Vec<&str>, GenerateError> {
        let mut decls = self.rules.iter().filter_map(|rule| match rule {
            Rule::Entrypoint(e) => Some(e),
            _ => None,
        });
        let types: Vec<&str> = match (decls.next(), decls.next()) {
            (Some(_), Some(_)) => return Err(GenerateError::MultipleEntrypoints),
            (Some(decl), None) => decl.types.iter().map(String::as_str).collect(),
            (None, _) => {
                let first = self.constructors().next().map(|c| c.ty.as_str());
                if let Some(ty) = first {
                    tracing::debug!("use the default entrypoint `{}'", ty);
                }
                first.into_iter().collect()
            }
        };

        let mut seen = Set::default();
        Ok(types.into_iter().filter(|ty| seen.insert(*ty)).collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("parsing failed: {}: `{}'", message, text)]
    ParsingFailed { message: String, text: String },
}

impl GrammarError {
    pub(crate) fn parsing_failed(message: impl Into<String>, text: impl Into<String>) -> Self {
        Self::ParsingFailed {
            message: message.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("the category `{}' has both token and constructor rules", ty)]
    MixedPartition { ty: String },

    #[error("the token `{}' is declared more than once", ty)]
    DuplicateToken { ty: String },

    #[error("more than one `entrypoints' declaration")]
    MultipleEntrypoints,

    #[error("the namespace of the native module must not be empty")]
    EmptyNamespace,

    #[error("extra cases are given for `{}', which is not a constructor category", ty)]
    ExtraCaseTarget { ty: String },
}
