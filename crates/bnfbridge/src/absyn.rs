//! Generation of the abstract syntax types.

use crate::{
    generate::ExtraCases,
    grammar::{Constructor, Elem, GenerateError, Grammar, ListUsage, Partition},
    names::case_names,
    reachability::Reachability,
    util::display_fn,
};
use std::fmt;

const HEADER: &str = "// Generated by bnfbridge from the grammar description. Do not edit.";

/// Generator of the `absyn` module.
///
/// The output is not indented; pass it through [`crate::pretty::reindent`].
#[derive(Debug)]
pub struct AbsynCodegen<'g> {
    partitions: Vec<Partition<'g>>,
    list_usage: ListUsage<'g>,
    reachability: Reachability<'g>,
    extra_cases: &'g ExtraCases,
}

impl<'g> AbsynCodegen<'g> {
    pub fn new(grammar: &'g Grammar, extra_cases: &'g ExtraCases) -> Result<Self, GenerateError> {
        let partitions = grammar.partitions()?;
        for ty in extra_cases.keys() {
            let is_sum = partitions
                .iter()
                .any(|p| matches!(p, Partition::Sum { ty: t, .. } if *t == ty.as_str()));
            if !is_sum {
                return Err(GenerateError::ExtraCaseTarget { ty: ty.clone() });
            }
        }

        let reachability = Reachability::new(&partitions);
        Ok(Self {
            list_usage: grammar.list_usage(),
            partitions,
            reachability,
            extra_cases,
        })
    }

    fn field_type(&self, owner: &str, elem: &str) -> String {
        match Elem::classify(elem) {
            Elem::Builtin(b) => b.rust_type().to_owned(),
            list @ Elem::List(..) => list.type_name(),
            Elem::Named(name) if self.reachability.needs_box(owner, name) => {
                tracing::debug!("box the field `{}' of `{}'", name, owner);
                format!("Box<{}>", name)
            }
            Elem::Named(name) => name.to_owned(),
        }
    }

    fn fmt_show_support(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "use std::fmt;")?;
        writeln!(f)?;
        writeln!(f, "/// Structural printing of abstract syntax values.")?;
        writeln!(f, "pub trait Show {{")?;
        writeln!(f, "fn show(&self) -> String;")?;
        writeln!(f, "}}")?;
        for (ty, body) in [
            ("i64", "self.to_string()"),
            ("f64", "self.to_string()"),
            ("char", "format!(\"{:?}\", self)"),
            ("String", "format!(\"{:?}\", self)"),
        ] {
            writeln!(f)?;
            writeln!(f, "impl Show for {} {{", ty)?;
            writeln!(f, "fn show(&self) -> String {{")?;
            writeln!(f, "{}", body)?;
            writeln!(f, "}}")?;
            writeln!(f, "}}")?;
        }
        writeln!(f)?;
        writeln!(f, "impl<T: Show> Show for Box<T> {{")?;
        writeln!(f, "fn show(&self) -> String {{")?;
        writeln!(f, "(**self).show()")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "impl<T: Show> Show for Vec<T> {{")?;
        writeln!(f, "fn show(&self) -> String {{")?;
        writeln!(f, "let items: Vec<String> = self.iter().map(Show::show).collect();")?;
        writeln!(f, "format!(\"[{{}}]\", items.join(\", \"))")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "#[allow(dead_code)]")?;
        writeln!(f, "fn show_variant(name: &str, fields: &[String]) -> String {{")?;
        writeln!(f, "format!(\"{{}}({{}})\", name, fields.join(\", \"))")?;
        writeln!(f, "}}")?;
        Ok(())
    }

    fn fmt_token(&self, f: &mut fmt::Formatter<'_>, ty: &str) -> fmt::Result {
        writeln!(f, "#[derive(Debug, Clone, PartialEq, Eq, Hash)]")?;
        writeln!(f, "pub struct {}(pub String);", ty)?;
        writeln!(f)?;
        writeln!(f, "impl fmt::Display for {} {{", ty)?;
        writeln!(f, "fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{")?;
        writeln!(f, "write!(f, \"{}({{:?}})\", self.0)", ty)?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "impl Show for {} {{", ty)?;
        writeln!(f, "fn show(&self) -> String {{")?;
        writeln!(f, "self.to_string()")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        Ok(())
    }

    fn fmt_sum(
        &self,
        f: &mut fmt::Formatter<'_>,
        ty: &str,
        rules: &[&Constructor],
    ) -> fmt::Result {
        let names = case_names(ty, rules);
        let extra_cases = self.extra_cases.get(ty).map_or(&[][..], |cases| &cases[..]);

        writeln!(f, "#[derive(Debug, Clone, PartialEq)]")?;
        writeln!(f, "pub enum {} {{", ty)?;
        for (name, rule) in names.iter().zip(rules) {
            if rule.construction.is_empty() {
                writeln!(f, "{},", name)?;
            } else {
                let fields = display_fn(|f| {
                    for (i, elem) in rule.construction.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        f.write_str(&self.field_type(ty, elem))?;
                    }
                    Ok(())
                });
                writeln!(f, "{}({}),", name, fields)?;
            }
        }
        for case in extra_cases {
            let case = case.trim();
            if case.ends_with(',') {
                writeln!(f, "{}", case)?;
            } else {
                writeln!(f, "{},", case)?;
            }
        }
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "impl fmt::Display for {} {{", ty)?;
        writeln!(f, "fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{")?;
        writeln!(f, "f.write_str(&self.show())")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "impl Show for {} {{", ty)?;
        writeln!(f, "fn show(&self) -> String {{")?;
        writeln!(f, "match self {{")?;
        for (name, rule) in names.iter().zip(rules) {
            let arity = rule.construction.len();
            if arity == 0 {
                writeln!(f, "{}::{} => String::from({:?}),", ty, name, name)?;
            } else {
                let bindings: Vec<String> = (1..=arity).map(|i| format!("x{}", i)).collect();
                let shows: Vec<String> = bindings.iter().map(|x| format!("{}.show()", x)).collect();
                writeln!(
                    f,
                    "{}::{}({}) => show_variant({:?}, &[{}]),",
                    ty,
                    name,
                    bindings.join(", "),
                    name,
                    shows.join(", ")
                )?;
            }
        }
        if !extra_cases.is_empty() {
            writeln!(f, "#[allow(unreachable_patterns)]")?;
            writeln!(f, "other => format!(\"{{:?}}\", other),")?;
        }
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        Ok(())
    }

    fn fmt_list_helper(&self, f: &mut fmt::Formatter<'_>, elem: &str) -> fmt::Result {
        let inner = match Elem::classify(elem) {
            Elem::Builtin(b) => b.rust_type().to_owned(),
            other => other.type_name(),
        };
        let list = format!("[{}]", elem);
        writeln!(
            f,
            "pub type {} = Vec<{}>;",
            Elem::classify(&list).type_name(),
            inner
        )
    }
}

impl fmt::Display for AbsynCodegen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        if self.partitions.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        self.fmt_show_support(f)?;

        for partition in &self.partitions {
            writeln!(f)?;
            match partition {
                Partition::Token(ty) => self.fmt_token(f, ty)?,
                Partition::Sum { ty, rules } => self.fmt_sum(f, ty, rules)?,
            }
            if self.list_usage.contains(partition.ty()) {
                writeln!(f)?;
                self.fmt_list_helper(f, partition.ty())?;
            }
        }

        // list helpers of built-in scalars and of nested lists.
        let mut others = self
            .list_usage
            .iter()
            .filter(|elem| !self.partitions.iter().any(|p| p.ty() == *elem))
            .peekable();
        if others.peek().is_some() {
            writeln!(f)?;
            for elem in others {
                self.fmt_list_helper(f, elem)?;
            }
        }

        Ok(())
    }
}
