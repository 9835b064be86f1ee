//! Generation of the bridge from the native parser to the abstract syntax.
//!
//! The native side follows the layout of C parsers generated from the same
//! grammar:
//!
//! * a category `T` with constructors is a pointer to a struct holding a
//!   `kind` discriminant, numbered by declaration order starting at 0, and a
//!   union `u` with one member per label (`u.eadd_` for `EAdd`);
//! * a list `[T]` is a linked list of nodes with a head field `t_` and a
//!   tail field `listt_`;
//! * the file parser of an entry point `T` is named `pT`.

use crate::{
    grammar::{Constructor, Elem, GenerateError, Grammar, ListUsage, Partition},
    names::{case_names, snake_case},
    reachability::Reachability,
    types::Map,
};
use std::fmt;

const HEADER: &str = "// Generated by bnfbridge from the grammar description. Do not edit.";

/// Prefix of the native parse functions.
const PARSE_PREFIX: &str = "p";

/// Crate providing the runtime support of the generated bridge.
const RUNTIME_CRATE: &str = "bnfbridge_runtime";

/// Generator of the `bridge` module.
///
/// The output is not indented; pass it through [`crate::pretty::reindent`].
#[derive(Debug)]
pub struct BridgeCodegen<'g> {
    partitions: Vec<Partition<'g>>,
    list_usage: ListUsage<'g>,
    reachability: Reachability<'g>,
    entrypoints: Vec<&'g str>,
    namespace: &'g str,
    absyn_module: &'g str,
}

impl<'g> BridgeCodegen<'g> {
    /// Create a generator.
    ///
    /// `namespace` is the module path of the native bindings, and
    /// `absyn_module` the module path of the generated abstract syntax, both
    /// as seen from the bridge module.
    pub fn new(
        grammar: &'g Grammar,
        namespace: &'g str,
        absyn_module: &'g str,
    ) -> Result<Self, GenerateError> {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            return Err(GenerateError::EmptyNamespace);
        }

        let partitions = grammar.partitions()?;
        let reachability = Reachability::new(&partitions);
        Ok(Self {
            list_usage: grammar.list_usage(),
            entrypoints: grammar.entrypoints()?,
            partitions,
            reachability,
            namespace,
            absyn_module: absyn_module.trim(),
        })
    }

    /// The expression converting the native value `value` of the element
    /// `elem`, as a field of `owner`.
    fn convert_expr(&self, owner: &str, elem: &str, value: &str) -> String {
        let call = format!("{}({})", convert_fn(elem), value);
        match Elem::classify(elem) {
            Elem::Named(name) if self.reachability.needs_box(owner, name) => {
                format!("Box::new({})", call)
            }
            _ => call,
        }
    }

    fn fmt_imports(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "use {} as abs;", self.absyn_module)?;
        if self.namespace != "ffi" {
            writeln!(f, "use {} as ffi;", self.namespace)?;
        }
        if !self.entrypoints.is_empty() {
            writeln!(f, "use {}::{{NativeFile, NativeFileError}};", RUNTIME_CRATE)?;
        }
        writeln!(f, "use std::ffi::CStr;")?;
        if !self.entrypoints.is_empty() {
            writeln!(f, "use std::path::Path;")?;
        }
        if self
            .partitions
            .iter()
            .any(|p| matches!(p, Partition::Sum { .. }))
        {
            writeln!(f, "use std::process;")?;
        }
        Ok(())
    }

    fn fmt_defaults(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pub fn convert_integer(value: ffi::Integer) -> i64 {{")?;
        writeln!(f, "i64::from(value)")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "pub fn convert_double(value: ffi::Double) -> f64 {{")?;
        writeln!(f, "f64::from(value)")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "pub fn convert_char(value: ffi::Char) -> char {{")?;
        writeln!(f, "char::from(value as u8)")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "/// # Safety")?;
        writeln!(f, "///")?;
        writeln!(f, "/// `value` must be a valid NUL-terminated string.")?;
        writeln!(f, "pub unsafe fn convert_string(value: ffi::String) -> String {{")?;
        writeln!(
            f,
            "unsafe {{ CStr::from_ptr(value) }}.to_string_lossy().into_owned()"
        )?;
        writeln!(f, "}}")?;
        Ok(())
    }

    fn fmt_sum(&self, f: &mut fmt::Formatter<'_>, ty: &str, rules: &[&Constructor]) -> fmt::Result {
        let names = case_names(ty, rules);

        writeln!(f, "/// # Safety")?;
        writeln!(f, "///")?;
        writeln!(
            f,
            "/// `p` must point to a valid `{}` value built by the native parser.",
            ty
        )?;
        writeln!(
            f,
            "pub unsafe fn {}(p: ffi::{}) -> abs::{} {{",
            convert_fn(ty),
            ty,
            ty
        )?;
        writeln!(f, "unsafe {{")?;
        writeln!(f, "let kind = (*p).kind as u32;")?;
        writeln!(f, "match kind {{")?;
        for (kind, (name, rule)) in names.iter().zip(rules).enumerate() {
            if rule.construction.is_empty() {
                writeln!(f, "{} => abs::{}::{},", kind, ty, name)?;
                continue;
            }
            let member = format!("(*p).u.{}_", rule.label.to_lowercase());
            let args: Vec<String> = rule
                .construction
                .iter()
                .zip(accessor_names(&rule.construction))
                .map(|(elem, accessor)| {
                    self.convert_expr(ty, elem, &format!("{}.{}", member, accessor))
                })
                .collect();
            writeln!(
                f,
                "{} => abs::{}::{}({}),",
                kind,
                ty,
                name,
                args.join(", ")
            )?;
        }
        writeln!(f, "_ => {{")?;
        writeln!(
            f,
            "eprintln!(\"error: unexpected kind {{}} while converting {}\", kind);",
            ty
        )?;
        writeln!(f, "process::abort()")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        Ok(())
    }

    fn fmt_token(&self, f: &mut fmt::Formatter<'_>, ty: &str) -> fmt::Result {
        writeln!(f, "/// # Safety")?;
        writeln!(f, "///")?;
        writeln!(f, "/// `p` must be a valid NUL-terminated string.")?;
        writeln!(
            f,
            "pub unsafe fn {}(p: ffi::{}) -> abs::{} {{",
            convert_fn(ty),
            ty,
            ty
        )?;
        writeln!(f, "abs::{}(unsafe {{ convert_string(p) }})", ty)?;
        writeln!(f, "}}")?;
        Ok(())
    }

    fn fmt_list(&self, f: &mut fmt::Formatter<'_>, elem: &str) -> fmt::Result {
        let list = format!("[{}]", elem);
        let list_name = Elem::classify(&list).type_name();
        let head = format!("{}_", Elem::classify(elem).type_name().to_lowercase());
        let tail = format!("{}_", list_name.to_lowercase());
        let head_is_pointer = match Elem::classify(elem) {
            Elem::Builtin(b) => b.is_pointer(),
            Elem::Named(..) | Elem::List(..) => true,
        };

        writeln!(f, "/// # Safety")?;
        writeln!(f, "///")?;
        writeln!(
            f,
            "/// `p` must be null or point to a valid `{}` node built by the native parser.",
            list_name
        )?;
        writeln!(
            f,
            "pub unsafe fn {}(p: ffi::{}) -> abs::{} {{",
            convert_fn(&list),
            list_name,
            list_name
        )?;
        writeln!(f, "let mut items = Vec::new();")?;
        writeln!(f, "let mut node = p;")?;
        writeln!(f, "unsafe {{")?;
        if head_is_pointer {
            writeln!(
                f,
                "while !node.is_null() && !(*node).{}.is_null() {{",
                head
            )?;
        } else {
            writeln!(f, "while !node.is_null() {{")?;
        }
        writeln!(
            f,
            "items.push({}((*node).{}));",
            convert_fn(elem),
            head
        )?;
        writeln!(f, "node = (*node).{};", tail)?;
        writeln!(f, "}}")?;
        writeln!(f, "}}")?;
        writeln!(f, "items")?;
        writeln!(f, "}}")?;
        Ok(())
    }

    fn fmt_entrypoint(&self, f: &mut fmt::Formatter<'_>, entry: &str) -> fmt::Result {
        let ty = Elem::classify(entry).type_name();
        writeln!(f, "/// Parse the file at `path` as `{}`.", ty)?;
        writeln!(f, "///")?;
        writeln!(
            f,
            "/// Returns `Ok(None)` when the native parser rejects the input."
        )?;
        writeln!(
            f,
            "pub fn parse_{}_file(path: &Path) -> Result<Option<abs::{}>, NativeFileError> {{",
            snake_case(&ty),
            ty
        )?;
        writeln!(f, "let file = NativeFile::open(path)?;")?;
        writeln!(
            f,
            "let tree = unsafe {{ ffi::{}{}(file.as_ptr().cast()) }};",
            PARSE_PREFIX, ty
        )?;
        writeln!(f, "if tree.is_null() {{")?;
        writeln!(f, "return Ok(None);")?;
        writeln!(f, "}}")?;
        writeln!(f, "Ok(Some(unsafe {{ {}(tree) }}))", convert_fn(entry))?;
        writeln!(f, "}}")?;
        Ok(())
    }
}

impl fmt::Display for BridgeCodegen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        writeln!(f)?;
        self.fmt_imports(f)?;
        writeln!(f)?;
        self.fmt_defaults(f)?;

        for partition in &self.partitions {
            writeln!(f)?;
            match partition {
                Partition::Token(ty) => self.fmt_token(f, ty)?,
                Partition::Sum { ty, rules } => self.fmt_sum(f, ty, rules)?,
            }
        }

        for elem in self.list_usage.iter() {
            writeln!(f)?;
            self.fmt_list(f, elem)?;
        }

        for entry in &self.entrypoints {
            writeln!(f)?;
            self.fmt_entrypoint(f, entry)?;
        }

        Ok(())
    }
}

/// Name of the function converting the native value of `elem`.
fn convert_fn(elem: &str) -> String {
    format!("convert_{}", snake_case(&Elem::classify(elem).type_name()))
}

/// Compute the native field names of the constructor arguments.
///
/// A field is named after its lowercased type with a trailing underscore.
/// When a type occurs more than once, its occurrences are numbered from 1
/// instead, left to right: `Exp "+" Exp` reads `exp_1` and `exp_2`.
pub fn accessor_names(construction: &[String]) -> Vec<String> {
    let type_names: Vec<String> = construction
        .iter()
        .map(|elem| Elem::classify(elem).type_name().to_lowercase())
        .collect();

    let mut counts: Map<&str, usize> = Map::default();
    for name in &type_names {
        *counts.entry(name.as_str()).or_default() += 1;
    }

    let mut seen: Map<&str, usize> = Map::default();
    type_names
        .iter()
        .map(|name| match counts[name.as_str()] {
            1 => format!("{}_", name),
            _ => {
                let index = seen.entry(name.as_str()).or_default();
                *index += 1;
                format!("{}_{}", name, index)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::{Entrypoint, Rule},
        pretty::reindent,
    };

    const CALC: &str = "\
EAdd. Exp ::= Exp \"+\" Exp1 ;
EInt. Exp1 ::= Integer ;
EVar. Exp1 ::= Ident ;
ECall. Exp1 ::= Ident \"(\" [Exp] \")\" ;
EUnit. Exp1 ::= \"()\" ;
separator Exp \",\" ;
";

    fn generate(source: &str) -> String {
        let grammar = Grammar::from_str(source).unwrap();
        let codegen = BridgeCodegen::new(&grammar, "crate::ffi", "super::absyn").unwrap();
        reindent(&codegen.to_string())
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accessors_of_single_occurrences() {
        assert_eq!(accessor_names(&strings(&["Exp"])), ["exp_"]);
        assert_eq!(
            accessor_names(&strings(&["Ident", "[Exp]", "Integer"])),
            ["ident_", "listexp_", "integer_"]
        );
        assert!(accessor_names(&[]).is_empty());
    }

    #[test]
    fn accessors_of_repeated_occurrences() {
        assert_eq!(accessor_names(&strings(&["Exp", "Exp"])), ["exp_1", "exp_2"]);
        assert_eq!(
            accessor_names(&strings(&["Exp", "Integer", "Exp", "[Exp]", "Exp"])),
            ["exp_1", "integer_", "exp_2", "listexp_", "exp_3"]
        );
    }

    #[test]
    fn constructor_conversion() {
        let out = generate(CALC);
        assert!(out.contains(
            "\
pub unsafe fn convert_exp(p: ffi::Exp) -> abs::Exp {
    unsafe {
        let kind = (*p).kind as u32;
        match kind {
            0 => abs::Exp::EAdd(Box::new(convert_exp((*p).u.eadd_.exp_1)), Box::new(convert_exp((*p).u.eadd_.exp_2))),
            1 => abs::Exp::EInt(convert_integer((*p).u.eint_.integer_)),
            2 => abs::Exp::EVar(convert_ident((*p).u.evar_.ident_)),
            3 => abs::Exp::ECall(convert_ident((*p).u.ecall_.ident_), convert_list_exp((*p).u.ecall_.listexp_)),
            4 => abs::Exp::EUnit,
            _ => {
                eprintln!(\"error: unexpected kind {} while converting Exp\", kind);
                process::abort()
            }
        }
    }
}
"
        ));
    }

    #[test]
    fn token_conversion() {
        let out = generate(CALC);
        assert!(out.contains(
            "\
pub unsafe fn convert_ident(p: ffi::Ident) -> abs::Ident {
    abs::Ident(unsafe { convert_string(p) })
}
"
        ));
    }

    #[test]
    fn default_conversions() {
        let out = generate("comment \"--\" ;");
        assert!(out.contains("pub fn convert_integer(value: ffi::Integer) -> i64 {"));
        assert!(out.contains("pub fn convert_double(value: ffi::Double) -> f64 {"));
        assert!(out.contains("pub fn convert_char(value: ffi::Char) -> char {"));
        assert!(out.contains("pub unsafe fn convert_string(value: ffi::String) -> String {"));
        assert!(!out.contains("parse_"));
        assert!(!out.contains("use std::process;"));
    }

    #[test]
    fn list_conversion() {
        let out = generate(CALC);
        assert!(out.contains(
            "\
pub unsafe fn convert_list_exp(p: ffi::ListExp) -> abs::ListExp {
    let mut items = Vec::new();
    let mut node = p;
    unsafe {
        while !node.is_null() && !(*node).exp_.is_null() {
            items.push(convert_exp((*node).exp_));
            node = (*node).listexp_;
        }
    }
    items
}
"
        ));
    }

    #[test]
    fn scalar_list_conversion() {
        let out = generate("EVec. Exp ::= [Integer] ;\nEMat. Exp ::= [[Exp]] ;");
        assert!(out.contains("pub unsafe fn convert_list_integer(p: ffi::ListInteger) -> abs::ListInteger {"));
        assert!(out.contains("        while !node.is_null() {\n            items.push(convert_integer((*node).integer_));"));
        assert!(out.contains("pub unsafe fn convert_list_list_exp(p: ffi::ListListExp) -> abs::ListListExp {"));
        assert!(out.contains("items.push(convert_list_exp((*node).listexp_));"));
        assert!(out.contains("node = (*node).listlistexp_;"));
    }

    #[test]
    fn default_entrypoint() {
        let out = generate("Prog. Program ::= [Stm] ;\nSExp. Stm ::= Exp ;\nEInt. Exp ::= Integer ;");
        assert_eq!(out.matches("_file(path: &Path)").count(), 1);
        assert!(out.contains(
            "\
pub fn parse_program_file(path: &Path) -> Result<Option<abs::Program>, NativeFileError> {
    let file = NativeFile::open(path)?;
    let tree = unsafe { ffi::pProgram(file.as_ptr().cast()) };
    if tree.is_null() {
        return Ok(None);
    }
    Ok(Some(unsafe { convert_program(tree) }))
}
"
        ));
    }

    #[test]
    fn declared_entrypoints() {
        let out = generate("entrypoints Exp, [Stm] ;\nSExp. Stm ::= Exp ;\nEInt. Exp ::= Integer ;");
        assert!(out.contains("pub fn parse_exp_file(path: &Path) -> Result<Option<abs::Exp>, NativeFileError> {"));
        assert!(out.contains("let tree = unsafe { ffi::pListStm(file.as_ptr().cast()) };"));
        assert!(out.contains("Ok(Some(unsafe { convert_list_stm(tree) }))"));
        assert!(!out.contains("parse_stm_file"));
    }

    #[test]
    fn imports() {
        let out = generate(CALC);
        assert!(out.contains("use super::absyn as abs;\nuse crate::ffi as ffi;\n"));
        assert!(out.contains("use bnfbridge_runtime::{NativeFile, NativeFileError};"));

        let grammar = Grammar::from_str(CALC).unwrap();
        let out = BridgeCodegen::new(&grammar, "ffi", "crate::ast")
            .unwrap()
            .to_string();
        assert!(out.contains("use crate::ast as abs;\nuse bnfbridge_runtime"));
    }

    #[test]
    fn empty_namespace() {
        let grammar = Grammar::from_str(CALC).unwrap();
        assert!(matches!(
            BridgeCodegen::new(&grammar, "  ", "super::absyn"),
            Err(GenerateError::EmptyNamespace)
        ));
    }

    #[test]
    fn multiple_entrypoints() {
        let entry = Rule::Entrypoint(Entrypoint {
            types: vec!["Exp".into()],
        });
        let grammar = Grammar::from_rules(vec![entry.clone(), entry]);
        assert!(matches!(
            BridgeCodegen::new(&grammar, "crate::ffi", "super::absyn"),
            Err(GenerateError::MultipleEntrypoints)
        ));
    }

    #[test]
    fn kinds_follow_declaration_order() {
        let out = generate(
            "\
SWhile. Stm ::= \"while\" Exp Stm ;
EInt. Exp ::= Integer ;
SSkip. Stm ::= \"skip\" ;
EVar. Exp ::= Ident ;
SAssign. Stm ::= Ident \":=\" Exp ;
",
        );
        assert!(out.contains("0 => abs::Stm::SWhile(convert_exp((*p).u.swhile_.exp_), Box::new(convert_stm((*p).u.swhile_.stm_))),"));
        assert!(out.contains("1 => abs::Stm::SSkip,"));
        assert!(out.contains("2 => abs::Stm::SAssign(convert_ident((*p).u.sassign_.ident_), convert_exp((*p).u.sassign_.exp_)),"));
        assert!(out.contains("0 => abs::Exp::EInt("));
        assert!(out.contains("1 => abs::Exp::EVar("));
    }
}
