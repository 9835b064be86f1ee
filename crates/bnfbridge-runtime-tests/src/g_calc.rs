pub mod absyn {
    include!(concat!(env!("OUT_DIR"), "/calc/absyn.rs"));
}

pub mod bridge {
    include!(concat!(env!("OUT_DIR"), "/calc/bridge.rs"));
}

/// The layout of the C parser generated from `grammars/calc.cf`.
#[allow(non_camel_case_types, non_snake_case, non_upper_case_globals, dead_code)]
pub mod ffi {
    use std::{
        cell::Cell,
        os::raw::{c_char, c_int, c_uint, c_void},
        ptr,
    };

    pub type Integer = c_int;
    pub type Double = f64;
    pub type Char = c_char;
    pub type String = *mut c_char;
    pub type Ident = *mut c_char;

    pub type Exp = *mut Exp_;

    pub const Exp__is_EAdd: c_uint = 0;
    pub const Exp__is_EInt: c_uint = 1;
    pub const Exp__is_EVar: c_uint = 2;

    #[repr(C)]
    pub struct Exp_ {
        pub kind: c_uint,
        pub u: Exp__u,
    }

    #[repr(C)]
    #[derive(Copy, Clone)]
    pub union Exp__u {
        pub eadd_: Exp__EAdd,
        pub eint_: Exp__EInt,
        pub evar_: Exp__EVar,
    }

    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct Exp__EAdd {
        pub exp_1: Exp,
        pub exp_2: Exp,
    }

    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct Exp__EInt {
        pub integer_: Integer,
    }

    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct Exp__EVar {
        pub ident_: Ident,
    }

    pub type ListExp = *mut ListExp_;

    #[repr(C)]
    pub struct ListExp_ {
        pub exp_: Exp,
        pub listexp_: ListExp,
    }

    // パース関数が返す構文木 (null は構文エラー)
    thread_local! {
        static PARSED_EXP: Cell<Exp> = Cell::new(ptr::null_mut());
        static PARSED_LIST_EXP: Cell<ListExp> = Cell::new(ptr::null_mut());
    }

    pub fn set_parsed_exp(tree: Exp) {
        PARSED_EXP.with(|parsed| parsed.set(tree));
    }

    pub unsafe fn pExp(_inp: *mut c_void) -> Exp {
        PARSED_EXP.with(Cell::get)
    }

    pub unsafe fn pListExp(_inp: *mut c_void) -> ListExp {
        PARSED_LIST_EXP.with(Cell::get)
    }
}

use self::absyn::{Exp, Ident, Show};
use bnfbridge_runtime::NativeFileError;
use std::{ffi::CString, os::raw::c_int, path::Path, ptr};

fn node(kind: u32, u: ffi::Exp__u) -> ffi::Exp {
    Box::into_raw(Box::new(ffi::Exp_ { kind, u }))
}

fn int(n: c_int) -> ffi::Exp {
    node(
        ffi::Exp__is_EInt,
        ffi::Exp__u {
            eint_: ffi::Exp__EInt { integer_: n },
        },
    )
}

fn var(name: &str) -> ffi::Exp {
    let ident_ = CString::new(name).unwrap().into_raw();
    node(
        ffi::Exp__is_EVar,
        ffi::Exp__u {
            evar_: ffi::Exp__EVar { ident_ },
        },
    )
}

fn add(exp_1: ffi::Exp, exp_2: ffi::Exp) -> ffi::Exp {
    node(
        ffi::Exp__is_EAdd,
        ffi::Exp__u {
            eadd_: ffi::Exp__EAdd { exp_1, exp_2 },
        },
    )
}

fn cons(exp_: ffi::Exp, listexp_: ffi::ListExp) -> ffi::ListExp {
    Box::into_raw(Box::new(ffi::ListExp_ { exp_, listexp_ }))
}

fn list(items: Vec<ffi::Exp>) -> ffi::ListExp {
    items
        .into_iter()
        .rev()
        .fold(ptr::null_mut(), |tail, head| cons(head, tail))
}

#[test]
fn null_list() {
    let items = unsafe { bridge::convert_list_exp(ptr::null_mut()) };
    assert!(items.is_empty());
}

#[test]
fn null_head() {
    let items = unsafe { bridge::convert_list_exp(cons(ptr::null_mut(), ptr::null_mut())) };
    assert!(items.is_empty());

    // 先頭が null のノードで走査を打ち切る
    let native = cons(int(1), cons(ptr::null_mut(), cons(int(2), ptr::null_mut())));
    let items = unsafe { bridge::convert_list_exp(native) };
    assert_eq!(items, [Exp::EInt(1)]);
}

#[test]
fn single_node() {
    let items = unsafe { bridge::convert_list_exp(list(vec![int(42)])) };
    assert_eq!(items, [Exp::EInt(42)]);
}

#[test]
fn nodes_keep_their_order() {
    let items = unsafe { bridge::convert_list_exp(list(vec![int(1), int(2), int(3)])) };
    assert_eq!(items, [Exp::EInt(1), Exp::EInt(2), Exp::EInt(3)]);
    assert_eq!(items.show(), "[EInt(1), EInt(2), EInt(3)]");
}

#[test]
fn recursive_constructor() {
    let exp = unsafe { bridge::convert_exp(add(int(4), int(5))) };
    assert_eq!(
        exp,
        Exp::EAdd(Box::new(Exp::EInt(4)), Box::new(Exp::EInt(5)))
    );
    assert_eq!(exp.show(), "EAdd(EInt(4), EInt(5))");
    assert_eq!(exp.to_string(), "EAdd(EInt(4), EInt(5))");
}

#[test]
fn token_values() {
    let exp = unsafe { bridge::convert_exp(var("x\"y")) };
    assert_eq!(exp, Exp::EVar(Ident("x\"y".into())));
    assert_eq!(exp.show(), "EVar(Ident(\"x\\\"y\"))");
    assert_eq!(Ident("x".into()).to_string(), "Ident(\"x\")");
}

#[test]
fn rejected_input() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("grammars/calc.cf");
    assert_eq!(bridge::parse_exp_file(&path).unwrap(), None);
    assert_eq!(bridge::parse_list_exp_file(&path).unwrap(), None);
}

#[test]
fn accepted_input() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("grammars/calc.cf");
    ffi::set_parsed_exp(add(var("x"), int(1)));
    let exp = bridge::parse_exp_file(&path).unwrap();
    assert_eq!(
        exp,
        Some(Exp::EAdd(
            Box::new(Exp::EVar(Ident("x".into()))),
            Box::new(Exp::EInt(1)),
        ))
    );
}

#[test]
fn missing_input() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("grammars/missing.calc");
    let err = bridge::parse_exp_file(&path).unwrap_err();
    assert!(matches!(err, NativeFileError::Open { .. }), "{:?}", err);
}
