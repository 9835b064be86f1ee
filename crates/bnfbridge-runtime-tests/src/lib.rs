//! Tests running the generated modules against hand-written native layouts.

#[cfg(test)]
mod g_calc;
