// Single jq expression: compile it, pull its first result

use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;

use crate::error::TransformError;

/// Parse and compile `source` with the jq core and standard definitions,
/// then hand the compiled filter to `f`.
fn with_filter<R>(
    source: &str,
    f: impl FnOnce(&jaq_core::Filter<Native<Val>>) -> R,
) -> Result<R, TransformError> {
    let program = File {
        code: source,
        path: (),
    };
    let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = Arena::default();

    let modules = loader
        .load(&arena, program)
        .map_err(|errs| syntax_error(source, format!("{:?}", errs)))?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| syntax_error(source, format!("{:?}", errs)))?;

    Ok(f(&filter))
}

/// Compile `source` without running it.
pub fn check(source: &str) -> Result<(), TransformError> {
    with_filter(source, |_| ())
}

/// Compile `source`, run it against `input` and keep only the first value.
///
/// The output iterator is lazy; it is advanced exactly once and then
/// dropped, so the remaining results are never computed.
pub fn first_output(source: &str, input: Value) -> Result<Value, TransformError> {
    with_filter(source, |filter| {
        let inputs = RcIter::new(core::iter::empty());
        let mut outputs = filter.run((Ctx::new([], &inputs), Val::from(input)));
        let first = outputs.next();
        drop(outputs);

        match first {
            None => Err(TransformError::EmptyResult(source.to_string())),
            Some(Err(err)) => Err(TransformError::Execution(format!(
                "Filter execution error in '{}': {}",
                source, err
            ))),
            Some(Ok(val)) => to_json(&val),
        }
    })?
}

fn syntax_error(source: &str, details: String) -> TransformError {
    TransformError::Compile(format!("Invalid filter syntax '{}': {}", source, details))
}

/// Convert a jq value back into a `serde_json::Value` through its JSON text.
fn to_json(val: &Val) -> Result<Value, TransformError> {
    serde_json::from_str(&val.to_string()).map_err(|e| TransformError::Encode(e.to_string()))
}
