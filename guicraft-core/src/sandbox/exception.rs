//! Turning script failures into plugin diagnostics.
//!
//! Error-like values render as `Kind: message` followed by one `\nat ...` line
//! per call frame, innermost first. A thrown value that is not error-like is
//! coerced to a string and reported as-is.

use rhai::{Dynamic, EvalAltResult, Map, ParseError, Position};

/// Kind reported for thrown maps that carry no `kind` of their own.
pub const SCRIPT_ERROR_KIND: &str = "ScriptError";

/// Kind of the error thrown when an element id is already taken.
pub const DUPLICATE_REGISTRATION_KIND: &str = "DuplicateRegistrationError";

/// Build the structured value thrown by host functions.
///
/// Scripts can `catch` it and look at `e.kind` / `e.message`.
pub fn script_error(kind: &str, message: impl Into<String>) -> Box<EvalAltResult> {
    let mut map = Map::new();
    map.insert("kind".into(), Dynamic::from(kind.to_string()));
    map.insert("message".into(), Dynamic::from(message.into()));
    EvalAltResult::ErrorRuntime(Dynamic::from_map(map), Position::NONE).into()
}

/// Like [`script_error`] with extra fields on the thrown map.
pub fn script_error_with(
    kind: &str,
    message: impl Into<String>,
    fields: impl IntoIterator<Item = (&'static str, Dynamic)>,
) -> Box<EvalAltResult> {
    let mut map = Map::new();
    map.insert("kind".into(), Dynamic::from(kind.to_string()));
    map.insert("message".into(), Dynamic::from(message.into()));
    for (key, value) in fields {
        map.insert(key.into(), value);
    }
    EvalAltResult::ErrorRuntime(Dynamic::from_map(map), Position::NONE).into()
}

/// Render a compile error of `plugin`.
pub fn render_parse_error(err: &ParseError, plugin: &str) -> String {
    let mut rendered = format!("ParseError: {}", err.err_type());
    push_frame(&mut rendered, plugin, err.position());
    rendered
}

/// Render a runtime failure of `plugin`.
///
/// # Example
///
/// ```rust
/// use guicraft_core::sandbox::exception::{render_exception, script_error};
///
/// let err = script_error("TypeError", "rows must be a number");
/// assert_eq!(
///     render_exception(&err, "chest.rhai"),
///     "TypeError: rows must be a number\nat chest.rhai"
/// );
/// ```
pub fn render_exception(err: &EvalAltResult, plugin: &str) -> String {
    // (function, call site) pairs from the outermost call inwards
    let mut calls: Vec<(&str, Position)> = Vec::new();
    let mut current = err;
    while let EvalAltResult::ErrorInFunctionCall(name, _, inner, position) = current {
        calls.push((name.as_str(), *position));
        current = &**inner;
    }

    let (head, origin) = match current {
        EvalAltResult::ErrorRuntime(value, position) => match thrown_error(value) {
            Some(head) => (head, *position),
            None => return value.to_string(),
        },
        other => {
            let position = other.position();
            let text = other.to_string();
            let suffix = format!(" ({})", position);
            let message = text.strip_suffix(suffix.as_str()).unwrap_or(&text);
            (format!("{}: {}", error_kind(other), message), position)
        }
    };

    // each frame is reported at the position where execution was inside it
    let mut frames: Vec<(&str, Position)> = Vec::with_capacity(calls.len() + 1);
    let mut position = origin;
    for (name, call_site) in calls.iter().rev() {
        frames.push((*name, position));
        position = *call_site;
    }
    frames.push((plugin, position));

    let mut rendered = head;
    for (name, position) in frames {
        push_frame(&mut rendered, name, position);
    }
    rendered
}

fn thrown_error(value: &Dynamic) -> Option<String> {
    let map = value.read_lock::<Map>()?;
    let message = map.get("message")?.to_string();
    let kind = map
        .get("kind")
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| SCRIPT_ERROR_KIND.to_string());
    Some(format!("{}: {}", kind, message))
}

fn push_frame(rendered: &mut String, name: &str, position: Position) {
    match (position.line(), position.position()) {
        (Some(line), Some(column)) => {
            rendered.push_str(&format!("\nat {} (line {}, position {})", name, line, column))
        }
        (Some(line), None) => rendered.push_str(&format!("\nat {} (line {})", name, line)),
        _ => rendered.push_str(&format!("\nat {}", name)),
    }
}

fn error_kind(err: &EvalAltResult) -> &'static str {
    match err {
        EvalAltResult::ErrorParsing(..) => "ParseError",
        EvalAltResult::ErrorVariableNotFound(..) => "VariableNotFoundError",
        EvalAltResult::ErrorFunctionNotFound(..) => "FunctionNotFoundError",
        EvalAltResult::ErrorModuleNotFound(..) => "ModuleNotFoundError",
        EvalAltResult::ErrorMismatchDataType(..)
        | EvalAltResult::ErrorMismatchOutputType(..) => "TypeError",
        EvalAltResult::ErrorArithmetic(..) => "ArithmeticError",
        EvalAltResult::ErrorIndexNotFound(..)
        | EvalAltResult::ErrorPropertyNotFound(..)
        | EvalAltResult::ErrorArrayBounds(..)
        | EvalAltResult::ErrorStringBounds(..) => "RangeError",
        EvalAltResult::ErrorTooManyOperations(..) => "OperationLimitError",
        EvalAltResult::ErrorTerminated(..) => "TimeoutError",
        EvalAltResult::ErrorStackOverflow(..) => "StackOverflowError",
        EvalAltResult::ErrorDataTooLarge(..) => "DataTooLargeError",
        _ => SCRIPT_ERROR_KIND,
    }
}
