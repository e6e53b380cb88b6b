//! JSON helpers for parameter mappings.
//!
//! Both directions degrade instead of failing: malformed input decodes to
//! an empty mapping, and an empty mapping encodes to an empty string.

use serde::Serialize;
use serde_json::ser::{CharEscape, CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use std::io;

/// String-keyed parameter mapping carried by events and handlers.
pub type Params = Map<String, Value>;

/// Default maximum container nesting accepted by [`decode`].
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Raw input accepted when assigning params.
///
/// A ready mapping is taken as-is. Text is parsed only when it looks like a
/// JSON object; anything else becomes an empty mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamsInput {
    /// Ready mapping.
    Map(Params),
    /// Text that may hold a JSON object.
    Text(String),
    /// Any other value. Always yields an empty mapping.
    Empty,
}

impl From<Params> for ParamsInput {
    fn from(map: Params) -> Self {
        Self::Map(map)
    }
}

impl From<&str> for ParamsInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ParamsInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for ParamsInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Map(map),
            Value::String(text) => Self::Text(text),
            _ => Self::Empty,
        }
    }
}

/// Applies the parse-on-assign rule for params.
///
/// ```
/// use herald_core::json::format_settings;
///
/// assert_eq!(format_settings(r#" {"a": 1} "#)["a"], 1);
/// assert!(format_settings("42").is_empty());
/// assert!(format_settings("[1, 2]").is_empty());
/// ```
pub fn format_settings(input: impl Into<ParamsInput>) -> Params {
    match input.into() {
        ParamsInput::Map(map) => map,
        ParamsInput::Text(text) => {
            let trimmed = text.trim();
            if trimmed.starts_with('{') && trimmed.ends_with('}') {
                decode(trimmed, DEFAULT_MAX_DEPTH)
            } else {
                Params::new()
            }
        }
        ParamsInput::Empty => Params::new(),
    }
}

/// Encodes a mapping as a JSON object string.
///
/// `<`, `>`, `&`, `'` and `"` inside strings are written as `\u00XX`
/// escapes so the result can be embedded in markup. Non-ASCII text is
/// written as-is. An empty mapping encodes to `""`.
pub fn encode(data: &Params, pretty: bool) -> String {
    if data.is_empty() {
        return String::new();
    }

    let mut buf = Vec::with_capacity(128);
    let result = if pretty {
        let formatter = HexEscape(PrettyFormatter::with_indent(b"    "));
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        data.serialize(&mut ser)
    } else {
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, HexEscape(CompactFormatter));
        data.serialize(&mut ser)
    };

    match result {
        Ok(()) => String::from_utf8(buf).unwrap_or_default(),
        Err(e) => {
            tracing::debug!(error = %e, "params encoding failed");
            String::new()
        }
    }
}

/// Decodes a JSON object string into a mapping.
///
/// Empty input, invalid JSON, non-object values, empty objects and
/// documents nested deeper than `max_depth` containers all yield an empty
/// mapping.
pub fn decode(data: &str, max_depth: usize) -> Params {
    if data.is_empty() {
        return Params::new();
    }

    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) if !map.is_empty() => {
            if object_depth(&map) > max_depth {
                tracing::debug!(max_depth, "params nesting too deep, discarding");
                Params::new()
            } else {
                map
            }
        }
        Ok(_) => Params::new(),
        Err(e) => {
            tracing::trace!(error = %e, "params decoding failed");
            Params::new()
        }
    }
}

fn object_depth(map: &Params) -> usize {
    1 + map.values().map(value_depth).max().unwrap_or(0)
}

fn value_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(value_depth).max().unwrap_or(0),
        Value::Object(map) => object_depth(map),
        _ => 0,
    }
}

/// Wraps a formatter, hex-escaping markup-sensitive characters in strings.
struct HexEscape<F>(F);

impl<F: Formatter> Formatter for HexEscape<F> {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object_key(writer, first)
    }

    fn end_object_key<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object_key(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped: &[u8] = match ch {
                '<' => b"\\u003C",
                '>' => b"\\u003E",
                '&' => b"\\u0026",
                '\'' => b"\\u0027",
                _ => continue,
            };
            if start < i {
                self.0.write_string_fragment(writer, &fragment[start..i])?;
            }
            writer.write_all(escaped)?;
            start = i + 1;
        }
        if start < fragment.len() {
            self.0.write_string_fragment(writer, &fragment[start..])?;
        }
        Ok(())
    }

    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match char_escape {
            CharEscape::Quote => writer.write_all(b"\\u0022"),
            other => self.0.write_char_escape(writer, other),
        }
    }
}
