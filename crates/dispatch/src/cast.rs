//! Typed conversion of pattern captures.
//!
//! Each command carries a [`TypeHints`] table, built once at registration
//! time from the handler's declared parameters. At dispatch time captured
//! strings run through the converter recorded for their parameter; absent
//! (unmatched optional) groups are never converted.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::CastError;

/// Declared type of a keyword parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "integer")]
    Int,
    Float,
    #[serde(alias = "boolean")]
    Bool,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => write!(f, "str"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

impl ParamType {
    pub fn converter(self) -> Converter {
        let convert: fn(&str) -> Result<ArgValue, String> = match self {
            Self::Str => convert_str,
            Self::Int => convert_int,
            Self::Float => convert_float,
            Self::Bool => convert_bool,
        };
        Converter {
            target: self,
            convert,
        }
    }
}

fn convert_str(raw: &str) -> Result<ArgValue, String> {
    Ok(ArgValue::Str(raw.to_string()))
}

fn convert_int(raw: &str) -> Result<ArgValue, String> {
    raw.trim()
        .parse::<i64>()
        .map(ArgValue::Int)
        .map_err(|e| e.to_string())
}

fn convert_float(raw: &str) -> Result<ArgValue, String> {
    raw.trim()
        .parse::<f64>()
        .map(ArgValue::Float)
        .map_err(|e| e.to_string())
}

fn convert_bool(raw: &str) -> Result<ArgValue, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(ArgValue::Bool(true)),
        "false" | "no" | "off" | "0" => Ok(ArgValue::Bool(false)),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}

/// Conversion function for one declared parameter type.
#[derive(Clone, Copy)]
pub struct Converter {
    pub target: ParamType,
    convert: fn(&str) -> Result<ArgValue, String>,
}

impl Converter {
    pub fn convert(&self, raw: &str) -> Result<ArgValue, String> {
        (self.convert)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Parameter name → converter.
pub type TypeHints = BTreeMap<String, Converter>;

/// Parameter name → captured text, `None` for an unmatched group.
pub type RawArgs = BTreeMap<String, Option<String>>;

/// A converted keyword argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Keyword arguments handed to a command handler.
///
/// Every named group of the command's pattern has an entry; unmatched
/// optional groups are present as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Args(BTreeMap<String, Option<ArgValue>>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<ArgValue>) {
        self.0.insert(name.into(), value);
    }

    /// The value for `name`, or `None` when the group was absent or unknown.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name).and_then(Option::as_ref)
    }

    /// True if the pattern declares `name`, whether or not it matched.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// True if `name` is declared but its group did not participate.
    pub fn is_absent(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(None))
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ArgValue>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Option<ArgValue>)> for Args {
    fn from_iter<I: IntoIterator<Item = (String, Option<ArgValue>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert captured groups using the recorded type hints.
///
/// Absent values stay absent. Present values are converted with the
/// converter recorded for their name, or kept as strings when none is.
/// The first failing conversion is returned as an error.
pub fn cast_with_type_hints(hints: &TypeHints, raw: RawArgs) -> Result<Args, CastError> {
    raw.into_iter()
        .map(|(name, value)| -> Result<(String, Option<ArgValue>), CastError> {
            let converted = match (value, hints.get(&name)) {
                (None, _) => None,
                (Some(text), None) => Some(ArgValue::Str(text)),
                (Some(text), Some(converter)) => {
                    Some(converter.convert(&text).map_err(|reason| CastError {
                        param: name.clone(),
                        value: text.clone(),
                        expected: converter.target,
                        reason,
                    })?)
                },
            };
            Ok((name, converted))
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn hints(entries: &[(&str, ParamType)]) -> TypeHints {
        entries
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.converter()))
            .collect()
    }

    fn raw(entries: &[(&str, Option<&str>)]) -> RawArgs {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn typed_present_value_is_converted_and_absent_stays_absent() {
        let args = cast_with_type_hints(
            &hints(&[("a", ParamType::Int)]),
            raw(&[("a", Some("5")), ("b", None)]),
        )
        .unwrap();
        assert_eq!(args.get("a"), Some(&ArgValue::Int(5)));
        assert!(args.contains("b"));
        assert!(args.is_absent("b"));
        assert_eq!(args.get("b"), None);
    }

    #[test]
    fn absent_value_is_never_converted_even_when_typed() {
        let args =
            cast_with_type_hints(&hints(&[("n", ParamType::Int)]), raw(&[("n", None)])).unwrap();
        assert!(args.is_absent("n"));
    }

    #[test]
    fn untyped_value_passes_through_as_string() {
        let args = cast_with_type_hints(&TypeHints::new(), raw(&[("who", Some("alice"))])).unwrap();
        assert_eq!(args.str("who"), Some("alice"));
    }

    #[test]
    fn failed_conversion_reports_parameter_and_value() {
        let err = cast_with_type_hints(
            &hints(&[("count", ParamType::Int)]),
            raw(&[("count", Some("many"))]),
        )
        .unwrap_err();
        assert_eq!(err.param, "count");
        assert_eq!(err.value, "many");
        assert_eq!(err.expected, ParamType::Int);
    }

    #[test]
    fn bool_and_float_converters() {
        let args = cast_with_type_hints(
            &hints(&[("loud", ParamType::Bool), ("ratio", ParamType::Float)]),
            raw(&[("loud", Some("Yes")), ("ratio", Some("0.5"))]),
        )
        .unwrap();
        assert_eq!(args.bool("loud"), Some(true));
        assert_eq!(args.float("ratio"), Some(0.5));
    }

    #[test]
    fn param_type_deserializes_from_lowercase_names() {
        let ty: ParamType = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(ty, ParamType::Int);
        let ty: ParamType = serde_json::from_str("\"str\"").unwrap();
        assert_eq!(ty, ParamType::Str);
    }
}
