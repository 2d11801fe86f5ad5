//! Parameter bindings: where each positional handler argument comes from.

use crate::error::AppError;
use crate::extractors::RequestSources;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Path,
    Query,
    Body,
    Header,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub source: Source,
    /// None only for body bindings that take the whole body.
    pub name: Option<String>,
}

impl Param {
    pub fn path(name: impl Into<String>) -> Self {
        Param {
            source: Source::Path,
            name: Some(name.into()),
        }
    }

    pub fn query(name: impl Into<String>) -> Self {
        Param {
            source: Source::Query,
            name: Some(name.into()),
        }
    }

    pub fn body(name: Option<&str>) -> Self {
        Param {
            source: Source::Body,
            name: name.map(str::to_string),
        }
    }

    pub fn header(name: impl Into<String>) -> Self {
        Param {
            source: Source::Header,
            name: Some(name.into()),
        }
    }

    /// Value of this binding in the request, `Null` when absent.
    pub fn extract(&self, sources: &RequestSources) -> Value {
        let name = self.name.as_deref();
        match (self.source, name) {
            (Source::Body, None) => sources.body.clone(),
            (Source::Body, Some(name)) => sources.body.get(name).cloned().unwrap_or(Value::Null),
            (Source::Path, Some(name)) => string_or_null(sources.path.get(name)),
            (Source::Query, Some(name)) => string_or_null(sources.query.get(name)),
            (Source::Header, Some(name)) => sources
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),
            (_, None) => Value::Null,
        }
    }
}

fn string_or_null(v: Option<&String>) -> Value {
    v.map(|s| Value::String(s.clone())).unwrap_or(Value::Null)
}

/// A binding declared for one handler argument.
#[derive(Clone, Debug)]
pub struct ParamBinding {
    pub handler: String,
    pub index: usize,
    pub param: Param,
}

/// Bindings of `handler`, ordered by index. Declaration order breaks ties.
pub fn bindings_for(all: &[ParamBinding], handler: &str) -> Vec<ParamBinding> {
    let mut bindings: Vec<ParamBinding> = all.iter().filter(|b| b.handler == handler).cloned().collect();
    bindings.sort_by_key(|b| b.index);
    bindings
}

/// Positional handler arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Args(values)
    }

    /// Extract `bindings` (sorted) from the request. Argument `i` is the binding declared at index `i`;
    /// gaps are `Null` and the first binding claiming an index wins.
    pub fn extract(bindings: &[ParamBinding], sources: &RequestSources) -> Self {
        let len = bindings.iter().map(|b| b.index + 1).max().unwrap_or(0);
        let mut slots: Vec<Option<Value>> = vec![None; len];
        for binding in bindings {
            let slot = &mut slots[binding.index];
            if slot.is_none() {
                *slot = Some(binding.param.extract(sources));
            }
        }
        Args(slots.into_iter().map(|v| v.unwrap_or(Value::Null)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value(&self, i: usize) -> &Value {
        self.0.get(i).unwrap_or(&Value::Null)
    }

    /// Deserialize argument `i`. Strings from path, query and headers are parsed as JSON
    /// when they do not fit `T` as-is, so "7" reads as a number.
    pub fn get<T: DeserializeOwned>(&self, i: usize) -> Result<T, AppError> {
        let value = self.value(i);
        match serde_json::from_value::<T>(value.clone()) {
            Ok(v) => Ok(v),
            Err(err) => match value {
                Value::String(s) => serde_json::from_str(s).map_err(|_| {
                    AppError::BadRequest(format!("Invalid argument {}: {}", i, err))
                }),
                _ => Err(AppError::BadRequest(format!("Invalid argument {}: {}", i, err))),
            },
        }
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(handler: &str, index: usize, param: Param) -> ParamBinding {
        ParamBinding {
            handler: handler.into(),
            index,
            param,
        }
    }

    fn sources() -> RequestSources {
        let mut s = RequestSources::default();
        s.path.insert("id".into(), "7".into());
        s.query.insert("q".into(), "wolves".into());
        s.headers.insert("x-request-id", "abc".parse().unwrap());
        s.body = json!({"a": 1});
        s
    }

    #[test]
    fn bindings_are_ordered_by_index_regardless_of_declaration() {
        let declared = vec![
            binding("update", 1, Param::body(None)),
            binding("other", 0, Param::query("q")),
            binding("update", 0, Param::path("id")),
        ];
        let bindings = bindings_for(&declared, "update");
        let args = Args::extract(&bindings, &sources());
        assert_eq!(args.get::<u32>(0).unwrap(), 7);
        assert_eq!(args.value(1), &json!({"a": 1}));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn missing_values_are_null() {
        let bindings = vec![
            binding("h", 0, Param::path("missing")),
            binding("h", 2, Param::body(Some("b"))),
        ];
        let args = Args::extract(&bindings, &sources());
        assert_eq!(args.into_inner(), vec![Value::Null, Value::Null, Value::Null]);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let value = Param::header("X-Request-ID").extract(&sources());
        assert_eq!(value, json!("abc"));
    }

    #[test]
    fn get_keeps_strings_and_reads_options() {
        let args = Args::new(vec![json!("7"), Value::Null]);
        assert_eq!(args.get::<String>(0).unwrap(), "7");
        assert_eq!(args.get::<Option<String>>(1).unwrap(), None);
        assert!(args.get::<u32>(1).is_err());
    }
}
