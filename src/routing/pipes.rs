use std::collections::HashMap;

/// Supported coercion kinds for typed path parameters.
///
/// A path segment of the form `:name|kind` declares that the named parameter
/// is converted before the handler runs. The `|kind` suffix is stripped from
/// the path handed to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeKind {
    Number,
    String,
    Boolean,
}

impl PipeKind {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// A declared coercion for one named path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamPipe {
    pub name: String,
    pub kind: PipeKind,
}

/// A path parameter after coercion.
///
/// An invalid `number` input coerces to NaN; validating it stays the
/// handler's responsibility. `boolean` is true only for the literal string
/// `"true"`. Parameters without a declared pipe stay [`ParamValue::Text`].
#[derive(Debug, Clone)]
pub enum ParamValue {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl ParamValue {
    pub(crate) fn coerce(raw: &str, kind: PipeKind) -> Self {
        match kind {
            PipeKind::Number => Self::Number(raw.parse::<f64>().unwrap_or(f64::NAN)),
            PipeKind::Boolean => Self::Boolean(raw == "true"),
            PipeKind::String => Self::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The coerced path parameters of one request.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    params: HashMap<String, ParamValue>,
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Extract the pipe declarations from a path pattern.
pub(crate) fn detect_pipes(path: &str) -> Vec<ParamPipe> {
    path.split('/')
        .filter(|segment| segment.starts_with(':'))
        .filter_map(|segment| {
            let (name, kind) = segment.split_once('|')?;
            let kind = PipeKind::parse(kind)?;
            Some(ParamPipe {
                name: name[1..].to_string(),
                kind,
            })
        })
        .collect()
}

/// Remove recognized `|kind` suffixes so the router sees plain named
/// parameters. Unknown suffixes are left untouched.
pub(crate) fn strip_pipes(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with(':') {
                if let Some((name, kind)) = segment.split_once('|') {
                    if PipeKind::parse(kind).is_some() {
                        return name.to_string();
                    }
                }
            }
            segment.to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Coerce raw router parameters through the declared pipes.
pub(crate) fn coerce_params<'a>(
    raw: impl IntoIterator<Item = (&'a str, &'a str)>,
    pipes: &[ParamPipe],
) -> PathParams {
    let mut params = HashMap::new();
    for (name, value) in raw {
        let coerced = match pipes.iter().find(|pipe| pipe.name == name) {
            Some(pipe) => ParamValue::coerce(value, pipe.kind),
            None => ParamValue::Text(value.to_string()),
        };
        params.insert(name.to_string(), coerced);
    }
    PathParams { params }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_declared_pipes() {
        let pipes = detect_pipes("/movies/:year|number/r-rated/:isRate|boolean");
        assert_eq!(
            pipes,
            vec![
                ParamPipe {
                    name: "year".into(),
                    kind: PipeKind::Number
                },
                ParamPipe {
                    name: "isRate".into(),
                    kind: PipeKind::Boolean
                },
            ]
        );
    }

    #[test]
    fn unknown_kinds_are_not_pipes() {
        assert!(detect_pipes("/a/:id|uuid").is_empty());
    }

    #[test]
    fn strips_recognized_pipes_only() {
        assert_eq!(
            strip_pipes("/movies/:year|number/:slug|uuid"),
            "/movies/:year/:slug|uuid"
        );
    }

    #[test]
    fn number_coercion_yields_nan_on_invalid_input() {
        let value = ParamValue::coerce("abc", PipeKind::Number);
        assert!(value.as_number().unwrap().is_nan());

        let value = ParamValue::coerce("1997", PipeKind::Number);
        assert_eq!(value.as_number(), Some(1997.0));
    }

    #[test]
    fn boolean_coercion_accepts_only_the_literal_true() {
        assert_eq!(ParamValue::coerce("true", PipeKind::Boolean).as_bool(), Some(true));
        assert_eq!(ParamValue::coerce("TRUE", PipeKind::Boolean).as_bool(), Some(false));
        assert_eq!(ParamValue::coerce("1", PipeKind::Boolean).as_bool(), Some(false));
    }

    #[test]
    fn string_coercion_is_identity() {
        assert_eq!(ParamValue::coerce("x", PipeKind::String).as_str(), Some("x"));
    }

    #[test]
    fn undeclared_params_stay_text() {
        let pipes = detect_pipes("/movies/:year|number");
        let params = coerce_params([("year", "1997"), ("slug", "heat")], &pipes);
        assert_eq!(params.get("year").unwrap().as_number(), Some(1997.0));
        assert_eq!(params.get("slug").unwrap().as_str(), Some("heat"));
        assert_eq!(params.len(), 2);
    }
}
