//! Host-side formatting of inserted suggestions.

/// Formats a selected key or value before it is appended to the query.
pub trait TokenFormatter {
    fn format_key(&self, field: &str) -> String {
        field.to_string()
    }

    fn format_value(&self, _field: &str, _method: &str, value: &str) -> String {
        value.to_string()
    }
}

/// Inserts selections verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl TokenFormatter for PlainFormatter {}

/// Wraps values of the equality method `:` in double quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualityQuoteFormatter;

impl TokenFormatter for EqualityQuoteFormatter {
    fn format_value(&self, _field: &str, method: &str, value: &str) -> String {
        if method == ":" {
            quote(value)
        } else {
            value.to_string()
        }
    }
}

/// Quotes `value` unless it already is a quoted string.
pub fn quote(value: &str) -> String {
    if is_quoted(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

pub fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

type KeyFn = Box<dyn Fn(&str) -> String>;
type ValueFn = Box<dyn Fn(&str, &str, &str) -> String>;

/// Formatter assembled from optional closures.
#[derive(Default)]
pub struct FnFormatter {
    key: Option<KeyFn>,
    value: Option<ValueFn>,
}

impl FnFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.key = Some(Box::new(f));
        self
    }

    pub fn with_value(mut self, f: impl Fn(&str, &str, &str) -> String + 'static) -> Self {
        self.value = Some(Box::new(f));
        self
    }
}

impl TokenFormatter for FnFormatter {
    fn format_key(&self, field: &str) -> String {
        match &self.key {
            Some(f) => f(field),
            None => field.to_string(),
        }
    }

    fn format_value(&self, field: &str, method: &str, value: &str) -> String {
        match &self.value {
            Some(f) => f(field, method, value),
            None => value.to_string(),
        }
    }
}
