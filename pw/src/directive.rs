//! Directive grammar
//!
//! A directive is a `{{...}}` span. Spans are matched non-greedily and never
//! cross a `}}`; nesting is handled by the resolvers re-scanning, not here.
//!
//! ```text
//! {{key}}                  input substitution or file include
//! {{#comment}}             stripped before resolution
//! {{cap1, cap2}}           capability declaration (start of line 1 only)
//! {{func:name:arg:arg}}    function call, deferred to the dynamic phase
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::Inputs;

/// Any directive span
pub(crate) static SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("span regex"));

/// Authoring comments
pub(crate) static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{#.*?\}\}").expect("comment regex"));

/// Function spans left behind by the static phase
pub(crate) static FUNC_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(func:[^{}]+)\}\}").expect("function span regex"));

/// Capability declaration at the very start of a line
pub(crate) static CAPABILITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{(.*?)\}\}").expect("capability regex"));

const FUNC_PREFIX: &str = "func:";

/// A classified directive span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `{{#...}}`
    Comment(String),
    /// `{{func:name:args...}}`
    Call(FunctionCall),
    /// `{{name}}`, an input key or a template file name
    Name(String),
}

impl Directive {
    /// Classify the inner text of a span
    pub fn parse(inner: &str) -> Self {
        if let Some(comment) = inner.strip_prefix('#') {
            Directive::Comment(comment.to_string())
        } else if let Some(call) = FunctionCall::parse(inner) {
            Directive::Call(call)
        } else {
            Directive::Name(inner.to_string())
        }
    }
}

/// Whether the inner text of a span is a deferred function call
pub fn is_function(inner: &str) -> bool {
    inner.starts_with(FUNC_PREFIX)
}

/// A parsed `func:name:arg...` call with its raw argument tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<String>,
}

impl FunctionCall {
    /// Parse `func:name:arg1:arg2`; returns `None` without the `func:` head
    pub fn parse(inner: &str) -> Option<Self> {
        let rest = inner.strip_prefix(FUNC_PREFIX)?;
        let mut parts = rest.split(':');
        let name = parts.next().unwrap_or_default().to_string();
        let args = parts.map(str::to_string).collect();
        Some(Self { name, args })
    }

    /// Coerce every raw argument token against the template inputs
    pub fn coerce(&self, inputs: &Inputs) -> Vec<Arg> {
        self.args.iter().map(|token| Arg::coerce(token, inputs)).collect()
    }
}

/// A coerced function argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Int(i64),
    Str(String),
}

impl Arg {
    /// Coerce a raw token
    ///
    /// All-digit tokens become integers. A token naming an input with an
    /// integer value becomes that integer. Everything else stays a string.
    pub fn coerce(token: &str, inputs: &Inputs) -> Self {
        if !token.is_empty()
            && token.bytes().all(|b| b.is_ascii_digit())
            && let Ok(n) = token.parse::<i64>()
        {
            return Arg::Int(n);
        }
        if let Some(value) = inputs.get(token)
            && let Ok(n) = value.trim().parse::<i64>()
        {
            debug!(%token, %n, "Arg::coerce: resolved from input");
            return Arg::Int(n);
        }
        Arg::Str(token.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Int(_) => None,
            Arg::Str(s) => Some(s),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(n) => write!(f, "{}", n),
            Arg::Str(s) => f.write_str(s),
        }
    }
}

/// One end of a 1-based record range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `min`, the first record
    Min,
    /// `max`, the last record
    Max,
    Index(i64),
}

impl Bound {
    pub fn from_arg(arg: &Arg) -> Option<Self> {
        match arg {
            Arg::Int(n) => Some(Bound::Index(*n)),
            Arg::Str(s) if s == "min" => Some(Bound::Min),
            Arg::Str(s) if s == "max" => Some(Bound::Max),
            Arg::Str(_) => None,
        }
    }

    /// Resolve to a 1-based index against a sequence length
    pub fn resolve(self, len: usize) -> i64 {
        match self {
            Bound::Min => 1,
            Bound::Max => len as i64,
            Bound::Index(n) => n,
        }
    }
}

/// Replace every match of `re` in `text` with the result of `f`, stopping at the first error
pub(crate) fn try_replace<E>(
    re: &Regex,
    text: &str,
    mut f: impl FnMut(&Captures<'_>) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..m.start()]);
        out.push_str(&f(&caps)?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
