//! Built-in template functions
//!
//! Each `{{func:name:args}}` span dispatches to one [`Function`]. Handlers see
//! the record sequence, the template inputs, and both the raw and coerced
//! argument lists. Out-of-range indices are not errors; they produce empty
//! output.

use std::fmt::Write;

use chrono::{DateTime, Local};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::Inputs;
use crate::directive::{Arg, Bound, FunctionCall};
use crate::error::Diagnostic;
use crate::record::{self, RecordSequence};

/// Everything a function may read while resolving
#[derive(Debug, Clone)]
pub struct FunctionContext<'a> {
    pub records: &'a RecordSequence,
    pub inputs: &'a Inputs,
    pub now: DateTime<Local>,
    pub date_format: &'a str,
}

impl<'a> FunctionContext<'a> {
    pub fn new(records: &'a RecordSequence, inputs: &'a Inputs) -> Self {
        Self {
            records,
            inputs,
            now: Local::now(),
            date_format: crate::DEFAULT_DATE_FORMAT,
        }
    }
}

/// The fixed set of template functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `message` / `random_message`
    Message,
    Messages,
    Count,
    Last,
    First,
    Date,
    Input,
    Choice,
    If,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "message" | "random_message" => Some(Self::Message),
            "messages" => Some(Self::Messages),
            "count" => Some(Self::Count),
            "last" => Some(Self::Last),
            "first" => Some(Self::First),
            "date" => Some(Self::Date),
            "input" => Some(Self::Input),
            "choice" => Some(Self::Choice),
            "if" => Some(Self::If),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Messages => "messages",
            Self::Count => "count",
            Self::Last => "last",
            Self::First => "first",
            Self::Date => "date",
            Self::Input => "input",
            Self::Choice => "choice",
            Self::If => "if",
        }
    }

    /// Run this function over coerced arguments
    ///
    /// `raw` holds the same arguments as written, for `input` keys and `date`
    /// patterns.
    pub fn call<R: Rng + ?Sized>(
        &self,
        args: &[Arg],
        raw: &[String],
        ctx: &FunctionContext<'_>,
        rng: &mut R,
    ) -> Result<String, Diagnostic> {
        debug!(function = self.name(), ?args, "Function::call: called");
        match self {
            Self::Message => self.message(args, ctx.records, rng),
            Self::Messages => self.messages(args, ctx.records),
            Self::Count => Ok(ctx.records.len().to_string()),
            Self::Last => {
                let n = self.count_arg(args)?;
                Ok(record::join_contents(ctx.records.last(n)))
            }
            Self::First => {
                let n = self.count_arg(args)?;
                Ok(record::join_contents(ctx.records.first(n)))
            }
            Self::Date => self.date(raw, ctx),
            Self::Input => match raw {
                [] => Ok(String::new()),
                [key] => Ok(ctx.inputs.get(key).cloned().unwrap_or_default()),
                _ => Err(self.arity("0 or 1", raw.len())),
            },
            Self::Choice => Ok(args.choose(rng).map(Arg::to_string).unwrap_or_default()),
            Self::If => match args {
                [condition, then, otherwise] => {
                    let condition = condition.to_string().to_lowercase();
                    let truthy = matches!(condition.as_str(), "true" | "yes" | "1");
                    Ok(if truthy { then.to_string() } else { otherwise.to_string() })
                }
                _ => Err(self.arity("3", args.len())),
            },
        }
    }

    fn message<R: Rng + ?Sized>(
        &self,
        args: &[Arg],
        records: &RecordSequence,
        rng: &mut R,
    ) -> Result<String, Diagnostic> {
        match args {
            [] => Ok(pick(records.records(), rng)),
            [index] => {
                let index = self.bound(index)?.resolve(records.len());
                Ok(records.get(index).map(|r| r.content().to_string()).unwrap_or_default())
            }
            [start, end] => {
                let (start, end) = self.range(start, end, records.len())?;
                Ok(pick(records.window(start, end), rng))
            }
            _ => Err(self.arity("0, 1 or 2", args.len())),
        }
    }

    fn messages(&self, args: &[Arg], records: &RecordSequence) -> Result<String, Diagnostic> {
        let [start, end] = args else {
            return Err(self.arity("2", args.len()));
        };
        let (start, end) = self.range(start, end, records.len())?;
        Ok(record::join_contents(records.window(start, end)))
    }

    fn date(&self, raw: &[String], ctx: &FunctionContext<'_>) -> Result<String, Diagnostic> {
        // strftime patterns contain colons, which the call grammar splits on
        let pattern = if raw.is_empty() {
            ctx.date_format.to_string()
        } else {
            raw.join(":")
        };
        let mut out = String::new();
        write!(out, "{}", ctx.now.format(&pattern)).map_err(|_| Diagnostic::InvalidArgument {
            function: self.name().to_string(),
            arg: pattern.clone(),
        })?;
        Ok(out)
    }

    fn count_arg(&self, args: &[Arg]) -> Result<i64, Diagnostic> {
        match args {
            [] => Ok(1),
            [Arg::Int(n)] => Ok(*n),
            [Arg::Str(s)] => Err(self.invalid(s)),
            _ => Err(self.arity("0 or 1", args.len())),
        }
    }

    fn range(&self, start: &Arg, end: &Arg, len: usize) -> Result<(i64, i64), Diagnostic> {
        Ok((self.bound(start)?.resolve(len), self.bound(end)?.resolve(len)))
    }

    fn bound(&self, arg: &Arg) -> Result<Bound, Diagnostic> {
        Bound::from_arg(arg).ok_or_else(|| self.invalid(arg.as_str().unwrap_or_default()))
    }

    fn arity(&self, expected: &'static str, got: usize) -> Diagnostic {
        Diagnostic::WrongArity {
            function: self.name().to_string(),
            expected,
            got,
        }
    }

    fn invalid(&self, arg: &str) -> Diagnostic {
        Diagnostic::InvalidArgument {
            function: self.name().to_string(),
            arg: arg.to_string(),
        }
    }
}

fn pick<R: Rng + ?Sized>(records: &[record::Record], rng: &mut R) -> String {
    records
        .choose(rng)
        .map(|r| r.content().to_string())
        .unwrap_or_default()
}

/// Dispatch a parsed call; unknown names are reported, not fatal
pub fn dispatch<R: Rng + ?Sized>(
    call: &FunctionCall,
    ctx: &FunctionContext<'_>,
    rng: &mut R,
) -> Result<String, Diagnostic> {
    match Function::from_name(&call.name) {
        Some(function) => {
            let args = call.coerce(ctx.inputs);
            function.call(&args, &call.args, ctx, rng)
        }
        None => Err(Diagnostic::UnsupportedFunction {
            name: call.name.clone(),
        }),
    }
}
