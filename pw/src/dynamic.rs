//! Dynamic resolution phase
//!
//! Runs once a record sequence is available. Every `{{func:...}}` span left by
//! the static phase is replaced in a single pass. Failures never abort: the
//! span becomes an empty string and a [`Diagnostic`] is recorded.

use chrono::{DateTime, Local};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::directive::{FUNC_SPAN_RE, FunctionCall};
use crate::error::Diagnostic;
use crate::functions::{self, FunctionContext};
use crate::record::RecordSequence;
use crate::template::Template;

/// A dynamically resolved template and the problems met along the way
#[derive(Debug, Clone)]
pub struct Resolution {
    pub template: Template,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// No function reported a problem
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn content(&self) -> &str {
        self.template.content()
    }
}

/// Options for a dynamic pass
#[derive(Debug, Clone)]
pub struct DynamicOptions {
    /// Clock reading used by `func:date`
    pub now: DateTime<Local>,
    /// Pattern used by `func:date` without arguments
    pub date_format: String,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            now: Local::now(),
            date_format: crate::DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl DynamicOptions {
    pub fn from_config(config: &crate::Config) -> Self {
        Self {
            date_format: config.date_format.clone(),
            ..Default::default()
        }
    }
}

/// Resolve `func:` spans using the thread-local RNG
pub fn resolve_dynamic(template: &Template, records: &RecordSequence) -> Resolution {
    resolve_dynamic_with(template, records, &DynamicOptions::default(), &mut rand::rng())
}

/// Resolve `func:` spans with explicit options and randomness
pub fn resolve_dynamic_with<R: Rng + ?Sized>(
    template: &Template,
    records: &RecordSequence,
    options: &DynamicOptions,
    rng: &mut R,
) -> Resolution {
    debug!(records = records.len(), "resolve_dynamic: called");
    let ctx = FunctionContext {
        records,
        inputs: template.inputs(),
        now: options.now,
        date_format: &options.date_format,
    };

    let mut diagnostics = Vec::new();
    let content = FUNC_SPAN_RE.replace_all(template.content(), |caps: &regex::Captures<'_>| {
        let inner = &caps[1];
        let Some(call) = FunctionCall::parse(inner) else {
            return String::new();
        };
        match functions::dispatch(&call, &ctx, &mut *rng) {
            Ok(value) => value,
            Err(diag) => {
                warn!(directive = %inner, "{}", diag);
                diagnostics.push(diag);
                String::new()
            }
        }
    });

    info!(
        content_len = content.len(),
        diagnostics = diagnostics.len(),
        "Dynamically resolved template"
    );
    Resolution {
        template: template.with_content(content.into_owned()),
        diagnostics,
    }
}
