//! promptweave - two-phase directive resolution for prompt templates
//!
//! Templates embed `{{...}}` directives. The static phase resolves inputs,
//! comments, capability tags and file includes; the dynamic phase evaluates
//! `{{func:...}}` calls against a conversation's records.
//!
//! # Example
//!
//! ```ignore
//! use promptweave::{
//!     Inputs, PromptLoader, Record, RecordSequence, resolve_dynamic, resolve_static,
//! };
//!
//! let loader = PromptLoader::new(["prompts"]);
//! let inputs: Inputs = [("name".to_string(), "Ada".to_string())].into_iter().collect();
//! let raw = "Hello, {{name}}! {{func:count}} turns so far.";
//! let template = resolve_static(raw, inputs, &loader)?;
//!
//! let records: RecordSequence = vec![Record::user("hi")].into_iter().collect();
//! let resolved = resolve_dynamic(&template, &records);
//! assert_eq!(resolved.content(), "Hello, Ada! 1 turns so far.");
//! ```

use std::collections::BTreeMap;

pub mod config;
pub mod directive;
mod dynamic;
mod error;
pub mod functions;
mod loader;
mod record;
mod template;

pub use config::Config;
pub use directive::{Arg, Bound, Directive, FunctionCall};
pub use dynamic::{DynamicOptions, Resolution, resolve_dynamic, resolve_dynamic_with};
pub use error::{Diagnostic, PromptError};
pub use functions::{Function, FunctionContext};
pub use loader::PromptLoader;
pub use record::{Record, RecordSequence};
pub use template::{StaticResolver, Template, resolve_static};

/// Template input values by key
pub type Inputs = BTreeMap<String, String>;

/// Extension tried after a bare template name
pub const DEFAULT_EXTENSION: &str = "txt";

/// Default nesting bound for file includes
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Default `func:date` pattern
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
