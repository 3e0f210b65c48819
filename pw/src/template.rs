//! Templates and the static resolution phase
//!
//! Static resolution needs only the template inputs and the search path:
//!
//! 1. `{{key}}` for every input key is replaced by its value
//! 2. `{{#...}}` comments are deleted
//! 3. a `{{cap, cap}}` span at the start of line 1 becomes the capability list
//! 4. remaining spans are expanded until nothing changes: inputs are
//!    substituted, template files are included (resolved recursively with the
//!    same inputs), `func:` spans are left for the dynamic phase, and anything
//!    else is an [`PromptError::UnsupportedDirective`]
//! 5. the result is trimmed
//!
//! Input values are spliced in as opaque text: braces inside a value are never
//! read back as directives.

use std::fmt;

use tracing::{debug, info, warn};

use crate::Inputs;
use crate::config::Config;
use crate::directive::{self, CAPABILITY_RE, COMMENT_RE, Directive, SPAN_RE};
use crate::error::PromptError;
use crate::loader::PromptLoader;

// Input braces are held as private-use characters until resolution ends.
// Literal occurrences of any of the three are prefixed with MASK_ESCAPE.
const MASK_OPEN: char = '\u{E000}';
const MASK_CLOSE: char = '\u{E001}';
const MASK_ESCAPE: char = '\u{E002}';

/// Upper bound on full expansion passes over one document
const MAX_PASSES: usize = 64;

/// A template with its inputs and declared capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    content: String,
    inputs: Inputs,
    capabilities: Vec<String>,
}

impl Template {
    /// Build a template from another one, adding inputs
    ///
    /// Keys already present on `parent` keep the parent's value. Capabilities
    /// are copied, never re-extracted.
    pub fn derive(parent: &Template, inputs: Inputs) -> Self {
        debug!(new_inputs = inputs.len(), "Template::derive: called");
        let mut merged = inputs;
        merged.extend(parent.inputs.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            content: parent.content.clone(),
            inputs: merged,
            capabilities: parent.capabilities.clone(),
        }
    }

    pub(crate) fn with_content(&self, content: String) -> Self {
        Self {
            content,
            inputs: self.inputs.clone(),
            capabilities: self.capabilities.clone(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn input(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).map(String::as_str)
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Whether any `func:` spans remain for the dynamic phase
    pub fn has_functions(&self) -> bool {
        directive::FUNC_SPAN_RE.is_match(&self.content)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Runs the static phase against a template search path
#[derive(Debug, Clone)]
pub struct StaticResolver {
    loader: PromptLoader,
    max_include_depth: usize,
}

impl StaticResolver {
    pub fn new(loader: PromptLoader) -> Self {
        Self {
            loader,
            max_include_depth: crate::DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(PromptLoader::from_config(config))
            .with_max_include_depth(config.max_include_depth)
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Resolve inline template text
    pub fn resolve(&self, raw: &str, inputs: Inputs) -> Result<Template, PromptError> {
        debug!(raw_len = raw.len(), inputs = inputs.len(), "StaticResolver::resolve: called");
        self.resolve_with_stack(raw, inputs, Vec::new())
    }

    /// Load a template file by name and resolve it
    pub fn resolve_named(&self, name: &str, inputs: Inputs) -> Result<Template, PromptError> {
        debug!(%name, "StaticResolver::resolve_named: called");
        let raw = self.loader.load(name)?;
        self.resolve_with_stack(&raw, inputs, vec![name.to_string()])
    }

    /// Treat `text` as a template name if such a file exists, otherwise as inline content
    pub fn resolve_name_or_inline(
        &self,
        text: &str,
        inputs: Inputs,
    ) -> Result<Template, PromptError> {
        if self.loader.exists(text) {
            debug!(%text, "StaticResolver::resolve_name_or_inline: resolving as file");
            self.resolve_named(text, inputs)
        } else {
            debug!("StaticResolver::resolve_name_or_inline: resolving as inline content");
            self.resolve(text, inputs)
        }
    }

    fn resolve_with_stack(
        &self,
        raw: &str,
        inputs: Inputs,
        mut stack: Vec<String>,
    ) -> Result<Template, PromptError> {
        let mut capabilities = Vec::new();
        let content = self.resolve_content(raw, &inputs, &mut capabilities, &mut stack)?;
        let content = unmask(&content);
        info!(
            content_len = content.len(),
            ?capabilities,
            "Statically resolved template"
        );
        Ok(Template {
            content,
            inputs,
            capabilities,
        })
    }

    fn resolve_content(
        &self,
        raw: &str,
        inputs: &Inputs,
        capabilities: &mut Vec<String>,
        stack: &mut Vec<String>,
    ) -> Result<String, PromptError> {
        let content = substitute_inputs(&escape_reserved(raw), inputs);
        let content = COMMENT_RE.replace_all(&content, "");
        let mut content = extract_capabilities(&content, capabilities);

        let mut passes = 0;
        loop {
            let next = directive::try_replace(&SPAN_RE, &content, |caps| {
                self.expand(&caps[1], inputs, capabilities, stack)
            })?;
            if next == content {
                break;
            }
            content = next;
            passes += 1;
            if passes >= MAX_PASSES {
                warn!(passes, "Static expansion did not settle");
                let mut chain = stack.clone();
                chain.push(format!("<{} passes>", passes));
                return Err(PromptError::IncludeCycle { chain });
            }
        }
        debug!(passes, "StaticResolver::resolve_content: settled");

        Ok(content.trim().to_string())
    }

    fn expand(
        &self,
        inner: &str,
        inputs: &Inputs,
        capabilities: &mut Vec<String>,
        stack: &mut Vec<String>,
    ) -> Result<String, PromptError> {
        match Directive::parse(inner) {
            Directive::Call(_) => {
                debug!(%inner, "StaticResolver::expand: deferring function");
                Ok(format!("{{{{{}}}}}", inner))
            }
            Directive::Comment(_) => Ok(String::new()),
            Directive::Name(name) => {
                if let Some(value) = inputs.get(&name) {
                    return Ok(mask(value));
                }
                if self.loader.exists(&name) {
                    return self.include(&name, inputs, capabilities, stack);
                }
                warn!(directive = %name, "Unsupported directive");
                Err(PromptError::UnsupportedDirective { directive: name })
            }
        }
    }

    fn include(
        &self,
        name: &str,
        inputs: &Inputs,
        capabilities: &mut Vec<String>,
        stack: &mut Vec<String>,
    ) -> Result<String, PromptError> {
        if stack.iter().any(|n| n == name) || stack.len() >= self.max_include_depth {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            warn!(?chain, "Include cycle");
            return Err(PromptError::IncludeCycle { chain });
        }

        debug!(%name, depth = stack.len(), "StaticResolver::include: called");
        let raw = self.loader.load(name)?;
        stack.push(name.to_string());
        let result = self.resolve_content(&raw, inputs, capabilities, stack);
        stack.pop();
        result
    }
}

/// Resolve inline template text against `loader`
pub fn resolve_static(
    raw: &str,
    inputs: Inputs,
    loader: &PromptLoader,
) -> Result<Template, PromptError> {
    StaticResolver::new(loader.clone()).resolve(raw, inputs)
}

fn substitute_inputs(content: &str, inputs: &Inputs) -> String {
    inputs.iter().fold(content.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{}}}}}", key), &mask(value))
    })
}

/// Strip a leading capability span from line 1, recording its comma-separated tokens
fn extract_capabilities(content: &str, capabilities: &mut Vec<String>) -> String {
    let (first, rest) = match content.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (content, None),
    };

    let Some(caps) = CAPABILITY_RE.captures(first) else {
        return content.to_string();
    };
    let (Some(span), Some(inner)) = (caps.get(0), caps.get(1)) else {
        return content.to_string();
    };
    if directive::is_function(inner.as_str()) {
        return content.to_string();
    }

    let found: Vec<String> = inner
        .as_str()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    debug!(?found, "extract_capabilities: found");
    capabilities.extend(found);

    let stripped = &first[span.end()..];
    match rest {
        Some(rest) => format!("{}\n{}", stripped, rest),
        None => stripped.to_string(),
    }
}

fn is_reserved(c: char) -> bool {
    matches!(c, MASK_OPEN | MASK_CLOSE | MASK_ESCAPE)
}

fn escape_reserved(text: &str) -> String {
    if !text.chars().any(is_reserved) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if is_reserved(c) {
            out.push(MASK_ESCAPE);
        }
        out.push(c);
    }
    out
}

fn mask(value: &str) -> String {
    escape_reserved(value)
        .replace('{', &MASK_OPEN.to_string())
        .replace('}', &MASK_CLOSE.to_string())
}

fn unmask(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        match c {
            MASK_ESCAPE => out.push(chars.next().unwrap_or(MASK_ESCAPE)),
            MASK_OPEN => out.push('{'),
            MASK_CLOSE => out.push('}'),
            _ => out.push(c),
        }
    }
    out
}
