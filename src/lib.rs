//! surplus-preprocessor: compiles JavaScript with inline markup
//! expressions into plain JavaScript plus Surplus runtime calls.
//!
//! # Pipeline
//!
//! 1. **Tokenize** — slice the input into markup punctuation and opaque
//!    text runs
//! 2. **Parse** — recursive descent into an AST of code segments
//!    interleaved with elements
//! 3. **Transform** — normalize whitespace, entities, property names
//! 4. **Generate** — emit JavaScript with calls into the Surplus runtime
//! 5. **Map** — strip location marks into Base64 VLQ source mappings
//!
//! The whole pipeline is synchronous and re-entrant; each call owns its
//! buffers.
//!
//! # Example
//!
//! ```
//! use surplus_preprocessor::{preprocess, Options, Output};
//!
//! let out = preprocess("let v = <div></div>;", &Options::default()).unwrap();
//! assert_eq!(
//!     out,
//!     Output::Source("let v = Surplus.createRootElement(\"div\");".to_string())
//! );
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

mod ast;
mod codegen;
mod entities;
mod error;
mod loc;
mod parser;
mod sourcemap;
mod token;
mod transform;

pub use ast::*;
pub use error::{ParseError, ParseErrorKind};
pub use loc::Loc;
pub use sourcemap::SourceMap;
pub use token::{tokenize, Token, TokenKind};

/// What to do with source-map information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// No map; return the plain output string.
    #[default]
    None,
    /// Return the output together with the map object.
    Extract,
    /// Append the map to the output as an inline data URL.
    Append,
}

/// Preprocessor options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Source-map handling; defaults to none.
    pub sourcemap: SourceMapMode,
    /// Name recorded as the map's source file.
    pub sourcefile: String,
    /// Name recorded as the map's output file.
    pub targetfile: String,
    /// `true` selects the JSX dialect (`{expr}`, `{...expr}`); `false`
    /// the `@`-prefixed native dialect.
    pub jsx: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sourcemap: SourceMapMode::None,
            sourcefile: "in.js".to_string(),
            targetfile: "out.js".to_string(),
            jsx: true,
        }
    }
}

/// Preprocessor output.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Plain output (modes `None` and `Append`).
    Source(String),
    /// Output plus extracted source map (mode `Extract`).
    SourceAndMap { src: String, map: SourceMap },
}

impl Output {
    /// The output source, whichever variant holds it.
    pub fn src(&self) -> &str {
        match self {
            Output::Source(src) => src,
            Output::SourceAndMap { src, .. } => src,
        }
    }

    /// Consume into the output source, discarding any map.
    pub fn into_src(self) -> String {
        match self {
            Output::Source(src) => src,
            Output::SourceAndMap { src, .. } => src,
        }
    }
}

/// Parse `source` into its markup AST without transforming it or
/// generating code.
pub fn parse(source: &str, options: &Options) -> Result<CodeTopLevel, ParseError> {
    let tokens = token::tokenize(source);
    parser::parse(source, tokens, options.jsx)
}

/// Apply the normalization pipeline to a parsed tree in place.
pub fn normalize(tree: &mut CodeTopLevel, options: &Options) {
    transform::normalize(tree, options.jsx);
}

/// Translate `source` into plain JavaScript.
///
/// Fails only on parse errors; the later stages are total over every
/// tree the parser can produce.
pub fn preprocess(source: &str, options: &Options) -> Result<Output, ParseError> {
    let tokens = token::tokenize(source);
    debug!(tokens = tokens.len(), jsx = options.jsx, "tokenized");

    let mut tree = parser::parse(source, tokens, options.jsx)?;
    debug!(segments = tree.segments.len(), "parsed");

    transform::normalize(&mut tree, options.jsx);
    let code = codegen::gen_code(&tree, options);
    debug!(bytes = code.len(), "generated");

    Ok(sourcemap::finalize(code, source, options))
}
