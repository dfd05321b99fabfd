//! Graph-based Java to TypeScript source-to-source translation.
//!
//! Java source is parsed into an AST, lowered into a typed property graph,
//! rewritten by pattern rules until nothing matches, and rendered as
//! TypeScript. [`Engine`] ties the stages together.

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod formatters;
pub mod generator;
pub mod graph;
pub mod graph_builder;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod partition;
pub mod pattern;
pub mod rewriter;
pub mod rules;
pub mod stats;
pub mod types;
pub mod utils;

pub use config::EngineConfig;
pub use engine::{Conversion, Engine};
pub use error::{EngineError, Result, Warning};
pub use graph::CodeGraph;
pub use rewriter::{RewriteMode, Transformed};
pub use rules::{RuleDescriptor, RuleRepository, TransformationRule};
pub use stats::TransformationStats;

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `codebridge=info`. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("codebridge=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
