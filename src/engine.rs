//! The engine facade: typed pipeline operations and their JSON forms.
//!
//! An [`Engine`] owns nothing mutable. The rule repository is loaded once
//! and shared behind an `Arc`, so clones are cheap and can serve requests
//! from several threads; graphs are passed in and handed back by the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ast::{AstNode, Diagnostic, ParseOutput};
use crate::config::EngineConfig;
use crate::error::{Result, Warning};
use crate::generator;
use crate::graph::CodeGraph;
use crate::graph_builder;
use crate::parser;
use crate::rewriter::{self, Transformed};
use crate::rules::{RuleDescriptor, RuleRepository};
use crate::stats::{self, TransformationStats};

/// Output of the whole source-to-source pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<Warning>,
    pub stats: TransformationStats,
}

#[derive(Debug, Clone)]
pub struct Engine {
    rules: Arc<RuleRepository>,
    config: EngineConfig,
}

impl Engine {
    /// Engine over an already loaded rule catalog; `config` is validated.
    pub fn new(rules: Arc<RuleRepository>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { rules, config })
    }

    /// Validate `config` and load the rule catalog it names.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let rules = RuleRepository::load(&config)?;
        info!(rules = rules.len(), "engine ready");
        Self::new(Arc::new(rules), config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleRepository {
        &self.rules
    }

    pub fn parse(&self, source: &str) -> Result<ParseOutput> {
        parser::parse(source)
    }

    pub fn ast_to_graph(&self, ast: &AstNode) -> Result<CodeGraph> {
        graph_builder::build_graph(ast)
    }

    /// Run the automated rules the way the configuration asks for.
    pub fn transform_graph(&self, graph: CodeGraph) -> Result<Transformed> {
        let rules = self.rules.automated();
        let mode = self.config.mode();
        if self.config.parallel {
            rewriter::transform_partitioned(graph, &rules, mode)
        } else {
            rewriter::transform(graph, &rules, mode)
        }
    }

    /// Apply the best match of one rule; returns the created node ids.
    pub fn apply_transformation(&self, graph: &mut CodeGraph, rule_id: &str) -> Result<Vec<String>> {
        rewriter::apply_transformation(graph, &self.rules, rule_id)
    }

    pub fn list_rules(&self) -> Vec<RuleDescriptor> {
        self.rules.descriptors()
    }

    pub fn generate_code(&self, graph: &CodeGraph) -> Result<String> {
        generator::generate(graph)
    }

    pub fn get_stats(&self, graph: &CodeGraph) -> TransformationStats {
        stats::compute(graph, &self.rules)
    }

    /// Parse, build, transform and generate in one go.
    pub fn convert(&self, source: &str) -> Result<Conversion> {
        let parsed = self.parse(source)?;
        let graph = self.ast_to_graph(&parsed.ast)?;
        let transformed = self.transform_graph(graph)?;
        let code = self.generate_code(&transformed.graph)?;
        let stats = self.get_stats(&transformed.graph);
        info!(
            diagnostics = parsed.diagnostics.len(),
            applied = transformed.applied,
            confidence = stats.confidence,
            "conversion finished"
        );
        Ok(Conversion {
            code,
            diagnostics: parsed.diagnostics,
            warnings: transformed.warnings,
            stats,
        })
    }

    // ---- JSON boundary ----

    /// `{ast, diagnostics}`
    pub fn parse_json(&self, source: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.parse(source)?)?)
    }

    pub fn ast_to_graph_json(&self, ast_json: &str) -> Result<String> {
        let ast: AstNode = serde_json::from_str(ast_json)?;
        self.ast_to_graph(&ast)?.to_json()
    }

    /// The transformed graph, with `warnings` when the cap was hit.
    pub fn transform_graph_json(&self, graph_json: &str) -> Result<String> {
        let transformed = self.transform_graph(CodeGraph::from_json(graph_json)?)?;
        let mut data = transformed.graph.to_data();
        data.warnings = transformed.warnings;
        Ok(serde_json::to_string_pretty(&data)?)
    }

    pub fn apply_transformation_json(&self, graph_json: &str, rule_id: &str) -> Result<String> {
        let mut graph = CodeGraph::from_json(graph_json)?;
        self.apply_transformation(&mut graph, rule_id)?;
        graph.to_json()
    }

    pub fn list_rules_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.list_rules())?)
    }

    /// Plain TypeScript text, not JSON.
    pub fn generate_code_json(&self, graph_json: &str) -> Result<String> {
        self.generate_code(&CodeGraph::from_json(graph_json)?)
    }

    pub fn get_stats_json(&self, graph_json: &str) -> Result<String> {
        let graph = CodeGraph::from_json(graph_json)?;
        Ok(serde_json::to_string_pretty(&self.get_stats(&graph))?)
    }

    pub fn convert_json(&self, source: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.convert(source)?)?)
    }
}
