//! Engine: parse cache, constant loading and the sub-rule sequencer
//!
//! The engine owns the only process-wide mutable state, an LRU cache of
//! parsed documents keyed by the YAML text. Everything else an evaluation
//! touches lives in its own [`EvaluationContext`], so concurrent evaluations
//! are fully isolated.

use crate::constants;
use crate::context::EvaluationContext;
use crate::document::{ConditionalBlock, RuleBody, RuleDocument};
use crate::error::{Diagnostic, Error, Result};
use crate::eval::Evaluator;
use crate::providers::{
    Clock, ConstantProvider, DottedPathProvider, EmptyConstantProvider, JsonPathProvider,
    NoRestProvider, RestProvider, SystemClock,
};
use crate::value::Value;
use lru::LruCache;
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// External collaborators and tunables, passed to [`Engine::new`].
#[derive(Clone)]
pub struct EngineConfig {
    pub constant_provider: Arc<dyn ConstantProvider>,
    pub rest_provider: Arc<dyn RestProvider>,
    pub json_path_provider: Arc<dyn JsonPathProvider>,
    pub clock: Arc<dyn Clock>,
    /// Bounded capacity of the parse cache.
    pub cache_capacity: NonZeroUsize,
    /// Timeout handed to REST calls that do not pass their own.
    pub rest_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            constant_provider: Arc::new(EmptyConstantProvider),
            rest_provider: Arc::new(NoRestProvider),
            json_path_provider: Arc::new(DottedPathProvider),
            clock: Arc::new(SystemClock),
            cache_capacity: NonZeroUsize::new(256).expect("non-zero"),
            rest_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    pub fn with_constant_provider(mut self, provider: Arc<dyn ConstantProvider>) -> Self {
        self.constant_provider = provider;
        self
    }

    pub fn with_rest_provider(mut self, provider: Arc<dyn RestProvider>) -> Self {
        self.rest_provider = provider;
        self
    }

    pub fn with_json_path_provider(mut self, provider: Arc<dyn JsonPathProvider>) -> Self {
        self.json_path_provider = provider;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Result envelope of one evaluation. Errors are in-band: a parse failure or
/// missing constant comes back as `success = false`, never as a panic or an
/// `Err` from the entry points.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub success: bool,
    pub condition_met: bool,
    pub output_data: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub circuit_breaker_triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_message: Option<String>,
    pub execution_time_ms: u64,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

/// The rules engine. Cheap to share behind an `Arc`; safe for concurrent
/// evaluations.
pub struct Engine {
    config: EngineConfig,
    cache: Mutex<LruCache<String, Arc<RuleDocument>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let cache = Mutex::new(LruCache::new(config.cache_capacity));
        Self { config, cache }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a rule document, reusing the cached parse for repeated text.
    pub fn parse_document(&self, yaml_text: &str) -> Result<Arc<RuleDocument>> {
        {
            let mut cache = self.cache.lock().expect("parse cache poisoned");
            if let Some(doc) = cache.get(yaml_text) {
                return Ok(doc.clone());
            }
        }

        let doc = Arc::new(RuleDocument::parse(yaml_text)?);

        {
            let mut cache = self.cache.lock().expect("parse cache poisoned");
            cache.put(yaml_text.to_string(), doc.clone());
        }
        Ok(doc)
    }

    /// Evaluate a YAML rule document against a map of input values.
    ///
    /// The only await point is the constant fetch; rule execution itself is
    /// synchronous and deterministic.
    pub async fn evaluate(
        &self,
        yaml_text: &str,
        inputs: &BTreeMap<String, Value>,
    ) -> EvaluationResult {
        let started = Instant::now();
        let operation_id = uuid::Uuid::new_v4().to_string();

        let document = match self.parse_document(yaml_text) {
            Ok(document) => document,
            Err(error) => {
                return Self::failure(error, Vec::new(), started, operation_id);
            }
        };

        self.evaluate_document(&document, inputs, started, operation_id)
            .await
    }

    async fn evaluate_document(
        &self,
        document: &RuleDocument,
        inputs: &BTreeMap<String, Value>,
        started: Instant,
        operation_id: String,
    ) -> EvaluationResult {
        tracing::debug!(rule = %document.name, operation_id = %operation_id, "evaluating rule document");

        let mut ctx = EvaluationContext::new(self.config.clock.now(), operation_id.clone());
        for diagnostic in &document.diagnostics {
            ctx.add_diagnostic(diagnostic.clone());
        }
        for (name, value) in inputs {
            ctx.set_input(name, value.clone());
        }

        match constants::load_constants(document, self.config.constant_provider.as_ref()).await {
            Ok(values) => {
                for (code, value) in values {
                    ctx.set_constant(code, value);
                }
            }
            Err(error) => {
                return Self::failure(error, ctx.into_diagnostics(), started, operation_id);
            }
        }

        let mut evaluator = Evaluator::new(&mut ctx, &self.config)
            .with_circuit_breaker(document.circuit_breaker.enabled);

        let mut condition_met = false;
        match &document.body {
            RuleBody::Single(block) => {
                condition_met = Self::run_block(&mut evaluator, block);
            }
            RuleBody::Multi(rules) => {
                for rule in rules {
                    if evaluator.ctx.circuit_breaker_triggered() {
                        tracing::debug!(rule = %rule.name, "skipped: circuit breaker triggered");
                        break;
                    }
                    let met = Self::run_block(&mut evaluator, &rule.block);
                    tracing::debug!(rule = %rule.name, condition_met = met, "sub-rule evaluated");
                    condition_met |= met;
                }
            }
        }

        // Output projection: declared outputs resolve computed > input >
        // constant; names never written are omitted. A document with no
        // output block exposes every computed variable.
        let mut output_data = BTreeMap::new();
        if document.outputs.is_empty() {
            output_data = ctx.computed().clone();
        } else {
            for (name, _) in &document.outputs {
                if let Some(value) = ctx.lookup(name) {
                    output_data.insert(name.clone(), value.clone());
                }
            }
        }

        EvaluationResult {
            success: true,
            condition_met,
            output_data,
            error: None,
            circuit_breaker_triggered: ctx.circuit_breaker_triggered(),
            circuit_breaker_message: ctx.circuit_breaker_message().map(String::from),
            execution_time_ms: started.elapsed().as_millis() as u64,
            operation_id,
            warnings: ctx.into_diagnostics(),
        }
    }

    /// Blocking wrapper around [`Self::evaluate`] for synchronous callers.
    /// Do not call from inside an async runtime.
    pub fn evaluate_blocking(
        &self,
        yaml_text: &str,
        inputs: &BTreeMap<String, Value>,
    ) -> EvaluationResult {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("failed to build blocking runtime");
        runtime.block_on(self.evaluate(yaml_text, inputs))
    }

    fn run_block(evaluator: &mut Evaluator<'_>, block: &ConditionalBlock) -> bool {
        let met = match &block.when {
            Some(condition) => evaluator.eval_condition(condition),
            None => true,
        };
        if met {
            evaluator.execute_actions(&block.then_actions);
        } else {
            evaluator.execute_actions(&block.else_actions);
        }
        met
    }

    fn failure(
        error: Error,
        warnings: Vec<Diagnostic>,
        started: Instant,
        operation_id: String,
    ) -> EvaluationResult {
        tracing::warn!(operation_id = %operation_id, code = %error.code(), "evaluation failed: {}", error);
        EvaluationResult {
            success: false,
            condition_met: false,
            output_data: BTreeMap::new(),
            error: Some(error.to_string()),
            circuit_breaker_triggered: false,
            circuit_breaker_message: None,
            execution_time_ms: started.elapsed().as_millis() as u64,
            operation_id,
            warnings,
        }
    }
}
