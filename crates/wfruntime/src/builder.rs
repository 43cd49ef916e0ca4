use crate::resolver::NodeTypeResolver;
use serde_json::{Map, Value};
use std::collections::HashMap;
use wfcore::{BuildError, ConditionSpec, ResolvedNode, StepRef, WorkflowDocument};

/// Reserved namespace for mapper nodes. A `mapper` field is only
/// honored when its node reference lives under this prefix.
pub const MAPPER_NAMESPACE: &str = "mapper@";

/// Normalized, fully resolved execution graph for one request. Owns
/// every node instance for the request's lifetime; nothing in it is
/// shared with other requests.
#[derive(Debug)]
pub struct ExecutionGraph {
    pub steps: Vec<ResolvedNode>,
    pub nodes: HashMap<String, ResolvedEntry>,
}

/// One classified node-map entry plus its orthogonal mapper, if any.
#[derive(Debug)]
pub struct ResolvedEntry {
    pub shape: EntryShape,
    pub mapper: Option<ResolvedNode>,
}

/// Tagged result of the single classification pass over a raw node-map
/// entry. Downstream code matches on this and never re-inspects raw
/// document shape.
#[derive(Debug)]
pub enum EntryShape {
    /// Configuration for a step resolved at a higher level, copied
    /// verbatim (typically just `inputs`). No node resolution happens
    /// here.
    Plain { fields: Map<String, Value> },
    /// Nested ordered steps. `meta` carries the sibling fields of a
    /// flow-with-metadata entry, with `steps` stripped so it appears
    /// exactly once in the resolved output.
    Flow {
        steps: Vec<ResolvedNode>,
        meta: Map<String, Value>,
    },
    /// Ordered predicate branches; the first match runs.
    Conditional { conditions: Vec<ResolvedCondition> },
    /// Independent try and catch flows.
    TryCatch {
        try_steps: Vec<ResolvedNode>,
        catch_steps: Vec<ResolvedNode>,
    },
}

#[derive(Debug)]
pub struct ResolvedCondition {
    pub when: Option<String>,
    pub steps: Vec<ResolvedNode>,
}

/// Recursively walks a workflow document's node map, classifies each
/// entry and resolves every leaf reference, producing a normalized
/// execution graph. Runs once per request; there is no persistent
/// compiled plan.
pub struct GraphBuilder<'r> {
    resolver: &'r NodeTypeResolver,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(resolver: &'r NodeTypeResolver) -> Self {
        Self { resolver }
    }

    pub fn build(&self, document: &WorkflowDocument) -> Result<ExecutionGraph, BuildError> {
        if document.steps.is_empty() {
            return Err(BuildError::EmptyWorkflow);
        }

        let steps = self.resolve_steps(&document.steps)?;

        let mut nodes = HashMap::new();
        for (name, raw) in &document.nodes {
            nodes.insert(name.clone(), self.build_entry(name, raw)?);
        }

        Ok(ExecutionGraph { steps, nodes })
    }

    fn resolve_steps(&self, steps: &[StepRef]) -> Result<Vec<ResolvedNode>, BuildError> {
        steps.iter().map(|s| self.resolver.resolve(s)).collect()
    }

    /// Classify one entry. Precedence: flow-with-metadata > flow >
    /// conditions > try/catch > plain. The mapper is detected
    /// independently of the primary shape.
    fn build_entry(&self, name: &str, raw: &Value) -> Result<ResolvedEntry, BuildError> {
        let obj = raw.as_object().ok_or_else(|| {
            BuildError::InvalidDocument(format!("node entry '{}' must be an object", name))
        })?;

        let has_steps = obj.get("steps").map(Value::is_array).unwrap_or(false);
        let has_conditions = obj.get("conditions").map(Value::is_array).unwrap_or(false);
        let has_try_catch = branch_steps(obj.get("try")).is_some()
            && branch_steps(obj.get("catch")).is_some();

        let shape = if has_steps && obj.len() > 1 {
            let steps = self.parse_flow(name, &obj["steps"])?;
            let mut meta = obj.clone();
            meta.remove("steps");
            meta.remove("mapper");
            EntryShape::Flow { steps, meta }
        } else if has_steps {
            EntryShape::Flow {
                steps: self.parse_flow(name, &obj["steps"])?,
                meta: Map::new(),
            }
        } else if has_conditions {
            EntryShape::Conditional {
                conditions: self.parse_conditions(name, &obj["conditions"])?,
            }
        } else if has_try_catch {
            EntryShape::TryCatch {
                try_steps: self.parse_flow(name, branch_steps(obj.get("try")).unwrap())?,
                catch_steps: self.parse_flow(name, branch_steps(obj.get("catch")).unwrap())?,
            }
        } else {
            EntryShape::Plain { fields: obj.clone() }
        };

        Ok(ResolvedEntry {
            shape,
            mapper: self.resolve_mapper(name, obj)?,
        })
    }

    fn parse_flow(&self, name: &str, raw: &Value) -> Result<Vec<ResolvedNode>, BuildError> {
        let steps: Vec<StepRef> = serde_json::from_value(raw.clone())
            .map_err(|e| BuildError::InvalidDocument(format!("entry '{}': {}", name, e)))?;
        self.resolve_steps(&steps)
    }

    fn parse_conditions(
        &self,
        name: &str,
        raw: &Value,
    ) -> Result<Vec<ResolvedCondition>, BuildError> {
        let specs: Vec<ConditionSpec> = serde_json::from_value(raw.clone())
            .map_err(|e| BuildError::InvalidDocument(format!("entry '{}': {}", name, e)))?;

        specs
            .into_iter()
            .map(|spec| {
                Ok(ResolvedCondition {
                    when: spec.when,
                    steps: self.resolve_steps(&spec.steps)?,
                })
            })
            .collect()
    }

    /// A `mapper` field shaped like a step reference, with its node in
    /// the reserved mapper namespace, resolves like any other leaf and
    /// attaches to the entry regardless of the primary shape.
    fn resolve_mapper(
        &self,
        name: &str,
        obj: &Map<String, Value>,
    ) -> Result<Option<ResolvedNode>, BuildError> {
        let Some(raw) = obj.get("mapper") else {
            return Ok(None);
        };

        let looks_like_step = raw.get("name").is_some()
            && raw.get("type").is_some()
            && raw
                .get("node")
                .and_then(Value::as_str)
                .map(|n| n.starts_with(MAPPER_NAMESPACE))
                .unwrap_or(false);

        if !looks_like_step {
            return Ok(None);
        }

        let step: StepRef = serde_json::from_value(raw.clone())
            .map_err(|e| BuildError::InvalidDocument(format!("entry '{}' mapper: {}", name, e)))?;

        Ok(Some(self.resolver.resolve(&step)?))
    }
}

fn branch_steps(branch: Option<&Value>) -> Option<&Value> {
    branch?.get("steps").filter(|s| s.is_array())
}
