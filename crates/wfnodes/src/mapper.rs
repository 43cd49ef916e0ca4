use async_trait::async_trait;
use serde_json::{Map, Value};
use wfcore::{ExecutionContext, NodeExecutionError, NodeHandler};
use wfruntime::NodeFactory;

/// Output-reshaping node registered under the reserved mapper
/// namespace. The `model` bound at resolution maps output field names
/// to dot-paths into the raw node output; non-string model values are
/// copied literally. An empty model passes the output through.
pub struct MapperNode {
    model: Map<String, Value>,
}

impl MapperNode {
    pub fn new(model: Map<String, Value>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl NodeHandler for MapperNode {
    async fn handle(
        &self,
        _ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        if self.model.is_empty() {
            return Ok(inputs.clone());
        }

        let mut reshaped = Map::new();
        for (field, selector) in &self.model {
            let value = match selector {
                Value::String(path) => lookup(inputs, path),
                literal => literal.clone(),
            };
            reshaped.insert(field.clone(), value);
        }

        Ok(Value::Object(reshaped))
    }
}

fn lookup(root: &Value, path: &str) -> Value {
    path.split('.')
        .fold(root.clone(), |acc, key| {
            acc.get(key).cloned().unwrap_or(Value::Null)
        })
}

pub struct MapperFactory;

impl NodeFactory for MapperFactory {
    fn create(&self, config: &Value) -> Result<Box<dyn NodeHandler>, wfcore::BuildError> {
        let model = config
            .get("model")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(MapperNode::new(model)))
    }

    fn node_name(&self) -> &str {
        "mapper@1.0.0"
    }

    fn description(&self) -> &str {
        "Reshape a node's output before it reaches the context"
    }
}
