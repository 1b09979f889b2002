//! Parameter manifest (`params.yaml`)
//!
//! A nested mapping `stage -> parameter -> value`. The notebook executor's
//! templating cannot address plain sequences, so they are wrapped one level
//! deeper before the file is written.

use serde_yaml::{Mapping, Value};

/// Key plain sequences are nested under
pub const LIST_KEY: &str = "list";

/// Generated parameter manifest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterManifest {
    stages: Mapping,
}

impl ParameterManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parameters of a stage, replacing earlier ones
    pub fn set_stage(&mut self, stage: &str, params: Value) {
        self.stages.insert(Value::String(stage.to_string()), params);
    }

    /// Parameter names declared for a stage, in declaration order
    pub fn keys(&self, stage: &str) -> Vec<String> {
        match self.stages.get(stage) {
            Some(Value::Mapping(params)) => params
                .keys()
                .filter_map(|key| key.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The manifest with sequence values normalized
    pub fn normalized(&self) -> Mapping {
        let mut stages = self.stages.clone();
        normalize_sequences(&mut stages);
        stages
    }

    /// Serializes the normalized manifest
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.normalized())
    }
}

/// Wraps sequence values as `{list: {<key>: <sequence>}}`
///
/// Sequences made only of sequences (including the empty sequence) are left
/// untouched; mappings are walked recursively.
pub fn normalize_sequences(mapping: &mut Mapping) {
    for (key, value) in mapping.iter_mut() {
        match value {
            Value::Sequence(items) => {
                if items.iter().all(Value::is_sequence) {
                    continue;
                }
                let mut inner = Mapping::new();
                inner.insert(key.clone(), Value::Sequence(std::mem::take(items)));
                let mut wrapper = Mapping::new();
                wrapper.insert(Value::String(LIST_KEY.to_string()), Value::Mapping(inner));
                *value = Value::Mapping(wrapper);
            }
            Value::Mapping(inner) => normalize_sequences(inner),
            _ => {}
        }
    }
}
