//! JSON path builtins
//!
//! Thin shims over the injected [`JsonPathProvider`]. An unmatched path is
//! `Null`, never a failure.

use crate::engine::EngineConfig;
use crate::value::Value;

pub fn get(args: &[Value], config: &EngineConfig) -> Value {
    config
        .json_path_provider
        .get(&args[0], &args[1].to_string())
}

pub fn exists(args: &[Value], config: &EngineConfig) -> Value {
    Value::Bool(
        config
            .json_path_provider
            .exists(&args[0], &args[1].to_string()),
    )
}

pub fn size(args: &[Value], config: &EngineConfig) -> Value {
    Value::from(
        config
            .json_path_provider
            .size(&args[0], &args[1].to_string()),
    )
}

pub fn type_of(args: &[Value], config: &EngineConfig) -> Value {
    Value::Text(
        config
            .json_path_provider
            .type_of(&args[0], &args[1].to_string()),
    )
}
