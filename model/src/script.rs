//! Read-only method table for scripting front ends.
//!
//! Maps method names to native accessors. Built once at startup; nothing in
//! the replication path calls into it.

use std::collections::BTreeMap;

use crate::geometry::Point;
use crate::object::NetworkObject;

/// Value returned to a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f32),
    Point(Point),
    Points(Vec<Point>),
}

/// Native accessor.
pub type ScriptFn = fn(&NetworkObject) -> ScriptValue;

/// Name to accessor table.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<&'static str, ScriptFn>,
}

impl MethodRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard accessors.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("getClassId", |obj| {
            ScriptValue::Int(i64::from(obj.type_id().raw()))
        });
        registry.register("getTeamIndx", |obj| {
            ScriptValue::Int(i64::from(obj.team().index()))
        });
        registry.register("getLoc", |obj| ScriptValue::Point(obj.location()));
        registry.register("getGeom", |obj| ScriptValue::Points(obj.geometry().to_vec()));
        registry.register("getSlipAmount", |obj| float_scalar(obj, "slip_amount"));
        registry.register("hasFlag", |obj| bool_scalar(obj, "has_flag"));
        registry.register("getHealth", |obj| float_scalar(obj, "health"));
        registry
    }

    /// Adds or replaces a method, returning the previous one.
    pub fn register(&mut self, name: &'static str, method: ScriptFn) -> Option<ScriptFn> {
        self.methods.insert(name, method)
    }

    /// Calls a method by name. `None` if it is not registered.
    #[must_use]
    pub fn call(&self, name: &str, object: &NetworkObject) -> Option<ScriptValue> {
        self.methods.get(name).map(|method| method(object))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

fn float_scalar(object: &NetworkObject, name: &str) -> ScriptValue {
    object
        .scalar_by_name(name)
        .and_then(|v| v.as_float())
        .map_or(ScriptValue::Nil, ScriptValue::Float)
}

fn bool_scalar(object: &NetworkObject, name: &str) -> ScriptValue {
    object
        .scalar_by_name(name)
        .and_then(|v| v.as_bool())
        .map_or(ScriptValue::Nil, ScriptValue::Bool)
}
