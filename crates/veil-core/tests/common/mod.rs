//! Shared helpers for integration tests

#![allow(dead_code)]

use tracing_subscriber::EnvFilter;
use veil_core::{ClassDefinition, FieldSet, Runtime, Scope, Value, VeilResult};

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Format the four fields of an `Example` as seen from the running method
pub fn describe_fields(scope: &mut Scope<'_>) -> VeilResult<Value> {
    let this = scope.private_this()?;
    let owner = scope.owner().expect("method declared in a class body");
    let statics = scope.private(&owner)?;

    let field1 = scope.get(&this, "field1")?;
    let field2 = scope.get(&statics, "field2")?;
    let field3 = scope.get(&this, "field3")?;
    let field4 = scope.get(&statics, "field4")?;
    Ok(Value::str(&format!(
        "field1={}, field2={}, field3={}, field4={}",
        field1, field2, field3, field4
    )))
}

/// Register the `Example` class
///
/// - private `field1 = "alpha"`
/// - static private `field2 = 0`
/// - protected `field3 = 42`
/// - protected static `field4 = "visible"`
pub fn register_example(rt: &mut Runtime) -> Value {
    rt.register(
        ClassDefinition::new("Example")
            .fields(|| {
                FieldSet::new()
                    .field("private field1", "alpha")
                    .field("static private field2", 0)
                    .field("protected field3", 42)
                    .field("protected static field4", "visible")
            })
            .method("print", |scope, _| describe_fields(scope))
            .method("field3", |scope, _| {
                let this = scope.private_this()?;
                scope.get(&this, "field3")
            })
            .method("bump", |scope, _| {
                let owner = scope.owner().expect("method declared in a class body");
                let statics = scope.private(&owner)?;
                let next = scope.get(&statics, "field2")?.as_int().unwrap_or(0) + 1;
                scope.set(&statics, "field2", Value::Int(next))?;
                Ok(Value::Int(next))
            }),
    )
    .expect("register Example")
}

/// Register `SubExample`, which overwrites `field3` and masks `field1` with a function
pub fn register_sub_example(rt: &mut Runtime, example: &Value) -> Value {
    rt.register(
        ClassDefinition::new("SubExample")
            .extends(example.clone())
            .fields(|| {
                FieldSet::new().function("private field1", |scope, _| {
                    let this = scope.private_this()?;
                    let field3 = scope.get(&this, "field3")?;
                    Ok(Value::str(&format!("sub field1 sees field3={}", field3)))
                })
            })
            .constructor(|scope, args| {
                scope.super_construct(args)?;
                let this = scope.private_this()?;
                scope.set(&this, "field3", Value::Int(21))
            })
            .method("field3", |scope, _| {
                let this = scope.private_this()?;
                scope.get(&this, "field3")
            })
            .method("superField3", |scope, _| scope.call_super("field3", &[]))
            .method("callField1", |scope, _| {
                let this = scope.private_this()?;
                scope.call_method(&this, "field1", &[])
            })
            .method("superPrint", |scope, _| scope.call_super("print", &[])),
    )
    .expect("register SubExample")
}
