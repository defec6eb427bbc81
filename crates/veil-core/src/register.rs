//! Class registration and wrapping
//!
//! Registering a class body creates its instance and static declaration
//! layers (chained to the parent's), its instance template and static
//! storage frames (chained likewise), runs the field supplier once and
//! routes each parsed field either into a layer plus frame (private and
//! protected) or onto the class's ordinary members (public). Methods,
//! accessors and function-valued fields become managed functions carrying
//! the class's declaring contexts. Both layers are locked afterwards.

use std::rc::Rc;

use crate::class::{ClassDefinition, ConstructorFn, FieldValue, NativeFn};
use crate::error::{VeilError, VeilResult};
use crate::modifiers::FieldSpec;
use crate::object::{ClassData, ClassSlots, FunctionBody, FunctionData, PublicField};
use crate::registry::{LayerId, Side};
use crate::runtime::Runtime;
use crate::scope::Scope;
use crate::stack::{Caller, DeclaringContextSet};
use crate::store::FrameKind;
use crate::value::{ClassId, FunctionId, Value, ViewTarget};
use tracing::debug;

/// Members of a class body other than fields and constructor
struct MemberBodies {
    methods: Vec<(String, NativeFn)>,
    static_methods: Vec<(String, NativeFn)>,
    getters: Vec<(String, NativeFn)>,
    setters: Vec<(String, NativeFn)>,
}

/// Constructor of a class body that declares none
fn forward_to_parent(scope: &mut Scope<'_>, args: &[Value]) -> VeilResult<()> {
    if scope.has_superclass()? {
        scope.super_construct(args)
    } else {
        Ok(())
    }
}

impl Runtime {
    /// Register a class body as a managed class
    ///
    /// # Errors
    ///
    /// - `InvalidTarget` if `extends` is not a class
    /// - `UnregisteredConstructor` if the base class is neither registered
    ///   nor wrapped
    /// - `InvalidFieldSpec` for a malformed or duplicate field key
    pub fn register(&mut self, definition: ClassDefinition) -> VeilResult<Value> {
        let ClassDefinition {
            name,
            extends,
            supplier,
            constructor,
            methods,
            static_methods,
            getters,
            setters,
        } = definition;

        let parent = self.resolve_base(&name, extends.as_ref(), true)?;
        let fields = match supplier {
            Some(supply) => supply().into_entries(),
            None => Vec::new(),
        };
        let fields = self.parse_fields(fields)?;

        let parent_slots = match parent {
            Some(parent) => self.heap.class(parent)?.slots,
            None => None,
        };
        let slots = ClassSlots {
            instance_layer: self.declarations.create_layer(
                &name,
                Side::Instance,
                parent_slots.map_or(LayerId::ROOT, |s| s.instance_layer),
            ),
            static_layer: self.declarations.create_layer(
                &name,
                Side::Static,
                parent_slots.map_or(LayerId::ROOT, |s| s.static_layer),
            ),
            instance_template: self
                .stores
                .create_frame(FrameKind::Template, parent_slots.map(|s| s.instance_template)),
            static_store: self
                .stores
                .create_frame(FrameKind::Static, parent_slots.map(|s| s.static_store)),
        };

        let mut data = ClassData::new(&name, parent);
        data.slots = Some(slots);
        let class = self.heap.push_class(data);

        let bodies = MemberBodies {
            methods,
            static_methods,
            getters,
            setters,
        };
        let result = self.populate_managed(class, slots, fields, bodies, constructor);
        self.declarations.lock(slots.instance_layer);
        self.declarations.lock(slots.static_layer);
        let managed = result?;

        debug!(
            class = %name,
            parent = ?parent.map(|p| self.heap.class_name(p)),
            managed_fields = managed,
            "registered class"
        );
        Ok(Value::Class(class))
    }

    /// Define a raw (unmanaged) class
    ///
    /// Raw classes have only public members. They cannot be constructed or
    /// extended by a managed class until wrapped.
    pub fn define_class(&mut self, definition: ClassDefinition) -> VeilResult<Value> {
        let ClassDefinition {
            name,
            extends,
            supplier,
            constructor,
            methods,
            static_methods,
            getters,
            setters,
        } = definition;

        let parent = self.resolve_base(&name, extends.as_ref(), false)?;
        let fields = match supplier {
            Some(supply) => supply().into_entries(),
            None => Vec::new(),
        };
        let fields = self.parse_fields(fields)?;
        if let Some((spec, _)) = fields.iter().find(|(spec, _)| spec.is_managed()) {
            return Err(VeilError::InvalidFieldSpec {
                spec: spec.name.clone(),
                reason: format!("{} is not registered and cannot hold managed fields", name),
            });
        }

        let class = self.heap.push_class(ClassData::new(&name, parent));
        let contexts = DeclaringContextSet::empty();
        for (spec, value) in fields {
            let value = self.field_value(class, &spec.name, value, &contexts);
            self.define_public(class, &spec, value)?;
        }

        let bodies = MemberBodies {
            methods,
            static_methods,
            getters,
            setters,
        };
        self.install_members(class, &contexts, bodies)?;
        if let Some(body) = constructor {
            let function = self.heap.push_function(FunctionData {
                name: name.clone(),
                owner: Some(class),
                contexts,
                body: FunctionBody::Constructor(body),
            });
            self.heap.class_mut(class)?.constructor = Some(function);
        }

        debug!(class = %name, "defined raw class");
        Ok(Value::Class(class))
    }

    /// Make a raw class extendable by managed classes
    ///
    /// Already managed classes are returned unchanged. With an accessor
    /// context, the class adopts that context's declaration layers and
    /// storage; the caller must be allowed to open the accessor's private
    /// view.
    pub(crate) fn wrap_base(
        &mut self,
        caller: &Caller,
        base: &Value,
        accessor: Option<&Value>,
    ) -> VeilResult<Value> {
        let Value::Class(class) = base else {
            return Err(VeilError::NotCallable(format!(
                "{} cannot be wrapped for inheritance",
                base.type_name()
            )));
        };
        let class = *class;
        if self.heap.class(class)?.is_managed() {
            return Ok(base.clone());
        }

        let slots = match accessor {
            Some(context) => self.accessor_slots(caller, context)?,
            None => self.inherited_slots(class)?,
        };
        self.heap.class_mut(class)?.slots = Some(slots);

        debug!(
            class = %self.heap.class_name(class),
            shared_context = accessor.is_some(),
            "wrapped raw class"
        );
        Ok(base.clone())
    }

    /// Fresh slots chained to the nearest managed ancestor of a raw class
    fn inherited_slots(&mut self, class: ClassId) -> VeilResult<ClassSlots> {
        let ancestor = self
            .heap
            .lineage(class)
            .skip(1)
            .find_map(|(_, data)| data.slots);
        let Some(ancestor) = ancestor else {
            return Ok(ClassSlots {
                instance_layer: LayerId::ROOT,
                static_layer: LayerId::ROOT,
                instance_template: self.stores.create_frame(FrameKind::Template, None),
                static_store: self.stores.create_frame(FrameKind::Static, None),
            });
        };

        let name = self.heap.class_name(class);
        let instance_layer =
            self.declarations
                .create_layer(&name, Side::Instance, ancestor.instance_layer);
        let static_layer = self
            .declarations
            .create_layer(&name, Side::Static, ancestor.static_layer);
        self.declarations.lock(instance_layer);
        self.declarations.lock(static_layer);

        Ok(ClassSlots {
            instance_layer,
            static_layer,
            instance_template: self
                .stores
                .create_frame(FrameKind::Template, Some(ancestor.instance_template)),
            static_store: self
                .stores
                .create_frame(FrameKind::Static, Some(ancestor.static_store)),
        })
    }

    fn accessor_slots(&self, caller: &Caller, context: &Value) -> VeilResult<ClassSlots> {
        let view = self.authorize_view(caller, context)?;
        let class = match view.target() {
            ViewTarget::Instance(object) => self.heap.object(object)?.class,
            ViewTarget::Static(class) => class,
        };
        self.heap
            .class(class)?
            .slots
            .ok_or_else(|| VeilError::UnregisteredConstructor {
                class: self.heap.class_name(class),
            })
    }

    fn resolve_base(
        &self,
        name: &str,
        extends: Option<&Value>,
        require_managed: bool,
    ) -> VeilResult<Option<ClassId>> {
        match extends {
            None => Ok(None),
            Some(Value::Class(id)) => {
                let base = self.heap.class(*id)?;
                if require_managed && !base.is_managed() {
                    return Err(VeilError::UnregisteredConstructor {
                        class: base.name.clone(),
                    });
                }
                Ok(Some(*id))
            }
            Some(other) => Err(VeilError::InvalidTarget(format!(
                "{} cannot extend {}",
                name,
                other.type_name()
            ))),
        }
    }

    fn parse_fields(&self, entries: Vec<(String, FieldValue)>) -> VeilResult<Vec<(FieldSpec, FieldValue)>> {
        let strict = self.config.strict_modifiers;
        entries
            .into_iter()
            .map(|(key, value)| FieldSpec::parse(&key, strict).map(|spec| (spec, value)))
            .collect()
    }

    /// Fill in a freshly created managed class; returns the managed field count
    fn populate_managed(
        &mut self,
        class: ClassId,
        slots: ClassSlots,
        fields: Vec<(FieldSpec, FieldValue)>,
        bodies: MemberBodies,
        constructor: Option<ConstructorFn>,
    ) -> VeilResult<usize> {
        let method_contexts = DeclaringContextSet::new(vec![slots.instance_layer, slots.static_layer]);
        let constructor_contexts =
            DeclaringContextSet::new(vec![slots.static_layer, slots.instance_layer]);

        let mut managed = 0;
        for (spec, value) in fields {
            let value = self.field_value(class, &spec.name, value, &method_contexts);
            if !spec.is_managed() {
                self.define_public(class, &spec, value)?;
                continue;
            }

            let (layer, frame) = if spec.is_static {
                (slots.static_layer, slots.static_store)
            } else {
                (slots.instance_layer, slots.instance_template)
            };
            let key = self.declarations.declare(layer, &spec.name, spec.is_shared())?;
            self.stores.define(frame, key, value, !spec.read_only);
            managed += 1;
        }

        self.install_members(class, &method_contexts, bodies)?;

        let body = match constructor {
            Some(body) => body,
            None => {
                let forward: ConstructorFn = Rc::new(forward_to_parent);
                forward
            }
        };
        let name = self.heap.class_name(class);
        let function = self.heap.push_function(FunctionData {
            name,
            owner: Some(class),
            contexts: constructor_contexts,
            body: FunctionBody::Constructor(body),
        });
        self.heap.class_mut(class)?.constructor = Some(function);

        Ok(managed)
    }

    fn field_value(
        &mut self,
        class: ClassId,
        name: &str,
        value: FieldValue,
        contexts: &DeclaringContextSet,
    ) -> Value {
        match value {
            FieldValue::Value(value) => value,
            FieldValue::Function(body) => {
                Value::Function(self.push_method(class, name, contexts, body))
            }
        }
    }

    fn define_public(&mut self, class: ClassId, spec: &FieldSpec, value: Value) -> VeilResult<()> {
        let data = self.heap.class_mut(class)?;
        let fields = if spec.is_static {
            &mut data.static_fields
        } else {
            &mut data.proto_fields
        };
        if fields.contains_key(&spec.name) {
            return Err(VeilError::InvalidFieldSpec {
                spec: spec.name.clone(),
                reason: format!("duplicate field in {}", data.name),
            });
        }

        fields.insert(
            spec.name.clone(),
            PublicField {
                value,
                writable: !spec.read_only,
            },
        );
        Ok(())
    }

    fn install_members(
        &mut self,
        class: ClassId,
        contexts: &DeclaringContextSet,
        bodies: MemberBodies,
    ) -> VeilResult<()> {
        for (name, body) in bodies.methods {
            let function = self.push_method(class, &name, contexts, body);
            self.heap.class_mut(class)?.methods.insert(name, function);
        }
        for (name, body) in bodies.static_methods {
            let function = self.push_method(class, &name, contexts, body);
            self.heap.class_mut(class)?.static_methods.insert(name, function);
        }
        for (name, body) in bodies.getters {
            let function = self.push_method(class, &name, contexts, body);
            self.heap.class_mut(class)?.accessors.entry(name).or_default().get = Some(function);
        }
        for (name, body) in bodies.setters {
            let function = self.push_method(class, &name, contexts, body);
            self.heap.class_mut(class)?.accessors.entry(name).or_default().set = Some(function);
        }
        Ok(())
    }

    fn push_method(
        &mut self,
        class: ClassId,
        name: &str,
        contexts: &DeclaringContextSet,
        body: NativeFn,
    ) -> FunctionId {
        self.heap.push_function(FunctionData {
            name: name.to_string(),
            owner: Some(class),
            contexts: contexts.clone(),
            body: FunctionBody::Method(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::FieldSet;

    #[test]
    fn test_register_creates_locked_layers() {
        let mut rt = Runtime::new();
        let class = rt
            .register(ClassDefinition::new("Example").fields(|| {
                FieldSet::new()
                    .field("private field1", "alpha")
                    .field("protected static count", 0)
                    .field("label", "public")
            }))
            .unwrap();

        let slots = rt.heap.class(class.as_class().unwrap()).unwrap().slots.unwrap();
        let instance = rt.declarations.get(slots.instance_layer).unwrap();
        let statics = rt.declarations.get(slots.static_layer).unwrap();
        assert_eq!(instance.len(), 1);
        assert_eq!(statics.len(), 1);
        assert!(instance.is_locked());
        assert!(statics.is_locked());

        let obj = rt.construct(&class, &[]).unwrap();
        assert_eq!(rt.get(&obj, "label").unwrap(), Value::str("public"));
        assert_eq!(rt.get(&class, "label").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_subclass_layers_chain_to_parent() {
        let mut rt = Runtime::new();
        let base = rt.register(ClassDefinition::new("Base")).unwrap();
        let derived = rt
            .register(ClassDefinition::new("Derived").extends(base.clone()))
            .unwrap();

        let base_slots = rt.heap.class(base.as_class().unwrap()).unwrap().slots.unwrap();
        let derived_slots = rt.heap.class(derived.as_class().unwrap()).unwrap().slots.unwrap();
        assert!(rt
            .declarations
            .is_ancestor(base_slots.instance_layer, derived_slots.instance_layer));
        assert!(rt
            .declarations
            .is_ancestor(base_slots.static_layer, derived_slots.static_layer));
        assert!(rt
            .stores
            .is_chained_to(derived_slots.instance_template, base_slots.instance_template));
    }

    #[test]
    fn test_duplicate_managed_field_rejected() {
        let mut rt = Runtime::new();
        let result = rt.register(ClassDefinition::new("Dup").fields(|| {
            FieldSet::new().field("private x", 1).field("protected x", 2)
        }));
        assert!(matches!(result, Err(VeilError::InvalidFieldSpec { .. })));
    }

    #[test]
    fn test_unknown_modifier_rejected_before_layers_exist() {
        let mut rt = Runtime::new();
        let layers = rt.declarations.len();
        let result = rt.register(
            ClassDefinition::new("Bad").fields(|| FieldSet::new().field("volatile x", 1)),
        );
        assert!(matches!(result, Err(VeilError::InvalidFieldSpec { .. })));
        assert_eq!(rt.declarations.len(), layers);
    }

    #[test]
    fn test_raw_class_rejects_managed_fields() {
        let mut rt = Runtime::new();
        let result = rt.define_class(
            ClassDefinition::new("Raw").fields(|| FieldSet::new().field("private secret", 1)),
        );
        assert!(matches!(result, Err(VeilError::InvalidFieldSpec { .. })));
    }

    #[test]
    fn test_register_on_raw_base_requires_wrap() {
        let mut rt = Runtime::new();
        let raw = rt.define_class(ClassDefinition::new("Raw")).unwrap();
        let result = rt.register(ClassDefinition::new("Sub").extends(raw.clone()));
        assert!(matches!(result, Err(VeilError::UnregisteredConstructor { .. })));

        let wrapped = rt.wrap(&raw, None).unwrap();
        assert_eq!(wrapped, raw);
        assert!(rt.register(ClassDefinition::new("Sub").extends(wrapped)).is_ok());
    }

    #[test]
    fn test_extends_non_class() {
        let mut rt = Runtime::new();
        let result = rt.register(ClassDefinition::new("Odd").extends(Value::Int(3)));
        assert!(matches!(result, Err(VeilError::InvalidTarget(_))));
    }
}
