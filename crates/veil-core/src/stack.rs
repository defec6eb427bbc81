//! Call frames and caller identity
//!
//! Every managed constructor or method entered through the runtime pushes a
//! [`CallFrame`] and receives a [`Caller`] token naming that frame. Mediated
//! accesses present the token; the stack resolves it to the frame's
//! declaring contexts only while the frame is the innermost one. Code running
//! outside any managed frame acts with an empty context set.

use crate::error::{VeilError, VeilResult};
use crate::registry::LayerId;
use crate::value::FunctionId;
use std::rc::Rc;

/// Layers whose private scope a managed function may use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaringContextSet(Rc<[LayerId]>);

impl DeclaringContextSet {
    /// Create a context set
    pub fn new(layers: Vec<LayerId>) -> Self {
        Self(Rc::from(layers))
    }

    /// Context set of code outside any managed class
    pub fn empty() -> Self {
        Self(Rc::from(Vec::new()))
    }

    /// Layers in the set
    pub fn layers(&self) -> &[LayerId] {
        &self.0
    }

    /// Check if the set grants nothing
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DeclaringContextSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Activation record of a managed function
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Unique sequence number of this activation
    pub seq: u64,
    /// Function being executed
    pub function: FunctionId,
    /// Declaring contexts of the function
    pub contexts: DeclaringContextSet,
}

/// Capability naming the frame an access is made from
///
/// Only the runtime mints callers. A caller is not `Clone`, and it stops
/// resolving once its frame is no longer the innermost one.
#[derive(Debug)]
pub struct Caller {
    seq: Option<u64>,
}

impl Caller {
    /// Caller outside any managed frame
    pub(crate) fn outside() -> Self {
        Self { seq: None }
    }

    /// Check if this caller is outside any managed frame
    pub fn is_outside(&self) -> bool {
        self.seq.is_none()
    }
}

/// Stack of active managed frames
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    next_seq: u64,
    max_depth: usize,
}

impl CallStack {
    /// Create an empty stack with a depth limit
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::with_capacity(64),
            next_seq: 1,
            max_depth,
        }
    }

    /// Enter a managed function
    ///
    /// # Errors
    ///
    /// Returns `VeilError::CallDepthExceeded` past the configured depth.
    pub fn push(&mut self, function: FunctionId, contexts: DeclaringContextSet) -> VeilResult<Caller> {
        if self.frames.len() >= self.max_depth {
            return Err(VeilError::CallDepthExceeded(self.max_depth));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.frames.push(CallFrame {
            seq,
            function,
            contexts,
        });
        Ok(Caller { seq: Some(seq) })
    }

    /// Leave the innermost managed function
    ///
    /// # Errors
    ///
    /// Returns `VeilError::StaleCaller` if `caller` does not own the
    /// innermost frame.
    pub fn pop(&mut self, caller: Caller) -> VeilResult<CallFrame> {
        match (caller.seq, self.frames.last()) {
            (Some(seq), Some(top)) if top.seq == seq => {
                self.frames.pop().ok_or(VeilError::StaleCaller)
            }
            _ => Err(VeilError::StaleCaller),
        }
    }

    /// Resolve a caller to its declaring contexts
    ///
    /// # Errors
    ///
    /// Returns `VeilError::StaleCaller` if the caller's frame is not the
    /// innermost one.
    pub fn resolve(&self, caller: &Caller) -> VeilResult<DeclaringContextSet> {
        let Some(seq) = caller.seq else {
            return Ok(DeclaringContextSet::empty());
        };
        match self.frames.last() {
            Some(top) if top.seq == seq => Ok(top.contexts.clone()),
            _ => Err(VeilError::StaleCaller),
        }
    }

    /// Get the innermost frame
    pub fn current(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Get the number of active frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Get the depth limit
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contexts(count: usize) -> DeclaringContextSet {
        let mut registry = crate::registry::DeclarationRegistry::new();
        let layers = (0..count)
            .map(|_| registry.create_layer("T", crate::registry::Side::Instance, LayerId::ROOT))
            .collect();
        DeclaringContextSet::new(layers)
    }

    #[test]
    fn test_outside_caller_has_no_contexts() {
        let stack = CallStack::new(8);
        let caller = Caller::outside();
        assert!(caller.is_outside());
        assert!(stack.resolve(&caller).unwrap().is_empty());
    }

    #[test]
    fn test_push_resolve_pop() {
        let mut stack = CallStack::new(8);
        let set = contexts(2);
        let caller = stack.push(FunctionId(0), set.clone()).unwrap();

        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.resolve(&caller).unwrap(), set);

        let frame = stack.pop(caller).unwrap();
        assert_eq!(frame.function, FunctionId(0));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_outer_caller_is_stale_while_inner_frame_runs() {
        let mut stack = CallStack::new(8);
        let outer = stack.push(FunctionId(0), contexts(1)).unwrap();
        let inner = stack.push(FunctionId(1), contexts(1)).unwrap();

        assert!(matches!(stack.resolve(&outer), Err(VeilError::StaleCaller)));
        assert!(matches!(stack.pop(outer), Err(VeilError::StaleCaller)));

        stack.pop(inner).unwrap();
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_current_is_innermost_frame() {
        let mut stack = CallStack::new(8);
        assert!(stack.current().is_none());

        let outer = stack.push(FunctionId(0), contexts(1)).unwrap();
        let inner = stack.push(FunctionId(1), contexts(2)).unwrap();
        let top = stack.current().unwrap();
        assert_eq!(top.function, FunctionId(1));
        assert_eq!(top.contexts.layers().len(), 2);

        stack.pop(inner).unwrap();
        assert_eq!(stack.current().unwrap().function, FunctionId(0));
        stack.pop(outer).unwrap();
        assert!(stack.current().is_none());
    }

    #[test]
    fn test_depth_limit() {
        let mut stack = CallStack::new(2);
        assert_eq!(stack.max_depth(), 2);
        let _a = stack.push(FunctionId(0), DeclaringContextSet::empty()).unwrap();
        let _b = stack.push(FunctionId(1), DeclaringContextSet::empty()).unwrap();
        assert!(matches!(
            stack.push(FunctionId(2), DeclaringContextSet::empty()),
            Err(VeilError::CallDepthExceeded(2))
        ));
    }
}
