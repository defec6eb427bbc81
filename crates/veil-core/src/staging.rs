//! Instance staging
//!
//! Binds a new instance's storage frame to its class's template chain. The
//! first constructor to run for an instance (always the most-derived class)
//! attaches the frame and records that class's instance layer as the
//! instance's current layer. Every ancestor constructor that runs for the
//! same instance only verifies that the frame already derives from its own
//! template; nothing is ever re-staged.

use crate::error::{VeilError, VeilResult};
use crate::object::Staging;
use crate::runtime::Runtime;
use crate::store::FrameKind;
use crate::value::{ClassId, ObjectId};
use tracing::trace;

impl Runtime {
    /// Attach an instance's storage, or verify an existing attachment
    pub(crate) fn stage_instance(&mut self, object: ObjectId, class: ClassId) -> VeilResult<()> {
        let slots = self
            .heap
            .class(class)?
            .slots
            .ok_or_else(|| VeilError::UnregisteredConstructor {
                class: self.heap.class_name(class),
            })?;

        match self.heap.object(object)?.staging {
            None => {
                let store = self
                    .stores
                    .create_frame(FrameKind::Instance, Some(slots.instance_template));
                self.heap.object_mut(object)?.staging = Some(Staging {
                    store,
                    layer: slots.instance_layer,
                });
                trace!(object = object.as_usize(), class = %self.heap.class_name(class), "staged instance");
                Ok(())
            }
            Some(staging) => {
                if self.stores.is_chained_to(staging.store, slots.instance_template) {
                    Ok(())
                } else {
                    Err(VeilError::StagingMismatch {
                        class: self.heap.class_name(class),
                    })
                }
            }
        }
    }
}
