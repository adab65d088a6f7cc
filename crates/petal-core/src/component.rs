//! Type-erased component values.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased value stored in a registry.
pub type ComponentArc = Arc<dyn Any + Send + Sync>;

/// A resolved component.
///
/// Cloning is cheap and preserves identity: two clones of the same component
/// satisfy [`Component::ptr_eq`]. Trait objects are stored by wrapping the
/// `Arc<dyn Trait>` itself, e.g. `Component::new(Arc::new(impl) as Arc<dyn T>)`
/// and read back with `downcast::<Arc<dyn T>>()`.
#[derive(Clone)]
pub struct Component {
    value: ComponentArc,
    type_name: &'static str,
}

impl Component {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an existing `Arc` without reallocating.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    /// Returns the concrete value if it is a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Returns `true` if the value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        (*self.value).type_id() == std::any::TypeId::of::<T>()
    }

    /// Name of the stored type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if both components point at the same allocation.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// The erased value.
    pub fn as_arc(&self) -> &ComponentArc {
        &self.value
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
