//! Process-wide default instances
//!
//! Passing an executor explicitly to every composition call is the preferred
//! style, but convenience entry points need somewhere to find one. This
//! registry holds at most one default instance per component type (for
//! example `dyn Executor`), installed for the lifetime of a `Scoped` guard.
//!
//! Guards restore whatever was installed before them when they are dropped,
//! including while unwinding from a panic, so overrides can be nested.
//! The registry is shared by all threads: overriding the same component type
//! from several threads at once will interleave the restorations in drop
//! order, which is almost certainly not what you want.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};


/// Type-erased slots, one per component type. Each holds an `Arc<T>`.
static SLOTS: LazyLock<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));


/// Current default instance of component type `T`, if any
pub fn current<T>() -> Option<Arc<T>>
    where T: ?Sized + Send + Sync + 'static
{
    SLOTS.lock()
         .get(&TypeId::of::<T>())
         .and_then(|slot| slot.downcast_ref::<Arc<T>>())
         .cloned()
}


/// Install `value` as the default instance of `T` until the guard is dropped
pub fn set_scoped<T>(value: Arc<T>) -> Scoped<T>
    where T: ?Sized + Send + Sync + 'static
{
    let previous = replace::<T>(Some(value));
    Scoped { previous, _not_send: PhantomData }
}


/// Swap the content of the slot of `T`, returning the former content
fn replace<T>(value: Option<Arc<T>>) -> Option<Arc<T>>
    where T: ?Sized + Send + Sync + 'static
{
    let mut slots = SLOTS.lock();
    let previous = match value {
        Some(value) => slots.insert(TypeId::of::<T>(), Box::new(value)),
        None => slots.remove(&TypeId::of::<T>()),
    };
    previous.and_then(|slot| slot.downcast::<Arc<T>>().ok())
            .map(|slot| *slot)
}


/// Guard of a default instance override
///
/// The guard is bound to the thread that created it, so that overrides are
/// undone in the order they were made.
///
#[must_use = "the default instance is uninstalled when the guard is dropped"]
pub struct Scoped<T>
    where T: ?Sized + Send + Sync + 'static
{
    /// Instance to restore on drop
    previous: Option<Arc<T>>,

    _not_send: PhantomData<*const ()>,
}
//
impl<T> Drop for Scoped<T>
    where T: ?Sized + Send + Sync + 'static
{
    fn drop(&mut self) {
        replace::<T>(self.previous.take());
    }
}
