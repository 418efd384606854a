/*!

The `Context` owns everything belonging to one simulation run: the simulation clock and a set of
data plugins (population, parameters, history, random number generators). Modules reach their own
data through extension traits on `Context` (`ContextRandomExt`, `ContextPopulationExt`, ...), so
nothing is shared between runs and independent runs can live on different threads.

*/

use std::any::Any;

use crate::{
    TypeId,
    hashing::HashMap,
    type_of,
};

/// A type that can be stored in a `Context` and knows how to construct its empty self.
pub trait DataPlugin: Any {
    /// A constant reference to a constructor
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self;
}

pub struct Context {
    // This is actually a `HashMap<TypeId, Box<T: DataPlugin>>`.
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Context {
            data_plugins: HashMap::default(),
            current_time: 0.0,
        }
    }

    /// Returns a mutable reference for the data container for `T`, creating it if it doesn't exist yet.
    pub fn get_data_container_mut<T: DataPlugin>(&mut self) -> &mut T {
        self.data_plugins
            .entry(type_of::<T>())
            .or_insert_with(|| Box::new((T::new)()))
            .downcast_mut::<T>()
            .unwrap() // Will never panic as data container has the matching type
    }

    /// Returns a reference to the data container for `T` if it exists.
    /// If you need a mutable reference or lazy instantiation, use `Context::get_data_container_mut()`.
    #[must_use]
    pub fn get_data_container<T: DataPlugin>(&self) -> Option<&T> {
        self.data_plugins
            .get(&type_of::<T>())
            .and_then(|data| data.downcast_ref::<T>())
    }

    /// Drops the data container for `T`, if any. The next `get_data_container_mut` starts from
    /// a fresh one.
    pub fn remove_data_container<T: DataPlugin>(&mut self) {
        self.data_plugins.remove(&type_of::<T>());
    }

    /// The simulation time of the most recently applied event, `0.0` before the first one.
    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Moves the clock forward by `delta`. The clock never runs backwards.
    pub fn advance_time(&mut self, delta: f64) {
        assert!(
            delta >= 0.0,
            "Cannot move the simulation clock backwards by {delta}"
        );
        self.current_time += delta;
    }

    /// Puts the clock back to `0.0` for a new run.
    pub fn reset_time(&mut self) {
        self.current_time = 0.0;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
