use std::any::Any;

use rand::{
    Rng,
    SeedableRng,
    distr::uniform::{SampleRange, SampleUniform},
    prelude::Distribution,
};

use crate::{
    context::{Context, DataPlugin},
    hashing::{HashMap, hash_str},
    log::trace,
    type_of,
    TypeId,
};

/// Identifies an independent random number stream. Use `define_rng!` rather than implementing
/// this by hand.
pub trait RngId: Any {
    #![allow(non_upper_case_globals)]
    const new: &'static dyn Fn(u64) -> Self;
    const name: &'static str;
    type RngType: SeedableRng;
    fn rng(&mut self) -> &mut Self::RngType;
}

struct RngPlugin {
    // `None` until `init_random` is called.
    base_seed: Option<u64>,
    // This is actually a `HashMap<TypeId, Box<R: RngId>>`
    rng_map: HashMap<TypeId, Box<dyn Any>>,
}

impl RngPlugin {
    fn get_rng<R: RngId>(&mut self) -> &mut R::RngType {
        let base_seed = self
            .base_seed
            .unwrap_or_else(|| panic!("Random source used before `init_random` was called"));

        self.rng_map
            .entry(type_of::<R>())
            .or_insert_with(|| {
                let seed_offset = base_seed.wrapping_add(hash_str(R::name));
                Box::new(R::new(seed_offset))
            })
            .downcast_mut::<R>()
            .unwrap() // Will never panic as the entry has the matching type
            .rng()
    }
}

impl DataPlugin for RngPlugin {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| RngPlugin {
        base_seed: None,
        rng_map: HashMap::default(),
    };
}

/// Gets a mutable reference to the random number generator associated with the given
/// `RngId`.
// This is a private free function so that it's not leaked to the public API.
fn get_rng<R: RngId>(context: &mut Context) -> &mut R::RngType {
    context.get_data_container_mut::<RngPlugin>().get_rng::<R>()
}

pub trait ContextRandomExt {
    /// Sets the base seed every stream is derived from and discards existing streams, so they
    /// are re-seeded on next use.
    fn init_random(&mut self, base_seed: u64);

    /// Whether `init_random` has been called on this context.
    fn is_random_initialized(&self) -> bool;

    /// Gets a random sample from the random number generator associated with the given
    /// `RngId` by applying the specified sampler function. If the Rng has not been used
    /// before, one will be created from the base seed given to `init_random`.
    /// Note that this will panic if `init_random` was not called yet.
    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;

    /// Gets a random sample from the specified distribution using the generator associated with
    /// the given `RngId`. Panics if `init_random` was not called yet.
    fn sample_distr<R: RngId, T>(&mut self, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng;

    /// Gets a random sample within the range provided by `range`
    /// using the generator associated with the given `RngId`.
    /// Note that this will panic if `init_random` was not called yet.
    fn sample_range<R: RngId, S, T>(&mut self, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// Gets a random boolean value which is true with probability `p`
    /// using the generator associated with the given `RngId`.
    /// Note that this will panic if `init_random` was not called yet.
    fn sample_bool<R: RngId>(&mut self, p: f64) -> bool
    where
        R::RngType: Rng;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with base seed {base_seed}");
        let rng_container = self.get_data_container_mut::<RngPlugin>();
        rng_container.base_seed = Some(base_seed);

        // Clear any existing Rngs to ensure they get re-seeded when `get_rng` is called
        rng_container.rng_map.clear();
    }

    fn is_random_initialized(&self) -> bool {
        self.get_data_container::<RngPlugin>()
            .is_some_and(|plugin| plugin.base_seed.is_some())
    }

    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        let rng = get_rng::<R>(self);
        sampler(rng)
    }

    fn sample_distr<R: RngId, T>(&mut self, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng,
    {
        let rng = get_rng::<R>(self);
        distribution.sample::<R::RngType>(rng)
    }

    fn sample_range<R: RngId, S, T>(&mut self, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample::<R, T>(|rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId>(&mut self, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample::<R, bool>(|rng| rng.random_bool(p))
    }
}

/// Defines a named random number stream backed by `StdRng`. The stream's seed is the context's
/// base seed offset by a hash of the name, so two streams never mirror each other.
#[macro_export]
macro_rules! define_rng {
    ($random_id:ident) => {
        pub struct $random_id {
            rng: $crate::rand::rngs::StdRng,
        }

        impl $crate::random::RngId for $random_id {
            #![allow(non_upper_case_globals)]
            type RngType = $crate::rand::rngs::StdRng;
            const name: &'static str = stringify!($random_id);
            const new: &'static dyn Fn(u64) -> Self = &|seed| {
                use $crate::rand::SeedableRng;
                Self {
                    rng: $crate::rand::rngs::StdRng::seed_from_u64(seed),
                }
            };

            fn rng(&mut self) -> &mut Self::RngType {
                &mut self.rng
            }
        }
    };
}
#[allow(unused_imports)]
pub use define_rng;
