//! DEVStone synthetic benchmark models (LI, HI, HO, and HOmod).

mod atomic;
pub mod hi;
pub mod ho;
pub mod homod;
pub mod li;
mod seeder;

use atomic::DEVStoneAtomic;
pub use hi::HI;
pub use ho::HO;
pub use homod::HOmod;
pub use li::LI;
use seeder::DEVStoneSeeder;

/// Structure and activity counters shared by all the atomics of a DEVStone
/// model. Structure counters grow while the model is built; activity counters
/// are flushed by each atomic when the simulation stops.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct TestProbe {
    pub(crate) n_atomics: usize,
    pub(crate) n_eics: usize,
    pub(crate) n_ics: usize,
    pub(crate) n_eocs: usize,
    pub(crate) n_internals: usize,
    pub(crate) n_externals: usize,
    pub(crate) n_events: usize,
}

pub(crate) type SharedProbe = crate::SharedCell<TestProbe>;
