//! Types shared between the Boostpad app core and anything that talks to its data.

pub mod day;
pub mod focus;
pub mod pack;
pub mod plan;
pub mod rank;

pub use focus::{FocusTag, SessionAnnotation};
pub use pack::{Pack, PackProgressEntry};
pub use plan::{PlanLimits, PlanTier, TrialInfo};
pub use rank::{Playlist, Rank, RankSnapshot};
