pub mod job;
pub mod pause;
pub mod queue;

pub use job::{mint_id, Job, Priority};
pub use pause::PauseSet;
pub use queue::{DispatchQueue, Lane, PeekInfo, QueueSnapshot};
