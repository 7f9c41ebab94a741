pub mod backpressure;
pub mod candidate;
pub mod normalize;
pub mod page;
pub mod policy;
pub mod score;
pub mod strategy;

pub use backpressure::{Backpressure, apply_candidate_limit};
pub use candidate::{Candidate, CandidateKey, CandidatePool, lexical_chunk_id};
pub use page::{PageWindow, paginate};
pub use policy::ranking_policy_id;
pub use score::{RankedItem, ScoreBreakdown, rank_candidates};
pub use strategy::{Strategy, UnknownStrategy};
