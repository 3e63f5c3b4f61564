//! IR evaluation metrics, for test and benchmark tooling — not reachable from the
//! live search path.

pub mod binary;
pub mod graded;

pub mod prelude {
    pub use crate::binary::{average_precision, ndcg_at_k, precision_at_k, recall_at_k, reciprocal_rank};
    pub use crate::graded::{compute_err, compute_ndcg};
}
