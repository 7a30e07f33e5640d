// Agglomerative clustering — distance metrics and the merge engine.

pub mod distance;
pub mod engine;
