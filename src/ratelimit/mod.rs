//! Rate limiting module using Token Bucket algorithm.
//!
//! Every queue owns one bucket. Producers and consumers on that queue draw
//! from the same bucket, so a queue's combined read+write throughput is
//! bounded by a single sustained rate with a bounded burst.

mod token_bucket;

pub use token_bucket::TokenBucket;
