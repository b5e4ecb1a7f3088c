//! Property-based tests for streaming assembly and batching.
