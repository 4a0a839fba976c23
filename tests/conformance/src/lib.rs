//! # kcmock-conformance-tests
//!
//! End-to-end tests driving the mock's router in process. All tests live
//! under `tests/`.
