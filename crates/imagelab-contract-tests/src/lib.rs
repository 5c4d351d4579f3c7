#![warn(missing_docs)]
//! # imagelab-contract-tests
//!
//! Test-only crate pinning the backend wire contracts. The schemas under
//! `contracts/` are the frozen source of truth; the integration tests in
//! `tests/` validate the checked-in fixtures against them.
