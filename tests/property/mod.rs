// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - `address_set`: range predicates and free-space arithmetic
//! - `hierarchy`: counters and overlap rules after random mutations

mod address_set;
mod hierarchy;
