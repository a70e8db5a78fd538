// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - [`machine_commands`] - the pure machine fold under random commands
//! - [`projection_convergence`] - rows under shuffled and duplicated delivery

mod machine_commands;
mod projection_convergence;
mod strategies;
