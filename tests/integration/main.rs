//! Integration tests for the aurelia-fleet CLI
//!
//! These tests spawn the actual binary against temporary fleet files.
//! None of them reach a remote host.

mod cli_tests;
mod servers_command;
