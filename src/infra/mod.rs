//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, ssh and
//! scp, HTTP, archive extraction and the fleet file.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod artifact;
pub mod command_runner;
pub mod config;
pub mod fs;
pub mod github;
pub mod prompt;
pub mod ssh;
