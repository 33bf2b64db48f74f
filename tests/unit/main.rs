//! Unit tests for aurelia-fleet
//!
//! These tests exercise the library API against temporary files only; no
//! network or remote host is involved.

mod property_tests;
mod registry_file;
