//! End-to-end CLI tests with shell scripts standing in for the map tools.

#[cfg(unix)]
mod build_tests;
#[cfg(unix)]
mod common;
