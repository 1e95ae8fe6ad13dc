//! Integration tests against real child processes

#[cfg(unix)]
mod cli_tests;
#[cfg(unix)]
mod scenario_tests;
