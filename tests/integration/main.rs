//! Integration tests: in-process router tests and live-server API tests

mod api_tests;
mod router_tests;
