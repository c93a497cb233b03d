//! Integration tests with mock HTTP server

pub mod mock_server;
pub mod queries;
pub mod status;
