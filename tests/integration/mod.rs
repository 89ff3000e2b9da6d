//! Integration tests for cellcmd.

pub mod dispatch_test;
pub mod host_call_test;
pub mod roundtrip_test;
pub mod sqlite_test;
