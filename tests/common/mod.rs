#![allow(dead_code, unused_imports)]

pub use execwatch_test_utils::{builders, fake_gateway, init_tracing, next_event, with_timeout};
