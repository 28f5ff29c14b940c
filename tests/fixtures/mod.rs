//! Test fixtures

mod two_node;

pub use two_node::{Recorder, TwoNodeFixture, routable_config, wait_until};
