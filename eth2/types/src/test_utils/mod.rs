//! Builders producing deterministic states for tests.

mod testing_beacon_state_builder;

pub use testing_beacon_state_builder::{
    generate_deterministic_keypairs, TestingBeaconStateBuilder,
};
