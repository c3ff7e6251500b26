//! The gRPC schema between the beacon node and validator clients.
//!
//! `services` and `services_grpc` are generated into `src/` from
//! `services.proto` by the build script. Block, state and attestation
//! payloads cross the wire as SSZ bytes inside the proto envelopes.

pub mod services;
pub mod services_grpc;
