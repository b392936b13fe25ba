//! gRPC transport adapter.

mod auth_grpc;
pub mod cookies;

pub use auth_grpc::AuthGrpcService;
