pub mod alt;
pub mod callback;
pub mod codec;
pub mod dex;
pub mod grpc;
pub mod message;
pub mod rpc;
pub mod utils;

pub use dex::{Event, model};
pub use grpc::{GrpcClient, GrpcConfig, SubscribeOptions};
pub use rpc::{RpcClient, RpcConfig};
