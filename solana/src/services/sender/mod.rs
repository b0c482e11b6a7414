pub mod service;

pub use service::SenderService;
