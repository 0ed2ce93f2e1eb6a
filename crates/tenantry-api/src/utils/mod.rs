pub mod ip_extraction;

pub use ip_extraction::ClientIp;
