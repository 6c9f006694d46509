pub mod ip_allocation;
pub mod ip_allocation_pool;
pub mod network;
pub mod subnet;
