pub mod ip_usage_service;
