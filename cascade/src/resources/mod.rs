pub mod api_key;
pub mod connector;
pub mod environment;
pub mod kafka_cluster;
