pub mod environment;
pub mod kafka_cluster;
