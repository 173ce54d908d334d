pub mod gateway;
pub mod google;
pub mod timeout;

pub mod mock;

pub use gateway::ModelGateway;
pub use google::GoogleGateway;
pub use mock::{AlwaysGateway, MockGateway, MockReply};
pub use timeout::TimeoutGateway;
