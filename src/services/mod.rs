pub mod aggregator;
pub mod client;
pub mod gallery;
pub mod poller;
pub mod stub;
pub mod submitter;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
