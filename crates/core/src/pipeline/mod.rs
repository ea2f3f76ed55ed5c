pub mod aggregate;
pub mod analysis;
pub mod error;
pub mod orchestrator;
pub mod recommendation;
pub mod research;
pub mod stage;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
