pub mod engine;
pub mod store;

pub use engine::{ClaimOutcome, DispatchEngine, OrderDetails};
pub use store::{ExpectedDriver, InMemoryOrderStore, OrderFilter, OrderPatch, OrderStore};
