//! Infrastructure layer: storage ports, their backends, and the order
//! workflow that coordinates stock against them.

pub mod store;
pub mod workflow;

pub use store::{
    CatalogStore, CustomerStore, MemoryStore, OrderStore, Page, Paginated, PostgresStore,
    StoreError,
};
pub use workflow::{CustomerSnapshot, OrderWorkflow, ProductSnapshot, WorkflowError};
