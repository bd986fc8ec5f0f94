//! Infrastructure wiring: which store backs the handlers.

use std::sync::Arc;

use comptoir_infra::{
    CatalogStore, CustomerStore, MemoryStore, OrderStore, OrderWorkflow, PostgresStore,
};

/// Shared handles the handlers pull out of request extensions.
pub struct AppServices {
    pub catalog: Arc<dyn CatalogStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub orders: Arc<dyn OrderStore>,
    pub workflow: OrderWorkflow,
}

/// Selects the backend from `USE_PERSISTENT_STORES` (default: in-memory).
pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        build_postgres_services().await
    } else {
        build_in_memory_services()
    }
}

pub fn build_in_memory_services() -> AppServices {
    let store = Arc::new(MemoryStore::new());
    wire(store.clone(), store.clone(), store)
}

async fn build_postgres_services() -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let store = Arc::new(
        PostgresStore::connect(&database_url)
            .await
            .expect("failed to connect to Postgres"),
    );
    tracing::info!("using Postgres-backed stores");
    wire(store.clone(), store.clone(), store)
}

fn wire(
    catalog: Arc<dyn CatalogStore>,
    customers: Arc<dyn CustomerStore>,
    orders: Arc<dyn OrderStore>,
) -> AppServices {
    let workflow = OrderWorkflow::new(catalog.clone(), customers.clone(), orders.clone());
    AppServices {
        catalog,
        customers,
        orders,
        workflow,
    }
}
