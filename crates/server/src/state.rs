use service::catalog::CatalogService;

/// Shared handler state: the catalog and, through it, the record store.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }
}
