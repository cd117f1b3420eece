use std::sync::Arc;

use hydromap_watershed::Delineator;

#[derive(Clone)]
pub struct AppState {
    pub delineator: Arc<Delineator>,
}

impl AppState {
    pub fn new(delineator: Delineator) -> Self {
        Self {
            delineator: Arc::new(delineator),
        }
    }
}
