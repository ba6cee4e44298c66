use std::sync::Arc;

use crate::jobs::ScanTrigger;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub trigger: ScanTrigger,
}
