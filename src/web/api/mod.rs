pub mod cdm;
pub mod collisions;
pub mod error;
pub mod satellites;
pub mod summary;

use serde::Serialize;

/// Envelope shared by every list endpoint.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub status: &'static str,
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        ListResponse {
            status: "success",
            count: data.len(),
            data,
        }
    }
}
