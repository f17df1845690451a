pub mod sse;
pub mod vertex_client;
