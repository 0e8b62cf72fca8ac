pub mod http_object_store;
pub mod http_query_service;
pub mod object_store;
pub mod query_service;
