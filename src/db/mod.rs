pub mod external_auth_repository;
pub mod in_memory_external_auth_repository;
