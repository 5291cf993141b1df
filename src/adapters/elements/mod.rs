//! Element catalogue adapters.

mod catalog_element_repository;

pub use catalog_element_repository::CatalogElementRepository;
