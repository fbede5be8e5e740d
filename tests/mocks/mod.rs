pub mod store_mock;
