// Aggregates all former standalone integration tests as modules.
mod controller;
mod service;
mod store;
mod support;
