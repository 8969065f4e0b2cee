pub mod performer_service;
