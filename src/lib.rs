pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod payment_log;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod vnpay;
