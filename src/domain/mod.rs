pub mod audit;
pub mod booking;
pub mod catalog;
pub mod customer;
pub mod discount;
pub mod error;
pub mod gateway;
pub mod id;
pub mod issuance;
pub mod loyalty;
pub mod money;
pub mod notification;
pub mod payment;
pub mod pricing;
pub mod store;

use std::{future::Future, pin::Pin};

/// Boxed future returned by the collaborator traits, so they stay object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
