//! Request extractors for resource routes.

pub mod request;
pub use request::{RequestContext, ResourcePayload, REQUESTED_WITH_HEADER};
