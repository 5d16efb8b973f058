// src/extract.rs
//! Extractors whose rejections come back as `AdvisorError` JSON bodies
//! instead of axum's plain-text ones.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AdvisorError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AdvisorError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AdvisorError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AdvisorError))]
pub struct ApiPath<T>(pub T);
