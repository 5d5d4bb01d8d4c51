//! HTTP handlers

pub mod health;
pub mod model;
pub mod predict;

use axum::extract::FromRequest;

use crate::AppError;

/// `Json` extractor whose rejections render as [`AppError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
