// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of BLPS.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! HTTP relay to the optimization backend.

mod backend;
mod client;
mod errors;

pub use backend::OptimizationBackend;
pub use client::{Caller, IngestionEndpoint, OptimizationClient, UploadFile, error_message};
pub use errors::{RelayError, RelayResult};
