//! Lot numbers embedded in kit barcodes.
//!
//! Kit QR codes carry comma-separated fields; the second field is the lot
//! number, whose last character is a check digit (see [`crate::checksum`]).

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use crate::capture::traits::DecodeHandler;
use crate::capture::types::BarcodeScan;
use crate::checksum;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LotNumberError {
    #[error("payload has no lot number field")]
    MissingField,

    #[error("lot number '{0}' is too short")]
    TooShort(String),

    #[error("lot number '{0}' failed checksum validation")]
    BadChecksum(String),
}

/// Second comma-separated field of `payload`, when longer than one character
pub fn lot_number_from_payload(payload: &str) -> Option<&str> {
    payload.split(',').nth(1).filter(|lot| lot.len() > 1)
}

/// The lot itself when its check digit is valid or it is the override code
pub fn validate_lot_number(lot: &str) -> Option<&str> {
    checksum::validate(lot).then_some(lot)
}

/// Extract and validate in one step, with the reason on failure
pub fn parse_lot_number(payload: &str) -> Result<String, LotNumberError> {
    let field = payload
        .split(',')
        .nth(1)
        .ok_or(LotNumberError::MissingField)?;
    let lot = lot_number_from_payload(payload)
        .ok_or_else(|| LotNumberError::TooShort(field.to_string()))?;
    validate_lot_number(lot)
        .map(str::to_string)
        .ok_or_else(|| LotNumberError::BadChecksum(lot.to_string()))
}

/// Decode handler that accepts kit codes with a valid lot number and keeps
/// the last accepted lot for later steps
#[derive(Debug, Clone, Default)]
pub struct LotNumberScanner {
    slot: Arc<Mutex<Option<String>>>,
}

impl LotNumberScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the accepted lot number
    pub fn slot(&self) -> Arc<Mutex<Option<String>>> {
        Arc::clone(&self.slot)
    }

    pub fn lot_number(&self) -> Option<String> {
        match self.slot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DecodeHandler for LotNumberScanner {
    fn on_decode(&mut self, scan: &BarcodeScan) -> bool {
        match parse_lot_number(&scan.data) {
            Ok(lot) => {
                debug!(lot = %lot, "Lot number accepted");
                let mut slot = match self.slot.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *slot = Some(lot);
                true
            }
            Err(e) => {
                debug!(error = %e, "Scan rejected");
                false
            }
        }
    }
}
