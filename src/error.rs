use failure::Fail;

use crate::bus::{
	BusError,
	ControlCode,
};

/// Outcome of a failed programmer operation.
///
/// Every operation fails with exactly one of these; nothing is retried
/// except the bounded ack polling itself.
#[derive(Debug, Fail)]
pub enum ProgramError {
	#[fail(display = "no device acknowledged on any of the 16 control codes")]
	DeviceNotFound,

	#[fail(display = "image incomplete: {} data records for {} of 16 rows", records, rows)]
	IncompleteImage {
		rows: usize,
		records: usize,
	},

	#[fail(display = "bus transaction to {} failed", code)]
	BusTransactionFailed {
		code: ControlCode,
		#[fail(cause)]
		cause: BusError,
	},

	#[fail(display = "device at {} still busy after {} polls", code, polls)]
	AckTimeout {
		code: ControlCode,
		polls: u32,
	},
}

pub type ProgramResult<T> = Result<T, ProgramError>;

impl ProgramError {
	pub(crate) fn bus(code: ControlCode) -> impl FnOnce(BusError) -> Self {
		move |cause| ProgramError::BusTransactionFailed { code, cause }
	}
}
