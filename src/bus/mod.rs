//! Two-wire bus access for SLG46826 devices
//!
//! The device answers on up to three control codes at once (register, NVM
//! and EEPROM block), all sharing the 4-bit device address in the high
//! nibble.
//!
//! A transaction is either a write (word address followed by data) or a
//! read. Passing `hold_bus` keeps the bus claimed after the transaction
//! (no STOP), so the next transaction starts with a repeated START; this is
//! required between selecting a word address and reading from it.

use std::io;
use std::ops::{
	Deref,
	DerefMut,
};

use failure::Fail;

mod address;
mod delay;
pub mod linux;
#[cfg(test)]
pub(crate) mod sim;

pub use self::address::{
	BlockSelector,
	ControlCode,
	DEVICE_ADDRESS_COUNT,
	DeviceAddress,
	control_code,
};

pub use self::delay::{
	Delay,
	ThreadSleep,
	reliable_sleep,
};

#[derive(Debug, Fail)]
pub enum BusError {
	#[fail(display = "no acknowledge")]
	Nack,

	#[fail(display = "bus I/O error: {}", _0)]
	Io(#[fail(cause)] io::Error),
}

pub trait Bus {
	fn write(&mut self, code: ControlCode, data: &[u8], hold_bus: bool) -> Result<(), BusError>;

	fn read(&mut self, code: ControlCode, target: &mut [u8], hold_bus: bool) -> Result<(), BusError>;

	/// release the bus (STOP condition)
	fn stop(&mut self);

	/// zero-length read; doesn't touch device state, only checks for ACK
	fn probe(&mut self, code: ControlCode) -> bool {
		match self.read(code, &mut [], false) {
			Ok(()) => true,
			Err(BusError::Nack) => false,
			Err(e) => {
				warn!("probing {} failed: {}", code, e);
				false
			},
		}
	}
}

impl<'a, B: Bus + ?Sized> Bus for &'a mut B {
	fn write(&mut self, code: ControlCode, data: &[u8], hold_bus: bool) -> Result<(), BusError> {
		(**self).write(code, data, hold_bus)
	}

	fn read(&mut self, code: ControlCode, target: &mut [u8], hold_bus: bool) -> Result<(), BusError> {
		(**self).read(code, target, hold_bus)
	}

	fn stop(&mut self) {
		(**self).stop()
	}

	fn probe(&mut self, code: ControlCode) -> bool {
		(**self).probe(code)
	}
}

/// Releases the bus when dropped, whichever way the session ends.
pub struct Session<'a, B: Bus + ?Sized + 'a>(&'a mut B);

impl<'a, B: Bus + ?Sized> Session<'a, B> {
	pub fn new(bus: &'a mut B) -> Self {
		Session(bus)
	}
}

impl<'a, B: Bus + ?Sized> Drop for Session<'a, B> {
	fn drop(&mut self) {
		self.0.stop();
	}
}

impl<'a, B: Bus + ?Sized> Deref for Session<'a, B> {
	type Target = B;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'a, B: Bus + ?Sized> DerefMut for Session<'a, B> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}
