// scripted SLG46826 stand-in for tests: records every transaction

use std::io;
use std::time::Duration;

use super::{
	BlockSelector,
	Bus,
	BusError,
	ControlCode,
	Delay,
};

const PAGE_ERASE_REGISTER: u8 = 0xe3;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Transaction {
	Write { code: ControlCode, data: Vec<u8>, hold_bus: bool },
	Read { code: ControlCode, len: usize, hold_bus: bool },
	Stop,
}

pub struct SimBus {
	/// device address the simulated chip answers on
	pub address: Option<u8>,
	pub trace: Vec<Transaction>,
	/// NACK writes to this control code starting with this word address
	pub nack_write: Option<(ControlCode, u8)>,
	/// NACK page erase commands after executing them (errata behaviour)
	pub nack_page_erase: bool,
	/// zero-length probes that still NACK after a page erase or row write
	pub busy_after_write: u32,
	/// zero-length probes left to NACK right now
	pub busy: u32,
	/// acknowledged probes left before the chip stops answering probes
	pub acks_left: Option<u32>,
	/// fail every transaction with an I/O error (adapter gone)
	pub io_fault: bool,
	pub register: [u8; 256],
	pub nvm: [u8; 256],
	pub eeprom: [u8; 256],
	pointer: u8,
}

impl SimBus {
	pub fn new(address: Option<u8>) -> Self {
		SimBus {
			address,
			trace: Vec::new(),
			nack_write: None,
			nack_page_erase: false,
			busy_after_write: 0,
			busy: 0,
			acks_left: None,
			io_fault: false,
			register: [0u8; 256],
			nvm: [0u8; 256],
			eeprom: [0u8; 256],
			pointer: 0,
		}
	}

	pub fn writes(&self) -> Vec<(ControlCode, Vec<u8>)> {
		self.trace.iter().filter_map(|t| match t {
			Transaction::Write { code, data, .. } => Some((*code, data.clone())),
			_ => None,
		}).collect()
	}

	pub fn probes(&self) -> Vec<ControlCode> {
		self.trace.iter().filter_map(|t| match t {
			Transaction::Read { code, len: 0, .. } => Some(*code),
			_ => None,
		}).collect()
	}

	fn check_adapter(&self) -> Result<(), BusError> {
		if self.io_fault {
			return Err(BusError::Io(io::Error::new(io::ErrorKind::Other, "adapter fault")));
		}
		Ok(())
	}

	fn selects(&self, code: ControlCode) -> Option<BlockSelector> {
		match self.address {
			Some(address) if address == code.device_address().index() => code.selector(),
			_ => None,
		}
	}

	fn block_mut(&mut self, selector: BlockSelector) -> &mut [u8; 256] {
		match selector {
			BlockSelector::Register => &mut self.register,
			BlockSelector::Nvm => &mut self.nvm,
			BlockSelector::Eeprom => &mut self.eeprom,
		}
	}

	fn erase_page(&mut self, command: u8) {
		let page = usize::from(command & 0x0f) * 16;
		let block = if 0 != command & 0x10 { &mut self.eeprom } else { &mut self.nvm };
		for b in &mut block[page..page + 16] {
			*b = 0;
		}
	}
}

impl Bus for SimBus {
	fn write(&mut self, code: ControlCode, data: &[u8], hold_bus: bool) -> Result<(), BusError> {
		self.trace.push(Transaction::Write { code, data: data.to_vec(), hold_bus });
		self.check_adapter()?;
		let selector = self.selects(code).ok_or(BusError::Nack)?;
		let (&pointer, payload) = match data.split_first() {
			None => return Ok(()),
			Some(split) => split,
		};
		if self.nack_write == Some((code, pointer)) {
			return Err(BusError::Nack);
		}
		self.pointer = pointer;

		if selector == BlockSelector::Register && pointer == PAGE_ERASE_REGISTER && !payload.is_empty() {
			self.erase_page(payload[0]);
			self.busy = self.busy_after_write;
			if self.nack_page_erase {
				return Err(BusError::Nack);
			}
			return Ok(());
		}

		let start = usize::from(pointer);
		let end = (start + payload.len()).min(256);
		self.block_mut(selector)[start..end].copy_from_slice(&payload[..end - start]);
		if payload.len() == 16 {
			self.busy = self.busy_after_write;
		}
		Ok(())
	}

	fn read(&mut self, code: ControlCode, target: &mut [u8], hold_bus: bool) -> Result<(), BusError> {
		self.trace.push(Transaction::Read { code, len: target.len(), hold_bus });
		self.check_adapter()?;
		let selector = self.selects(code).ok_or(BusError::Nack)?;
		if target.is_empty() {
			if self.busy > 0 {
				self.busy -= 1;
				return Err(BusError::Nack);
			}
			if let Some(left) = self.acks_left.as_mut() {
				if *left == 0 {
					return Err(BusError::Nack);
				}
				*left -= 1;
			}
			return Ok(());
		}
		let start = usize::from(self.pointer);
		let block = *self.block_mut(selector);
		for (i, t) in target.iter_mut().enumerate() {
			*t = block[(start + i) % 256];
		}
		Ok(())
	}

	fn stop(&mut self) {
		self.trace.push(Transaction::Stop);
	}
}

#[derive(Default)]
pub struct RecordingDelay {
	pub delays: Vec<Duration>,
}

impl Delay for RecordingDelay {
	fn delay(&mut self, duration: Duration) {
		self.delays.push(duration);
	}
}
