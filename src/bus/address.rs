use std::fmt;
use std::str;

/// Number of device indices a control code can carry.
pub const DEVICE_ADDRESS_COUNT: u8 = 16;

/// 4-bit "control code" of the device (bits 7..4 of the control byte)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
	pub fn new(index: u8) -> Option<Self> {
		if index < DEVICE_ADDRESS_COUNT {
			Some(DeviceAddress(index))
		} else {
			None
		}
	}

	pub fn index(self) -> u8 {
		self.0
	}

	/// all addresses in probing order
	pub fn all() -> impl Iterator<Item = DeviceAddress> {
		(0..DEVICE_ADDRESS_COUNT).map(DeviceAddress)
	}

	pub fn control_code(self, selector: BlockSelector) -> ControlCode {
		control_code(self, selector)
	}
}

impl fmt::Display for DeviceAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:x}", self.0)
	}
}

impl str::FromStr for DeviceAddress {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim_start_matches("0x");
		let index = with_context!(("invalid device address: {:?}", s),
			u8::from_str_radix(s, 16).map_err(|e| e.into())
		)?;
		DeviceAddress::new(index).ok_or_else(|| format_err!("device address out of range (0..f): {:?}", s))
	}
}

/// Block address bits A10..A8 of the control byte (A8 doubles as R/W bit on
/// the wire and is always zero here)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BlockSelector {
	Register = 0x02,
	Nvm = 0x04,
	Eeprom = 0x06,
}

impl BlockSelector {
	pub fn bits(self) -> u8 {
		self as u8
	}

	pub fn from_bits(bits: u8) -> Option<Self> {
		match bits {
			0x02 => Some(BlockSelector::Register),
			0x04 => Some(BlockSelector::Nvm),
			0x06 => Some(BlockSelector::Eeprom),
			_ => None,
		}
	}
}

/// Control byte as sent on the bus: device address in the high nibble,
/// block selector in the low nibble.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlCode(pub u8);

impl ControlCode {
	pub fn device_address(self) -> DeviceAddress {
		DeviceAddress(self.0 >> 4)
	}

	pub fn selector(self) -> Option<BlockSelector> {
		BlockSelector::from_bits(self.0 & 0x0f)
	}

	/// 7-bit address as used by Linux i2c-dev (control byte without R/W bit)
	pub fn bus_address(self) -> u16 {
		u16::from(self.0 >> 1)
	}
}

impl fmt::Display for ControlCode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for ControlCode {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (device: {}, block: {:?})", self.0, self.device_address(), self.selector())
	}
}

pub fn control_code(address: DeviceAddress, selector: BlockSelector) -> ControlCode {
	ControlCode((address.0 << 4) | selector.bits())
}
