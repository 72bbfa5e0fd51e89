use std::fmt;
use std::str;

use crate::bus::BlockSelector;

// Page Erase Register (0xE3) command byte:
// - bit 7: ERSE, start page erase
// - bit 4: ERSEB4, 0: NVM, 1: EEPROM
// - bits 3..0: page
const PAGE_ERASE_START: u8 = 0x80;
const PAGE_ERASE_EEPROM: u8 = 0x10;

/// What goes into the device address field (register 0xCA, bits 3..0) of
/// an image before it is written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AddressPatch {
	/// keep the image as is
	Keep,
	/// requested new address if valid, otherwise the current one
	RequestedOrCurrent,
	/// always the current address: changing it on a live register write
	/// would switch addresses in the middle of the transfer
	Current,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum MemoryRegion {
	Nvm,
	Eeprom,
	Register,
}

struct RegionInfo {
	name: &'static str,
	selector: BlockSelector,
	/// ERSEB4 bit for page erase; `None` if the block can't be erased
	erase_block: Option<u8>,
	address_patch: AddressPatch,
	power_cycles_on_write: bool,
	image_file_name: &'static str,
}

const NVM: RegionInfo = RegionInfo {
	name: "NVM",
	selector: BlockSelector::Nvm,
	erase_block: Some(0),
	address_patch: AddressPatch::RequestedOrCurrent,
	power_cycles_on_write: true,
	image_file_name: "NVM.hex",
};

const EEPROM: RegionInfo = RegionInfo {
	name: "EEPROM",
	selector: BlockSelector::Eeprom,
	erase_block: Some(PAGE_ERASE_EEPROM),
	address_patch: AddressPatch::Keep,
	power_cycles_on_write: false,
	image_file_name: "EEPROM.hex",
};

// registers are loaded from the NVM design file
const REGISTER: RegionInfo = RegionInfo {
	name: "register",
	selector: BlockSelector::Register,
	erase_block: None,
	address_patch: AddressPatch::Current,
	power_cycles_on_write: false,
	image_file_name: "NVM.hex",
};

impl MemoryRegion {
	fn info(self) -> &'static RegionInfo {
		match self {
			MemoryRegion::Nvm => &NVM,
			MemoryRegion::Eeprom => &EEPROM,
			MemoryRegion::Register => &REGISTER,
		}
	}

	pub fn selector(self) -> BlockSelector {
		self.info().selector
	}

	pub fn is_erasable(self) -> bool {
		self.info().erase_block.is_some()
	}

	/// value for the Page Erase Register; `None` for blocks without page erase
	pub fn page_erase_command(self, page: u8) -> Option<u8> {
		assert!(page < 16);
		self.info().erase_block.map(|block| PAGE_ERASE_START | block | page)
	}

	pub fn address_patch(self) -> AddressPatch {
		self.info().address_patch
	}

	/// whether a successful write is followed by a software reset, so the
	/// device reloads its live configuration
	pub fn power_cycles_on_write(self) -> bool {
		self.info().power_cycles_on_write
	}

	pub fn image_file_name(self) -> &'static str {
		self.info().image_file_name
	}
}

impl fmt::Display for MemoryRegion {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.info().name)
	}
}

impl str::FromStr for MemoryRegion {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"n" | "nvm" => Ok(MemoryRegion::Nvm),
			"e" | "eeprom" => Ok(MemoryRegion::Eeprom),
			"r" | "reg" | "register" => Ok(MemoryRegion::Register),
			_ => bail!("Unknown memory region {:?} (expected nvm, eeprom or register)", s),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn region_table() {
		assert_eq!(MemoryRegion::Nvm.selector(), BlockSelector::Nvm);
		assert_eq!(MemoryRegion::Eeprom.selector(), BlockSelector::Eeprom);
		assert_eq!(MemoryRegion::Register.selector(), BlockSelector::Register);

		assert!(MemoryRegion::Nvm.power_cycles_on_write());
		assert!(!MemoryRegion::Eeprom.power_cycles_on_write());
		assert!(!MemoryRegion::Register.power_cycles_on_write());

		assert!(!MemoryRegion::Register.is_erasable());
		assert!(MemoryRegion::Nvm.is_erasable());
		assert!(MemoryRegion::Eeprom.is_erasable());
		assert_eq!(MemoryRegion::Register.address_patch(), AddressPatch::Current);
		assert_eq!(MemoryRegion::Eeprom.address_patch(), AddressPatch::Keep);
		assert_eq!(MemoryRegion::Register.image_file_name(), "NVM.hex");
		assert_eq!(MemoryRegion::Eeprom.image_file_name(), "EEPROM.hex");
	}

	#[test]
	fn page_erase_commands() {
		assert_eq!(MemoryRegion::Nvm.page_erase_command(0), Some(0x80));
		assert_eq!(MemoryRegion::Nvm.page_erase_command(0xf), Some(0x8f));
		assert_eq!(MemoryRegion::Eeprom.page_erase_command(3), Some(0x93));
		assert_eq!(MemoryRegion::Register.page_erase_command(3), None);
	}

	#[test]
	fn parse_region_names() {
		assert_eq!("NVM".parse::<MemoryRegion>().unwrap(), MemoryRegion::Nvm);
		assert_eq!("e".parse::<MemoryRegion>().unwrap(), MemoryRegion::Eeprom);
		assert_eq!("register".parse::<MemoryRegion>().unwrap(), MemoryRegion::Register);
		assert!("flash".parse::<MemoryRegion>().is_err());
	}
}
