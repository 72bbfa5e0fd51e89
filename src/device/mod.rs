//! SLG46826 programming sequences
//!
//! Datasheet: "SLG46826 GreenPAK Programmable Mixed-Signal Matrix", I2C
//! serial communication and NVM/EEPROM page erase sections; errata for the
//! XC revision ("Non-I2C Compliant ACK Behavior for the NVM and EEPROM Page
//! Erase Byte").
//!
//! Each operation discovers the device address first: a power cycle after
//! writing NVM may have changed it. All transactions of one operation then
//! use that address (the power cycle at the end discovers again).
//!
//! Erase and write cycles complete asynchronously; completion is detected by
//! ack polling the register block, even when NVM or EEPROM was written.

use crate::bus::{
	BlockSelector,
	Bus,
	BusError,
	ControlCode,
	DEVICE_ADDRESS_COUNT,
	Delay,
	DeviceAddress,
	Session,
	ThreadSleep,
};
use crate::error::{
	ProgramError,
	ProgramResult,
};
use crate::hex::{
	COLUMNS,
	LoadedImage,
	MemoryImage,
	ROWS,
};

mod discovery;
mod region;
mod timing;

pub use self::discovery::{
	discover,
	enumerate,
};

pub use self::region::{
	AddressPatch,
	MemoryRegion,
};

pub use self::timing::Timing;

mod consts {
	// register block word addresses

	// bit 1: I2C reset, reloads NVM into the registers
	pub const RESET_REGISTER: u8 = 0xc8;
	pub const SOFTWARE_RESET: u8 = 0x02;

	// bits 3..0: I2C control code; bits 7..4 zero so bits 3..0 are used
	// instead of the IO pin states
	pub const ADDRESS_REGISTER: u8 = 0xca;

	// bits 1..0: 00 read/write/erase, 01 no read, 10 no write/erase, 11 locked
	pub const PROTECTION_REGISTER: u8 = 0xe1;
	pub const UNPROTECTED: u8 = 0x00;

	pub const PAGE_ERASE_REGISTER: u8 = 0xe3;
}

use self::consts::*;

/// Store `address` in the low nibble of the device address field.
pub fn set_address_field(image: &mut MemoryImage, address: DeviceAddress) {
	let row = usize::from(ADDRESS_REGISTER >> 4);
	let column = usize::from(ADDRESS_REGISTER & 0x0f);
	let value = (image.get(row, column) & 0xf0) | address.index();
	image.set(row, column, value);
}

/// returns when `code` acknowledges a zero-length read; fails after
/// `ack_poll_budget` unanswered probes
fn ack_poll<B, D>(bus: &mut B, delay: &mut D, timing: &Timing, code: ControlCode) -> ProgramResult<()>
where
	B: Bus + ?Sized,
	D: Delay + ?Sized,
{
	for poll in 1..=timing.ack_poll_budget {
		// only a missing ACK means busy; adapter errors abort
		match bus.read(code, &mut [], false) {
			Ok(()) => {
				debug!("{}: ready after {} polls", code, poll);
				return Ok(());
			},
			Err(BusError::Nack) => (),
			Err(e) => return Err(ProgramError::bus(code)(e)),
		}
		if poll < timing.ack_poll_budget {
			delay.delay(timing.ack_poll_interval);
		}
	}
	error!("Geez! Something went wrong while programming: {} never acknowledged", code);
	Err(ProgramError::AckTimeout {
		code,
		polls: timing.ack_poll_budget,
	})
}

/// Runs one operation at a time against the single device on `bus`.
pub struct Programmer<B: Bus, D: Delay = ThreadSleep> {
	bus: B,
	delay: D,
	timing: Timing,
}

impl<B: Bus> Programmer<B, ThreadSleep> {
	pub fn new(bus: B, timing: Timing) -> Self {
		Programmer::with_delay(bus, ThreadSleep, timing)
	}
}

impl<B: Bus, D: Delay> Programmer<B, D> {
	pub fn with_delay(bus: B, delay: D, timing: Timing) -> Self {
		Programmer {
			bus,
			delay,
			timing,
		}
	}

	pub fn bus(&self) -> &B {
		&self.bus
	}

	pub fn discover(&mut self) -> ProgramResult<DeviceAddress> {
		discover(&mut self.bus)
	}

	pub fn enumerate(&mut self) -> [bool; DEVICE_ADDRESS_COUNT as usize] {
		enumerate(&mut self.bus, &mut self.delay, self.timing.probe_interval)
	}

	pub fn ack_polling(&mut self, code: ControlCode) -> ProgramResult<()> {
		ack_poll(&mut self.bus, &mut self.delay, &self.timing, code)
	}

	/// Clear NVM/EEPROM write protection.
	///
	/// The protection register is read back afterwards, but only logged.
	pub fn unprotect(&mut self) -> ProgramResult<()> {
		let address = self.discover()?;
		self.unprotect_at(address)
	}

	fn unprotect_at(&mut self, address: DeviceAddress) -> ProgramResult<()> {
		let code = address.control_code(BlockSelector::Register);
		self.bus.write(code, &[PROTECTION_REGISTER, UNPROTECTED], false)
			.map_err(ProgramError::bus(code))?;

		let mut value = [0u8];
		let readback = self.bus.write(code, &[PROTECTION_REGISTER], true)
			.and_then(|()| self.bus.read(code, &mut value, false));
		match readback {
			Ok(()) => debug!("protection register: 0x{:02x}", value[0]),
			Err(e) => warn!("couldn't read back protection register: {}", e),
		}
		Ok(())
	}

	/// Software reset: the device reloads NVM into its registers.
	///
	/// The reset interrupts the transaction, so the write isn't acknowledged
	/// and there is nothing to poll for.
	pub fn power_cycle(&mut self) -> ProgramResult<()> {
		let address = self.discover()?;
		let code = address.control_code(BlockSelector::Register);
		info!("Power Cycling!");
		if let Err(e) = self.bus.write(code, &[RESET_REGISTER, SOFTWARE_RESET], false) {
			debug!("software reset: {}", e);
		}
		Ok(())
	}

	fn power_cycle_or_warn(&mut self) {
		if let Err(e) = self.power_cycle() {
			warn!("power cycle skipped: {}", e);
		}
	}

	/// Erase all 16 pages of NVM or EEPROM; the register block has no erase
	/// and succeeds without touching the bus.
	pub fn erase(&mut self, region: MemoryRegion) -> ProgramResult<()> {
		if !region.is_erasable() {
			info!("{} doesn't need erasing", region);
			return Ok(());
		}
		let address = self.discover()?;
		info!("slave address = {}", address);
		info!("memory = {}", region);
		self.erase_at(address, region)
	}

	/// unprotect, erase all pages, power cycle
	fn erase_at(&mut self, address: DeviceAddress, region: MemoryRegion) -> ProgramResult<()> {
		if !region.is_erasable() {
			return Ok(());
		}
		self.unprotect_at(address)?;

		let code = address.control_code(BlockSelector::Register);
		let timing = self.timing;

		for page in 0..(ROWS as u8) {
			let command = match region.page_erase_command(page) {
				Some(command) => command,
				None => continue,
			};
			info!("Erasing page: 0x{:02x} {}", page, region);
			// the erase byte may be NACKed although the erase starts (see
			// errata); end the transaction explicitly and poll instead
			if let Err(e) = self.bus.write(code, &[PAGE_ERASE_REGISTER, command], false) {
				debug!("page erase 0x{:02x}: {} (ignored)", command, e);
			}
			self.bus.stop();

			self.delay.delay(timing.erase_command_settle);
			ack_poll(&mut self.bus, &mut self.delay, &timing, code)?;
			self.delay.delay(timing.erase_page_settle);
		}

		self.power_cycle_or_warn();
		Ok(())
	}

	/// Program `loaded` into `region`.
	///
	/// `new_address` only applies to NVM: if it is a valid device address it
	/// is stored in the image, otherwise the current address is kept. Register
	/// writes always keep the current address.
	///
	/// Rows are written one transaction each; the first failing row aborts
	/// the operation, earlier rows stay written.
	pub fn program(&mut self, region: MemoryRegion, loaded: LoadedImage, new_address: Option<u8>) -> ProgramResult<()> {
		if !loaded.is_complete() {
			return Err(ProgramError::IncompleteImage {
				rows: loaded.rows_merged,
				records: loaded.data_records,
			});
		}
		let mut image = loaded.image;

		let address = self.discover()?;
		info!("slave address = {}", address);
		match region.address_patch() {
			AddressPatch::Keep => (),
			AddressPatch::RequestedOrCurrent => {
				let next = match new_address.map(|a| (a, DeviceAddress::new(a))) {
					Some((_, Some(next))) => next,
					Some((a, None)) => {
						warn!("invalid device address 0x{:x}, keeping {}", a, address);
						address
					},
					None => address,
				};
				info!("next slave address = {}", next);
				set_address_field(&mut image, next);
			},
			AddressPatch::Current => set_address_field(&mut image, address),
		}
		info!("memory = {}", region);

		if region.is_erasable() {
			info!("erase start");
			self.erase_at(address, region)?;
			self.delay.delay(self.timing.post_erase_settle);
			info!("erase OK");
		}

		self.write_rows(
			address.control_code(region.selector()),
			address.control_code(BlockSelector::Register),
			&image,
		)?;

		if region.power_cycles_on_write() {
			self.power_cycle_or_warn();
		}
		Ok(())
	}

	fn write_rows(&mut self, code: ControlCode, ack_code: ControlCode, image: &MemoryImage) -> ProgramResult<()> {
		let timing = self.timing;
		let delay = &mut self.delay;
		let mut bus = Session::new(&mut self.bus);

		let mut buf = [0u8; 1 + COLUMNS];
		for row in 0..ROWS {
			buf[0] = (row as u8) << 4;
			buf[1..].copy_from_slice(image.row(row));
			if let Err(e) = bus.write(code, &buf, false) {
				error!("{:02x}: {:02x?} nack", row, image.row(row));
				return Err(ProgramError::bus(code)(e));
			}
			delay.delay(timing.row_write_settle);

			ack_poll(&mut *bus, &mut *delay, &timing, ack_code)?;
			info!("{:02x}: {:02x?} ready", row, image.row(row));
			delay.delay(timing.row_ack_settle);
		}
		Ok(())
	}

	/// Read all 16 rows of `region`; no ack polling, no retries.
	pub fn read(&mut self, region: MemoryRegion) -> ProgramResult<MemoryImage> {
		let address = self.discover()?;
		info!("slave address = {}", address);
		info!("memory = {}", region);

		let code = address.control_code(region.selector());
		let settle = self.timing.read_select_settle;
		let delay = &mut self.delay;
		let mut bus = Session::new(&mut self.bus);

		let mut image = MemoryImage::erased();
		for row in 0..ROWS {
			// word address and data phase must not be separated by a STOP
			bus.write(code, &[(row as u8) << 4], true).map_err(ProgramError::bus(code))?;
			delay.delay(settle);
			bus.read(code, image.row_mut(row), true).map_err(ProgramError::bus(code))?;
		}
		Ok(image)
	}
}
