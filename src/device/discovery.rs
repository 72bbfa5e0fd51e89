use std::time::Duration;

use crate::bus::{
	BlockSelector,
	Bus,
	DEVICE_ADDRESS_COUNT,
	Delay,
	DeviceAddress,
};
use crate::error::{
	ProgramError,
	ProgramResult,
};

/// Finds the address of the single connected device.
///
/// Probes the register block of addresses 0..f in ascending order with a
/// zero-length read, which doesn't change device state; safe to call before
/// every operation, including right after a power cycle that changed the
/// address.
pub fn discover<B: Bus + ?Sized>(bus: &mut B) -> ProgramResult<DeviceAddress> {
	for address in DeviceAddress::all() {
		if bus.probe(address.control_code(BlockSelector::Register)) {
			debug!("device found at address {}", address);
			return Ok(address);
		}
	}
	Err(ProgramError::DeviceNotFound)
}

/// Probes all 16 addresses (no short-circuit); diagnostic only.
pub fn enumerate<B, D>(bus: &mut B, delay: &mut D, probe_interval: Duration) -> [bool; DEVICE_ADDRESS_COUNT as usize]
where
	B: Bus + ?Sized,
	D: Delay + ?Sized,
{
	let mut present = [false; DEVICE_ADDRESS_COUNT as usize];
	for address in DeviceAddress::all() {
		let ack = bus.probe(address.control_code(BlockSelector::Register));
		delay.delay(probe_interval);
		info!("slave address = {} is {}", address, if ack { "present" } else { "not present" });
		present[usize::from(address.index())] = ack;
	}
	present
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bus::ControlCode;
	use crate::bus::sim::{
		RecordingDelay,
		SimBus,
	};

	#[test]
	fn discover_stops_at_first_ack() {
		let mut bus = SimBus::new(Some(0x0b));
		let address = discover(&mut bus).unwrap();
		assert_eq!(address.index(), 0x0b);

		let expected: Vec<ControlCode> = (0x0..=0xbu8).map(|i| ControlCode((i << 4) | 0x02)).collect();
		assert_eq!(bus.probes(), expected);
		assert_eq!(bus.trace.len(), 12);
	}

	#[test]
	fn discover_without_device() {
		let mut bus = SimBus::new(None);
		match discover(&mut bus) {
			Err(ProgramError::DeviceNotFound) => (),
			r => panic!("unexpected result: {:?}", r),
		}
		assert_eq!(bus.probes().len(), 16);
	}

	#[test]
	fn discover_with_adapter_error() {
		let mut bus = SimBus::new(Some(0x0));
		bus.io_fault = true;
		match discover(&mut bus) {
			Err(ProgramError::DeviceNotFound) => (),
			r => panic!("unexpected result: {:?}", r),
		}
		assert_eq!(bus.probes().len(), 16);
	}

	#[test]
	fn enumerate_probes_everything() {
		let mut bus = SimBus::new(Some(0x03));
		let mut delay = RecordingDelay::default();
		let present = enumerate(&mut bus, &mut delay, Duration::from_millis(10));

		let mut expected = [false; 16];
		expected[3] = true;
		assert_eq!(present, expected);
		assert_eq!(bus.probes().len(), 16);
		assert_eq!(delay.delays, vec![Duration::from_millis(10); 16]);
	}
}
