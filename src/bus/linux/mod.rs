use std::fs;
use std::io;
use std::path::{
	Path,
	PathBuf,
};

use libc::{
	EREMOTEIO,
	ENXIO,
};

mod rdwr;

use self::rdwr::{
	I2C_FUNC_I2C,
	i2c_msg,
};

use super::{
	Bus,
	BusError,
	ControlCode,
};

fn bus_error(e: io::Error) -> BusError {
	match e.raw_os_error() {
		// adapters report a missing ACK as one of these
		Some(ENXIO) | Some(EREMOTEIO) => BusError::Nack,
		_ => BusError::Io(e),
	}
}

/// I²C adapter exposed through `/dev/i2c-N`
///
/// Writes with `hold_bus` are queued and sent together with the next
/// transaction in a single `I2C_RDWR` call, so the device sees a repeated
/// START instead of STOP/START. A read always completes the combined
/// transaction.
pub struct LinuxI2cBus {
	file: fs::File,
	path: PathBuf,
	pending: Vec<(ControlCode, Vec<u8>)>,
}

impl LinuxI2cBus {
	fn flush(&mut self, last: Option<i2c_msg>) -> Result<(), BusError> {
		let pending = std::mem::replace(&mut self.pending, Vec::new());
		let mut msgs: Vec<i2c_msg> = pending.iter()
			.map(|(code, data)| i2c_msg::write(code.bus_address(), data))
			.collect();
		msgs.extend(last);
		rdwr::transfer(&self.file, &mut msgs).map_err(bus_error)
	}
}

impl Bus for LinuxI2cBus {
	fn write(&mut self, code: ControlCode, data: &[u8], hold_bus: bool) -> Result<(), BusError> {
		if hold_bus {
			self.pending.push((code, data.to_vec()));
			return Ok(());
		}
		self.flush(Some(i2c_msg::write(code.bus_address(), data)))
	}

	// i2c-dev can't leave the bus claimed after a read message, so
	// `hold_bus` has no further effect here
	fn read(&mut self, code: ControlCode, target: &mut [u8], _hold_bus: bool) -> Result<(), BusError> {
		self.flush(Some(i2c_msg::read(code.bus_address(), target)))
	}

	fn stop(&mut self) {
		if self.pending.is_empty() { return; }
		if let Err(e) = self.flush(None) {
			warn!("{}: queued write failed on STOP: {}", self.path.display(), e);
		}
	}
}

impl Drop for LinuxI2cBus {
	fn drop(&mut self) {
		self.stop();
	}
}

// TODO: exclusive open / file locking?
pub fn open_i2c_bus<P: AsRef<Path>>(path: P) -> crate::AResult<LinuxI2cBus> {
	let path = path.as_ref().to_path_buf();

	with_context!(("open I2C adapter {}", path.display()), {
		let file = fs::OpenOptions::new()
			.read(true)
			.write(true)
			.open(&path)?;

		let funcs = rdwr::functionality(&file)?;
		ensure!(0 != funcs & I2C_FUNC_I2C, "adapter doesn't support plain I2C transfers (functionality: 0x{:08x})", funcs);
		debug!("{}: functionality 0x{:08x}", path.display(), funcs);

		Ok(LinuxI2cBus {
			file,
			path: path.clone(),
			pending: Vec::new(),
		})
	})
}
