// definitions from <linux/i2c.h> and <linux/i2c-dev.h>

use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;

use libc::{
	c_ulong,
	ioctl,
};

const I2C_FUNCS: c_ulong = 0x0705;
const I2C_RDWR: c_ulong = 0x0707;

pub const I2C_FUNC_I2C: c_ulong = 0x0000_0001;

pub const I2C_M_RD: u16 = 0x0001;

#[repr(C)]
#[allow(non_camel_case_types)]
pub struct i2c_msg {
	pub addr: u16,
	pub flags: u16,
	pub len: u16,
	pub buf: *mut u8,
}

#[repr(C)]
#[allow(non_camel_case_types)]
struct i2c_rdwr_ioctl_data {
	msgs: *mut i2c_msg,
	nmsgs: u32,
}

impl i2c_msg {
	pub fn write(addr: u16, data: &[u8]) -> Self {
		assert!(data.len() <= u16::max_value() as usize);
		i2c_msg {
			addr,
			flags: 0,
			len: data.len() as u16,
			// kernel only reads from write buffers
			buf: data.as_ptr() as *mut u8,
		}
	}

	pub fn read(addr: u16, target: &mut [u8]) -> Self {
		assert!(target.len() <= u16::max_value() as usize);
		i2c_msg {
			addr,
			flags: I2C_M_RD,
			len: target.len() as u16,
			buf: target.as_mut_ptr(),
		}
	}
}

pub fn functionality(file: &fs::File) -> io::Result<c_ulong> {
	let mut funcs: c_ulong = 0;
	let res = unsafe { ioctl(file.as_raw_fd(), I2C_FUNCS as _, &mut funcs as *mut c_ulong) };
	if res < 0 {
		return Err(io::Error::last_os_error());
	}
	Ok(funcs)
}

/// issue all messages as one combined transaction (repeated START between
/// messages, STOP after the last one)
///
/// buffers referenced by `msgs` must stay alive for the duration of the call.
pub fn transfer(file: &fs::File, msgs: &mut [i2c_msg]) -> io::Result<()> {
	if msgs.is_empty() { return Ok(()); }
	let mut data = i2c_rdwr_ioctl_data {
		msgs: msgs.as_mut_ptr(),
		nmsgs: msgs.len() as u32,
	};
	let res = unsafe { ioctl(file.as_raw_fd(), I2C_RDWR as _, &mut data as *mut i2c_rdwr_ioctl_data) };
	if res < 0 {
		return Err(io::Error::last_os_error());
	}
	Ok(())
}
