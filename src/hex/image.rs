use std::fmt;
use std::io;

pub const ROWS: usize = 16;
pub const COLUMNS: usize = 16;

/// 256 bytes of one address block: row = high address nibble, column = low
/// address nibble.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryImage {
	rows: [[u8; COLUMNS]; ROWS],
}

impl MemoryImage {
	/// all bytes 0x00 (erased state of NVM and EEPROM)
	pub fn erased() -> Self {
		MemoryImage {
			rows: [[0u8; COLUMNS]; ROWS],
		}
	}

	#[cfg(test)]
	pub fn from_bytes(bytes: &[u8; ROWS * COLUMNS]) -> Self {
		let mut image = MemoryImage::erased();
		for (row, chunk) in image.rows.iter_mut().zip(bytes.chunks(COLUMNS)) {
			row.copy_from_slice(chunk);
		}
		image
	}

	pub fn to_bytes(&self) -> [u8; ROWS * COLUMNS] {
		let mut bytes = [0u8; ROWS * COLUMNS];
		for (chunk, row) in bytes.chunks_mut(COLUMNS).zip(self.rows.iter()) {
			chunk.copy_from_slice(row);
		}
		bytes
	}

	pub fn row(&self, row: usize) -> &[u8; COLUMNS] {
		&self.rows[row]
	}

	pub fn row_mut(&mut self, row: usize) -> &mut [u8; COLUMNS] {
		&mut self.rows[row]
	}

	pub fn get(&self, row: usize, column: usize) -> u8 {
		self.rows[row][column]
	}

	pub fn set(&mut self, row: usize, column: usize, value: u8) {
		self.rows[row][column] = value;
	}

	/// Write the image as 16 Intel HEX data records (addresses 0x0000 to
	/// 0x00f0) plus end-of-file record; the layout the loader expects.
	pub fn write_hex<W: io::Write>(&self, mut w: W) -> io::Result<()> {
		for (index, row) in self.rows.iter().enumerate() {
			let address = (index as u16) << 4;
			let mut sum = (COLUMNS as u8)
				.wrapping_add((address >> 8) as u8)
				.wrapping_add(address as u8);
			write!(w, ":{:02X}{:04X}00", COLUMNS, address)?;
			for b in row {
				sum = sum.wrapping_add(*b);
				write!(w, "{:02X}", b)?;
			}
			writeln!(w, "{:02X}", sum.wrapping_neg())?;
		}
		writeln!(w, ":00000001FF")
	}
}

impl fmt::Display for MemoryImage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (index, row) in self.rows.iter().enumerate() {
			write!(f, "{:02x}:", index)?;
			for b in row {
				write!(f, " {:02x}", b)?;
			}
			writeln!(f)?;
		}
		Ok(())
	}
}

impl fmt::Debug for MemoryImage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "MemoryImage {{")?;
		fmt::Display::fmt(self, f)?;
		write!(f, "}}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bytes_are_row_major() {
		let mut bytes = [0u8; 256];
		for (i, b) in bytes.iter_mut().enumerate() {
			*b = i as u8;
		}
		let image = MemoryImage::from_bytes(&bytes);
		assert_eq!(image.get(0xc, 0xa), 0xca);
		assert_eq!(image.row(3)[0], 0x30);
		assert_eq!(image.to_bytes()[..], bytes[..]);
	}

	#[test]
	fn hex_records_carry_checksums() {
		let mut image = MemoryImage::erased();
		image.row_mut(0)[..5].copy_from_slice(&[0x9f, 0x07, 0x00, 0x3d, 0x0f]);
		image.set(0xf, 0xf, 0xa5);

		let mut out = Vec::new();
		image.write_hex(&mut out).unwrap();
		let text = String::from_utf8(out).unwrap();
		let lines: Vec<&str> = text.lines().collect();

		assert_eq!(lines.len(), 17);
		assert_eq!(lines[0], format!(":100000009F07003D0F{}FE", "0".repeat(22)));
		assert_eq!(lines[1], format!(":10001000{}E0", "0".repeat(32)));
		assert_eq!(lines[15], format!(":1000F000{}A55B", "0".repeat(30)));
		assert_eq!(lines[16], ":00000001FF");
	}

	#[test]
	fn display_dumps_rows() {
		let mut image = MemoryImage::erased();
		image.set(0xc, 0xa, 0x5b);
		let dump = image.to_string();
		let row_c = dump.lines().nth(0xc).unwrap();
		assert_eq!(row_c, "0c: 00 00 00 00 00 00 00 00 00 00 5b 00 00 00 00 00");
	}
}
