//! Intel HEX loader for GreenPAK design files
//!
//! A design file holds exactly 16 data records of 16 bytes each, at
//! addresses 0x0000..0x00f0 in steps of 0x10, followed by an end-of-file
//! record:
//!
//! ```text
//! :100000009F07003D0F0000000000000000000000FE
//! :1000100000000000000000000000000000000000E0
//! ...
//! :1000F000000000000000000000000000000000A55B
//! :00000001FF
//! ```
//!
//! Only the high nibble of the address low byte is used (it selects the
//! row), the record type isn't interpreted and checksums aren't verified.
//! Records with a byte count other than 0x10 are skipped.
//!
//! A malformed hex digit doesn't abort: the affected byte becomes 0xff.
//! Such bytes are counted in [`LoadedImage::invalid_bytes`].

use std::fs;
use std::io::{
	self,
	BufRead,
};
use std::path::Path;

use crate::device::MemoryRegion;

mod image;

pub use self::image::{
	COLUMNS,
	MemoryImage,
	ROWS,
};

/// value of a byte with a malformed hex digit
pub const INVALID_BYTE: u8 = 0xff;

const DATA_RECORD_LENGTH: u8 = COLUMNS as u8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct HexRecord {
	pub byte_count: u8,
	pub address: u16,
	pub record_type: u8,
	/// only decoded for data records (`byte_count == 0x10`)
	pub data: [u8; COLUMNS],
	pub invalid_bytes: usize,
}

impl HexRecord {
	pub fn is_row_data(&self) -> bool {
		self.byte_count == DATA_RECORD_LENGTH
	}

	pub fn row(&self) -> usize {
		let row = usize::from((self.address as u8) >> 4);
		// out of range falls back to row 0
		if row < ROWS { row } else { 0 }
	}
}

struct HexDigits<'a> {
	text: &'a [u8],
	pos: usize,
	invalid: usize,
}

impl<'a> HexDigits<'a> {
	fn digit(&mut self) -> Option<u8> {
		let c = self.text.get(self.pos).cloned();
		self.pos += 1;
		match c {
			Some(c @ b'0'..=b'9') => Some(c - b'0'),
			Some(c @ b'a'..=b'f') => Some(c - b'a' + 0x0a),
			Some(c @ b'A'..=b'F') => Some(c - b'A' + 0x0a),
			_ => None,
		}
	}

	fn byte(&mut self) -> u8 {
		match (self.digit(), self.digit()) {
			(Some(hi), Some(lo)) => (hi << 4) | lo,
			_ => {
				self.invalid += 1;
				INVALID_BYTE
			},
		}
	}
}

/// Parse the record starting at the first ':' in `line`; `None` if there is
/// no record start.
///
/// Works on raw bytes: anything that isn't a hex digit (including non-ASCII
/// garbage) only invalidates the byte it appears in.
pub fn parse_record<L: AsRef<[u8]>>(line: L) -> Option<HexRecord> {
	let line = line.as_ref();
	let start = line.iter().position(|&c| c == b':')?;
	let mut digits = HexDigits {
		text: &line[start + 1..],
		pos: 0,
		invalid: 0,
	};

	let byte_count = digits.byte();
	let address_hi = digits.byte();
	let address_lo = digits.byte();
	let record_type = digits.byte();

	let mut data = [0u8; COLUMNS];
	if byte_count == DATA_RECORD_LENGTH {
		for d in data.iter_mut() {
			*d = digits.byte();
		}
	}

	Some(HexRecord {
		byte_count,
		address: (u16::from(address_hi) << 8) | u16::from(address_lo),
		record_type,
		data,
		invalid_bytes: digits.invalid,
	})
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LoadedImage {
	pub image: MemoryImage,
	/// number of distinct rows populated by data records
	pub rows_merged: usize,
	/// number of data records seen, including repeated rows
	pub data_records: usize,
	/// bytes replaced by `INVALID_BYTE` because of malformed digits
	pub invalid_bytes: usize,
}

impl LoadedImage {
	pub fn is_complete(&self) -> bool {
		self.rows_merged == ROWS && self.data_records == ROWS
	}
}

pub fn load_image_lines<I, S>(lines: I) -> LoadedImage
where
	I: IntoIterator<Item = S>,
	S: AsRef<[u8]>,
{
	let mut image = MemoryImage::erased();
	let mut populated = 0u16;
	let mut data_records = 0;
	let mut invalid_bytes = 0;

	for line in lines {
		let record = match parse_record(line.as_ref()) {
			Some(r) => r,
			None => continue,
		};
		if !record.is_row_data() {
			debug!("record type 0x{:02x} with 0x{:02x} bytes: not row data", record.record_type, record.byte_count);
			continue;
		}
		let row = record.row();
		debug!("row {:x}: {:02x?}", row, record.data);
		*image.row_mut(row) = record.data;
		populated |= 1 << row;
		data_records += 1;
		invalid_bytes += record.invalid_bytes;
	}

	if data_records > ROWS {
		warn!("{} data records for {} rows", data_records, ROWS);
	}
	if invalid_bytes > 0 {
		warn!("{} malformed hex bytes were replaced by 0x{:02x}", invalid_bytes, INVALID_BYTE);
	}

	LoadedImage {
		image,
		rows_merged: populated.count_ones() as usize,
		data_records,
		invalid_bytes,
	}
}

pub fn load_image<R: BufRead>(mut reader: R) -> io::Result<LoadedImage> {
	let mut lines = Vec::new();
	loop {
		let mut line = Vec::new();
		if 0 == reader.read_until(b'\n', &mut line)? {
			break;
		}
		lines.push(line);
	}
	Ok(load_image_lines(lines))
}

/// load `NVM.hex` or `EEPROM.hex` (depending on region) from `dir`
pub fn load_region_image(dir: &Path, region: MemoryRegion) -> crate::AResult<LoadedImage> {
	let path = dir.join(region.image_file_name());
	info!("HEX file read: {}", path.display());

	with_context!(("read {}", path.display()), {
		let file = fs::File::open(&path)?;
		Ok(load_image(io::BufReader::new(file))?)
	})
}
