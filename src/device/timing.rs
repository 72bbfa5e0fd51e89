use std::time::Duration;

/// Waits around bus transactions.
///
/// Erase (tER) and write cycles take about 20ms; the settle times cover
/// that, so the first ack poll usually succeeds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Timing {
	/// number of zero-length probes before giving up
	pub ack_poll_budget: u32,
	/// wait between two probes while the device is busy
	pub ack_poll_interval: Duration,
	/// wait between probes when listing all addresses
	pub probe_interval: Duration,
	/// after sending a page erase command, before polling
	pub erase_command_settle: Duration,
	/// after a page erase completed
	pub erase_page_settle: Duration,
	/// after a full erase (and power cycle), before writing rows; writes
	/// fail without it
	pub post_erase_settle: Duration,
	/// after sending a row, before polling
	pub row_write_settle: Duration,
	/// after a row write completed
	pub row_ack_settle: Duration,
	/// between selecting a row and reading it
	pub read_select_settle: Duration,
}

impl Default for Timing {
	fn default() -> Self {
		Timing {
			ack_poll_budget: 1000,
			ack_poll_interval: Duration::from_secs(1),
			probe_interval: Duration::from_millis(10),
			erase_command_settle: Duration::from_millis(100),
			erase_page_settle: Duration::from_millis(100),
			post_erase_settle: Duration::from_millis(300),
			row_write_settle: Duration::from_millis(10),
			row_ack_settle: Duration::from_millis(100),
			read_select_settle: Duration::from_millis(10),
		}
	}
}
