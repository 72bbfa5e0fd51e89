#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate slg46826_flash;
use slg46826_flash::*;

use std::fs;
use std::io;
use std::path::Path;
use std::process::exit;
use std::time::Duration;

use slg46826_flash::bus::linux::{
	LinuxI2cBus,
	open_i2c_bus,
};
use slg46826_flash::device::{
	MemoryRegion,
	Programmer,
	Timing,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_hex_param(matches: &clap::ArgMatches, name: &str) -> AResult<Option<u8>> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(None),
	};
	u8::from_str_radix(param.trim_start_matches("0x"), 16).map(Some).map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn save_hex(path: &str, image: &hex::MemoryImage) -> AResult<()> {
	let file = fs::File::create(path).map_err(|e| format_err!("write {}: {}", path, e))?;
	image.write_hex(io::BufWriter::new(file)).map_err(|e| format_err!("write {}: {}", path, e))?;
	info!("HEX file written: {}", path);
	Ok(())
}

fn open_programmer(matches: &clap::ArgMatches) -> AResult<Programmer<LinuxI2cBus>> {
	let mut timing = Timing::default();
	if matches.is_present("ack_poll_budget") {
		timing.ack_poll_budget = get_param(matches, "ack_poll_budget")?;
	}
	if matches.is_present("ack_poll_interval") {
		timing.ack_poll_interval = Duration::from_millis(get_param(matches, "ack_poll_interval")?);
	}

	let path = matches.value_of("bus").unwrap_or("/dev/i2c-1");
	let bus = open_i2c_bus(path)?;
	Ok(Programmer::new(bus, timing))
}

fn ping(matches: &clap::ArgMatches) -> AResult<()> {
	let mut programmer = open_programmer(matches)?;
	let present = programmer.enumerate();
	let found: Vec<String> = present.iter().enumerate()
		.filter(|&(_, &ack)| ack)
		.map(|(address, _)| format!("0x{:x}", address))
		.collect();
	if found.is_empty() {
		println!("no device found");
	} else {
		println!("devices: {}", found.join(" "));
	}
	Ok(())
}

fn read(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let region: MemoryRegion = get_param(sub_m, "REGION")?;
	let mut programmer = open_programmer(matches)?;
	let image = programmer.read(region)?;
	print!("{}", image);

	if let Some(output) = sub_m.value_of("output") {
		save_hex(output, &image)?;
	}
	Ok(())
}

fn write(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let region: MemoryRegion = get_param(sub_m, "REGION")?;
	let new_address = get_hex_param(sub_m, "address")?;
	if new_address.is_some() && region != MemoryRegion::Nvm {
		warn!("--address only applies to NVM, ignored for {}", region);
	}

	let image_dir = Path::new(matches.value_of("image_dir").unwrap_or("."));
	let loaded = hex::load_region_image(image_dir, region)?;

	let mut programmer = open_programmer(matches)?;
	programmer.program(region, loaded, new_address)?;
	info!("{} written", region);
	Ok(())
}

fn erase(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let region: MemoryRegion = get_param(sub_m, "REGION")?;
	let mut programmer = open_programmer(matches)?;
	programmer.erase(region)?;
	info!("{} erased", region);
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg bus: -b --bus +takes_value default_value("/dev/i2c-1") "I2C adapter device")
		(@arg image_dir: -d --("image-dir") +takes_value default_value(".") "directory containing NVM.hex and EEPROM.hex")
		(@arg ack_poll_budget: --("ack-poll-budget") +takes_value "maximum number of ack polls while the device is busy")
		(@arg ack_poll_interval: --("ack-poll-interval") +takes_value "milliseconds between ack polls")
		(@subcommand ping =>
			(about: "probe all 16 device addresses")
		)
		(@subcommand read =>
			(about: "read and dump a memory region")
			(@arg REGION: +required "nvm, eeprom or register")
			(@arg output: -o --output +takes_value "also save as Intel HEX file")
		)
		(@subcommand write =>
			(about: "program a memory region from its HEX file")
			(@arg REGION: +required "nvm, eeprom or register")
			(@arg address: -a --address +takes_value "new device address for NVM (hex digit 0-f)")
		)
		(@subcommand erase =>
			(about: "erase NVM or EEPROM")
			(@arg REGION: +required "nvm, eeprom or register")
		)
	).get_matches();

	match matches.subcommand() {
		("ping", _) => {
			ping(&matches)
		},
		("read", Some(sub_m)) => {
			read(&matches, sub_m)
		},
		("write", Some(sub_m)) => {
			write(&matches, sub_m)
		},
		("erase", Some(sub_m)) => {
			erase(&matches, sub_m)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
