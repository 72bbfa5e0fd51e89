use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Source of the blocking waits standing in for device-internal latency
/// (erase, programming, settling).
pub trait Delay {
	fn delay(&mut self, duration: Duration);
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ThreadSleep;

impl Delay for ThreadSleep {
	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, D: Delay + ?Sized> Delay for &'a mut D {
	fn delay(&mut self, duration: Duration) {
		(**self).delay(duration)
	}
}
