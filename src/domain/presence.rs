use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const ONLINE_MIN: u8 = 0;
pub const ONLINE_MAX: u8 = 100;
/// Largest change a single tick may apply, in either direction.
pub const MAX_TICK_STEP: i32 = 5;
pub const HAPPY_CUSTOMERS_MIN: u16 = 700;
pub const HAPPY_CUSTOMERS_MAX: u16 = 1300;

/// Draws an integer uniformly from `[min, max]`, both bounds included.
///
/// Reversed bounds are swapped rather than rejected.
pub fn draw_inclusive<R: Rng + ?Sized>(rng: &mut R, min: i32, max: i32) -> i32 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(low..=high)
}

/// The social proof numbers shown on the panel for one page session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPresence {
    pub online_count: u8,
    pub happy_customers_base: u16,
}

impl SessionPresence {
    /// The customer count as displayed, e.g. `1042+`.
    pub fn happy_customers_label(&self) -> String {
        format!("{}+", self.happy_customers_base)
    }
}

/// Bounded random walk behind the "X online" badge.
///
/// The customer base is drawn once at construction and never again. The online
/// count starts uniform in `[0, 100]` and moves by at most five per tick.
#[derive(Debug)]
pub struct PresenceSimulator<R = StdRng> {
    rng: R,
    state: SessionPresence,
}

impl PresenceSimulator<StdRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> PresenceSimulator<R> {
    pub fn new(mut rng: R) -> Self {
        let happy_customers_base = draw_inclusive(
            &mut rng,
            i32::from(HAPPY_CUSTOMERS_MIN),
            i32::from(HAPPY_CUSTOMERS_MAX),
        ) as u16;
        let mut simulator = Self {
            rng,
            state: SessionPresence {
                online_count: ONLINE_MIN,
                happy_customers_base,
            },
        };
        simulator.initialize();
        simulator
    }

    /// Draws a fresh starting online count.
    pub fn initialize(&mut self) -> u8 {
        let count = draw_inclusive(&mut self.rng, i32::from(ONLINE_MIN), i32::from(ONLINE_MAX));
        self.state.online_count = clamp_online(count);
        self.state.online_count
    }

    /// Advances the walk by one step and returns the new online count.
    pub fn tick(&mut self) -> u8 {
        let delta = draw_inclusive(&mut self.rng, -MAX_TICK_STEP, MAX_TICK_STEP);
        self.state.online_count = clamp_online(i32::from(self.state.online_count) + delta);
        self.state.online_count
    }

    pub fn online_count(&self) -> u8 {
        self.state.online_count
    }

    pub fn happy_customers_base(&self) -> u16 {
        self.state.happy_customers_base
    }

    pub fn snapshot(&self) -> SessionPresence {
        self.state
    }
}

fn clamp_online(value: i32) -> u8 {
    value.clamp(i32::from(ONLINE_MIN), i32::from(ONLINE_MAX)) as u8
}
