use refract::{
    chrono::{DateTime, TimeZone, Utc},
    Float, GeoAnchor, OwnerId, Point, Prism, PrismSlots, SlotId, MAX_PRISMS,
};

use core::iter;
pub use rand;

/// Anchors are kept away from the poles, where days are boring.
const MAX_LATITUDE: Float = 66.0;

/// 2000-01-01T00:00:00Z
const MIN_TIMESTAMP: i64 = 946_684_800;
/// 2050-01-01T00:00:00Z
const MAX_TIMESTAMP: i64 = 2_524_608_000;

pub trait Random: Sized {
    /// Generate a random value of this type using the provided `rng`
    ///
    /// This method must not fail. If creating a value is faillible, keep trying until success
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self;
}

impl Random for GeoAnchor {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        GeoAnchor::new(
            rng.gen_range(-MAX_LATITUDE..=MAX_LATITUDE),
            rng.gen_range(-180.0..180.0),
        )
    }
}

impl Random for OwnerId {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        OwnerId::new(format!("{:016x}", rng.gen::<u64>()))
    }
}

impl Random for SlotId {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        loop {
            if let Some(slot) = SlotId::new(rng.gen_range(0..MAX_PRISMS)) {
                break slot;
            }
        }
    }
}

impl Random for DateTime<Utc> {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        loop {
            if let Some(instant) = Utc
                .timestamp_opt(rng.gen_range(MIN_TIMESTAMP..MAX_TIMESTAMP), 0)
                .single()
            {
                break instant;
            }
        }
    }
}

/// A point whose coordinates are in `0.0..extent`
pub fn rand_point(rng: &mut (impl rand::Rng + ?Sized), extent: Float) -> Point {
    // the rng generates floats in 0.0..1.0, scale the range accordingly
    Point::from_fn(|_, _| rng.gen::<Float>() * extent.abs())
}

/// A random prism, anchored most of the time, somewhere on a square canvas of side `extent`.
pub fn random_prism(
    rng: &mut (impl rand::Rng + ?Sized),
    owner: OwnerId,
    slot: SlotId,
    extent: Float,
) -> Prism {
    let position = rand_point(rng, extent);
    let rotation = rng.gen_range(-180.0..180.0);

    let mut prism = loop {
        let prism = Prism::new(position, rotation, owner.clone(), slot);
        if let Some(prism) = prism.with_size(rng.gen_range(10.0..120.0)) {
            break prism;
        }
    };

    if rng.gen_bool(0.9) {
        prism.anchor = Some(GeoAnchor::random(rng));
    }

    prism
}

/// A user with a random number of prisms, filling its first slots.
pub fn random_slots(rng: &mut (impl rand::Rng + ?Sized), extent: Float) -> PrismSlots {
    let mut slots = PrismSlots::new(OwnerId::random(rng));
    let num_prisms = rng.gen_range(0..=MAX_PRISMS);

    for slot in SlotId::all().take(num_prisms) {
        let prism = random_prism(rng, slots.owner().clone(), slot, extent);
        slots.apply(prism);
    }

    slots
}

pub fn random_scene(
    rng: &mut (impl rand::Rng + ?Sized),
    num_users: usize,
    extent: Float,
) -> (DateTime<Utc>, Vec<PrismSlots>) {
    (
        DateTime::<Utc>::random(rng),
        iter::repeat_with(|| random_slots(rng, extent))
            .take(num_users)
            .collect(),
    )
}
