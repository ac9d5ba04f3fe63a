//! Synthetic annotation generator for demo catalogs.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

const FEATURES: &[&str] = &[
    "spa",
    "ocean view",
    "swimming pool",
    "city view",
    "fine dining",
    "gym",
    "free breakfast",
    "beachfront",
    "luxury",
    "modern amenities",
    "free Wi-Fi",
    "parking",
];

const ADJECTIVES: &[&str] = &[
    "Luxury",
    "Beachfront",
    "Modern",
    "Cozy",
    "Charming",
    "Centrally-located",
    "Boutique",
    "Sophisticated",
    "Vibrant",
    "Peaceful",
];

/// Generate annotation lists for `n` hotels, `per_hotel` annotations each.
///
/// Each annotation reads "{Adjective} hotel with {a}, {b}, and {c}." with three
/// distinct features. The same `seed` always yields the same catalog; `None`
/// draws from OS entropy.
pub fn generate(n: usize, per_hotel: usize, seed: Option<u64>) -> Vec<Vec<String>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    (0..n)
        .map(|_| (0..per_hotel).map(|_| annotation(&mut rng)).collect())
        .collect()
}

fn annotation(rng: &mut StdRng) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Charming");
    let features: Vec<&str> = FEATURES.choose_multiple(rng, 3).copied().collect();
    format!(
        "{adjective} hotel with {}, {}, and {}.",
        features[0], features[1], features[2]
    )
}
