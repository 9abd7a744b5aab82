use log::info;
use rand::Rng;
use rs_decipher_core::model::{Alphabet, CandidateMapping, ModelConfig, ModelStore, Scorer};

const CIPHER_SOURCE: &str = "the general is expected to arrive at dawn with the second regiment \
	hold the bridge until relieved and do not engage the enemy scouts";

/// Toy hill climber: swaps two key entries and keeps the swap when the
/// score does not decrease. The real search lives outside this crate.
fn climb<R: Rng>(scorer: &mut Scorer<'_>, c_array: &[Option<usize>], dim: usize, rounds: usize, rng: &mut R) -> (CandidateMapping, f64) {
	let mut key = CandidateMapping::random(dim, rng);
	let mut best = scorer.score(&key, c_array);

	for _ in 0..rounds {
		let a = rng.random_range(0..dim);
		let b = rng.random_range(0..dim);
		key.swap(a, b);
		let candidate = scorer.score(&key, c_array);
		if candidate >= best {
			best = candidate;
		} else {
			key.swap(a, b);
		}
	}
	(key, best)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();

	// Train (or load the cached tables of) every .dat corpus of the "data" directory
	// Word boundaries are kept as their own symbol so the key also has to place spaces
	let config = ModelConfig { order: 4, remove_spaces: false, ..ModelConfig::default() };
	let alphabet = Alphabet::latin_with_space();
	let store = ModelStore::from_folder("./data", alphabet.clone(), &config)?;
	println!("Loaded models: {}", store.model_names().join(", "));

	let name = match store.model_names().into_iter().next() {
		Some(name) => name,
		None => return Err("No .dat corpus found in ./data".into()),
	};
	let table = store.get(&name).ok_or("Model vanished")?;
	let dim = alphabet.dim();

	// Encipher the sample with a random substitution key
	let mut rng = rand::rng();
	let secret = CandidateMapping::random(dim, &mut rng);
	let plain = alphabet.encode(CIPHER_SOURCE);
	let mut inverse = CandidateMapping::unmapped(dim);
	for c in 0..dim {
		if let Some(p) = secret.get(c) {
			inverse.set(p, c);
		}
	}
	let c_array: Vec<Option<usize>> = plain.iter().map(|&p| p.and_then(|p| inverse.get(p))).collect();
	println!("Cipher text: {}", alphabet.decode(&c_array, &CandidateMapping::identity(dim), '?'));

	let mut scorer = Scorer::new(&table);
	println!("Score of the true key: {:.0}", scorer.score(&secret, &c_array));

	// A few restarts; keep the best key
	let mut best: Option<(CandidateMapping, f64)> = None;
	for restart in 0..8 {
		let (key, score) = climb(&mut scorer, &c_array, dim, 20_000, &mut rng);
		info!("Restart {restart}: {score:.0}");
		if best.as_ref().is_none_or(|(_, s)| score > *s) {
			best = Some((key, score));
		}
	}

	if let Some((key, score)) = best {
		println!("Best score: {score:.0}");
		println!("Decipherment: {}", alphabet.decode(&c_array, &key, '?'));
	}

	// Partial keys are legal: unmapped symbols just break the n-gram context
	let mut partial = secret.clone();
	for c in 0..dim / 2 {
		partial.clear(c);
	}
	println!(
		"Half key ({} of {} symbols): {:.0} / {}",
		partial.mapped_count(),
		dim,
		scorer.score(&partial, &c_array),
		alphabet.decode(&c_array, &partial, '_')
	);

	Ok(())
}
